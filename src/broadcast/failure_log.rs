//! Append-only record of recipients that could not be reached.
//!
//! One id per line. The file is truncated when a job starts and each id is
//! written at most once per job, even if several tasks report it.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum FailureLogError {
    #[error("failed to reset failure log {path}: {source}")]
    Reset {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to append to failure log {path}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

struct LogState {
    file: File,
    seen: HashSet<i64>,
}

pub struct FailureLog {
    path: PathBuf,
    state: Mutex<LogState>,
}

impl FailureLog {
    /// Removes whatever a previous job left at `path` and opens a fresh file.
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self, FailureLogError> {
        let path = path.into();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => log::debug!("Removed previous failure log {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(FailureLogError::Reset { path, source }),
        }

        let file = match OpenOptions::new().create(true).append(true).open(&path).await {
            Ok(file) => file,
            Err(source) => return Err(FailureLogError::Reset { path, source }),
        };

        Ok(Self {
            path,
            state: Mutex::new(LogState {
                file,
                seen: HashSet::new(),
            }),
        })
    }

    /// Appends `recipient`. Returns `false` when it was already recorded.
    pub async fn append(&self, recipient: i64) -> Result<bool, FailureLogError> {
        let mut state = self.state.lock().await;
        if !state.seen.insert(recipient) {
            return Ok(false);
        }

        let line = format!("{}\n", recipient);
        let written = match state.file.write_all(line.as_bytes()).await {
            Ok(()) => state.file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(source) = written {
            state.seen.remove(&recipient);
            return Err(FailureLogError::Append {
                path: self.path.clone(),
                source,
            });
        }
        Ok(true)
    }

    /// Number of recorded ids.
    pub async fn len(&self) -> usize {
        self.state.lock().await.seen.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
