//! Reporter that keeps everything it is told

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use linguabot::broadcast::{BroadcastReporter, BroadcastSummary, Progress};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDocument {
    pub path: PathBuf,
    pub failed: usize,
    pub contents: String,
}

#[derive(Default)]
pub struct RecordingReporter {
    progress: Mutex<Vec<Progress>>,
    summaries: Mutex<Vec<BroadcastSummary>>,
    documents: Mutex<Vec<SentDocument>>,
    fail_progress: bool,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every progress update errors, like an edit Telegram refuses.
    pub fn failing_progress() -> Self {
        Self {
            fail_progress: true,
            ..Self::default()
        }
    }

    pub fn progress(&self) -> Vec<Progress> {
        self.progress.lock().unwrap().clone()
    }

    pub fn completed_at_each_update(&self) -> Vec<usize> {
        self.progress().iter().map(Progress::completed).collect()
    }

    pub fn summaries(&self) -> Vec<BroadcastSummary> {
        self.summaries.lock().unwrap().clone()
    }

    pub fn documents(&self) -> Vec<SentDocument> {
        self.documents.lock().unwrap().clone()
    }
}

#[async_trait]
impl BroadcastReporter for RecordingReporter {
    async fn progress(&self, progress: Progress) -> anyhow::Result<()> {
        self.progress.lock().unwrap().push(progress);
        if self.fail_progress {
            anyhow::bail!("message can't be edited");
        }
        Ok(())
    }

    async fn summary(&self, summary: &BroadcastSummary) -> anyhow::Result<()> {
        self.summaries.lock().unwrap().push(summary.clone());
        Ok(())
    }

    async fn failure_log(&self, path: &Path, failed: usize) -> anyhow::Result<()> {
        let contents = std::fs::read_to_string(path)?;
        self.documents.lock().unwrap().push(SentDocument {
            path: path.to_path_buf(),
            failed,
            contents,
        });
        Ok(())
    }
}
