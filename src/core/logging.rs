//! Logging initialization
//!
//! Console + file output through `simplelog`, fed by the `log` facade used
//! everywhere else in the crate.

use anyhow::Result;
use simplelog::*;
use std::fs::OpenOptions;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file (appended to, created if missing)
/// * `level` - Maximum level written to both sinks
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to open the file or a logger is already set
pub fn init_logger(log_file_path: &str, level: LevelFilter) -> Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .map_err(|e| anyhow::anyhow!("Failed to open log file {}: {}", log_file_path, e))?;

    let config = ConfigBuilder::new()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("reqwest")
        .build();

    CombinedLogger::init(vec![
        TermLogger::new(level, config.clone(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(level, config, log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.log");
        let path_str = path.to_str().unwrap();

        // A second init in the same test binary fails; the file is opened first either way.
        let _ = init_logger(path_str, LevelFilter::Warn);

        assert!(path.exists());
    }

    #[test]
    fn test_init_logger_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("bot.log");

        assert!(init_logger(path.to_str().unwrap(), LevelFilter::Info).is_err());
    }
}
