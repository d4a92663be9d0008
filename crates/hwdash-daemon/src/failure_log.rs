//! Append-only log for faults nothing else handled.

use anyhow::{Context, Result};
use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::error;

#[derive(Debug, Clone)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one `[timestamp] fault` entry.
    pub fn record(&self, fault: &dyn Display) -> Result<()> {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {:?}", self.path))?;
        writeln!(file, "[{timestamp}] {fault}")
            .with_context(|| format!("Failed to write to {:?}", self.path))?;
        Ok(())
    }

    /// Records `fault`, logging instead if the file cannot be written.
    pub fn record_or_log(&self, fault: &dyn Display) {
        error!("{}", fault);
        if let Err(e) = self.record(fault) {
            error!("Could not append to failure log: {:#}", e);
        }
    }

    /// Chains a panic hook that appends every panic to this log.
    pub fn install_panic_hook(&self) {
        let log = self.clone();
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = log.record(&format!("panic: {info}"));
            previous(info);
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_timestamped_entries() {
        let dir = tempfile::tempdir().unwrap();
        let log = FailureLog::new(dir.path().join("error_log.txt"));

        log.record(&"first fault").unwrap();
        log.record(&anyhow::anyhow!("second fault")).unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] first fault"));
        assert!(lines[1].ends_with("] second fault"));
    }

    #[test]
    fn test_unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = FailureLog::new(dir.path().join("missing").join("log.txt"));
        assert!(log.record(&"fault").is_err());
    }
}
