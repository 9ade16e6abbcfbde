/// Append-only combat log persistence
///
/// Each newly deduplicated line is written as `[YYYY-MM-DD HH:MM:SS.mmm] line`.
/// The directory and file are created on first write. Failures never reach
/// the pipeline; they are logged and the lines are dropped from the file.

use crate::error::CombatLogError;
use crate::utils::format_timestamp;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default location of the persisted combat log
pub const DEFAULT_COMBAT_LOG_PATH: &str = "logs/combat_log.log";

#[derive(Debug, Clone)]
pub struct CombatLogWriter {
    path: PathBuf,
}

impl CombatLogWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append lines, logging and swallowing any I/O error
    pub fn append(&self, lines: &[String], timestamp_ms: u64) {
        if lines.is_empty() {
            return;
        }
        if let Err(err) = self.try_append(lines, timestamp_ms) {
            tracing::warn!("Error saving combat log: {err}");
        }
    }

    /// Append lines, reporting the first failure
    pub fn try_append(&self, lines: &[String], timestamp_ms: u64) -> Result<(), CombatLogError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CombatLogError::DirectoryCreationFailed {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let write_failed = |source| CombatLogError::WriteFailed {
            path: self.path.display().to_string(),
            source,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_failed)?;
        let mut out = BufWriter::new(file);

        let stamp = format_timestamp(timestamp_ms);
        for line in lines {
            writeln!(out, "[{stamp}] {line}").map_err(write_failed)?;
        }
        out.flush().map_err(write_failed)
    }
}

impl Default for CombatLogWriter {
    fn default() -> Self {
        Self::new(DEFAULT_COMBAT_LOG_PATH)
    }
}
