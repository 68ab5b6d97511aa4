//! Append-only failure log: one `ERROR: <item> - <reason>` line per failed item.

use anyhow::{Context, Result};
use log::{debug, error};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// One failed item.
#[derive(Clone, Debug)]
pub struct ErrorLogEntry {
    pub identifier: String,
    pub timestamp: SystemTime,
    pub description: String,
}

impl ErrorLogEntry {
    pub fn new(identifier: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            timestamp: SystemTime::now(),
            description: description.into(),
        }
    }

    /// The line written to the log file. Embedded newlines are flattened so one failure is one line.
    pub fn to_line(&self) -> String {
        let description = self.description.replace(['\r', '\n'], " ");
        format!("ERROR: {} - {}\n", self.identifier, description)
    }
}

/// File sink shared by every worker of a batch. Writes are serialized by the mutex and synced
/// before `append` returns, so a crash later in the run keeps what was already recorded.
pub struct ErrorLog {
    sink: Option<(PathBuf, Mutex<File>)>,
}

impl ErrorLog {
    /// Sink that drops entries (failures are still logged to the console by the pipeline).
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Open `path` for appending (created if missing, never truncated). `None` gives a disabled sink.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::disabled());
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create error log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open error log {}", path.display()))?;
        debug!("Error log: {}", path.display());
        Ok(Self {
            sink: Some((path.to_path_buf(), Mutex::new(file))),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.sink.as_ref().map(|(p, _)| p.as_path())
    }

    /// Append one entry. A failed write is reported and otherwise ignored.
    pub fn append(&self, entry: &ErrorLogEntry) {
        let Some((path, file)) = &self.sink else {
            return;
        };
        let mut file = file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let written = file
            .write_all(entry.to_line().as_bytes())
            .and_then(|_| file.sync_data());
        match written {
            Ok(()) => debug!(
                "error log += {} (t={})",
                entry.identifier,
                entry
                    .timestamp
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0)
            ),
            Err(e) => error!(
                "Could not write to error log {}: {} (entry for {})",
                path.display(),
                e,
                entry.identifier
            ),
        }
    }
}
