//! Public and internal types for the bulkshift API and pipeline.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use url::Url;

use crate::utils::config::Defaults;

/// One unit of work produced by an item source. Immutable once produced.
///
/// The identifier is what shows up in console output and in the error log file; the mapping from
/// an item to its output location belongs to the processor.
pub trait WorkItem: Send + Sync {
    fn identifier(&self) -> String;
}

/// A file discovered under a walked root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    /// Path to read from (root joined with `relative`).
    pub path: PathBuf,
    /// Path relative to the walked root; mirrored under the output root.
    pub relative: PathBuf,
}

impl WorkItem for SourceFile {
    fn identifier(&self) -> String {
        self.path.display().to_string()
    }
}

/// A remote resource to fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFile {
    pub url: Url,
}

impl WorkItem for RemoteFile {
    fn identifier(&self) -> String {
        self.url.to_string()
    }
}

/// Result of one processing attempt. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Output written.
    Processed,
    /// Output already existed and `skip_existing` was on; the transformation did not run.
    Skipped,
    /// Resolution, directory creation or transformation failed. Holds the rendered error chain.
    Failed(String),
    /// Cancellation was requested before (or while) the item ran.
    Cancelled,
}

/// Shared cancellation flag: set by the Ctrl+C handler (CLI) or by a library caller,
/// read by the scheduler between batches and by processors at their own checkpoints.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Error returned by a processor that stopped because the run was cancelled.
/// The pipeline turns it into [`Outcome::Cancelled`] instead of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("interrupted by cancellation")
    }
}

impl std::error::Error for Interrupted {}

/// Scheduler options for [`run_pipeline`](crate::pipeline::run_pipeline).
#[derive(Clone, Debug)]
pub struct PipelineOpts {
    /// Items per batch. Must be at least 1.
    pub batch_size: usize,
    /// Worker threads per batch. `None` means one per batch slot (`batch_size`).
    pub concurrency: Option<usize>,
    /// Return `Skipped` for items whose output already exists.
    pub skip_existing: bool,
    /// Sleep after each full batch before pulling the next one.
    pub inter_batch_pause: Duration,
    /// Append-only failure log. `None` disables the file sink.
    pub error_log: Option<PathBuf>,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self {
            batch_size: Defaults::BATCH_SIZE,
            concurrency: None,
            skip_existing: Defaults::SKIP_EXISTING,
            inter_batch_pause: Duration::from_millis(Defaults::INTER_BATCH_PAUSE_MS),
            error_log: None,
        }
    }
}

impl PipelineOpts {
    /// Requested concurrency before the FD-limit cap.
    pub fn requested_concurrency(&self) -> usize {
        self.concurrency.unwrap_or(self.batch_size)
    }

    /// Configuration errors that must stop the run before any item is touched.
    pub fn validate(&self) -> crate::Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("batch size must be at least 1");
        }
        if self.concurrency == Some(0) {
            anyhow::bail!("concurrency must be at least 1");
        }
        Ok(())
    }
}

/// Full options (CLI and the bundled jobs). Use [`PipelineOpts`] with your own source/processor.
#[derive(Clone, Debug)]
pub struct Opts {
    pub batch_size: usize,
    pub concurrency: Option<usize>,
    pub skip_existing: bool,
    /// Inter-batch pause in milliseconds.
    pub pause_ms: u64,
    pub error_log: Option<PathBuf>,
    /// Debug-level logging; lists unreadable directories / rejected list lines.
    pub verbose: bool,
    /// Show a progress bar instead of one log line per batch.
    pub progress: bool,
    /// Exit non-zero when any item failed.
    pub fail_on_error: bool,
    /// AVIF quality (1-100).
    pub quality: u8,
    /// AVIF encoder speed (0-10).
    pub speed: u8,
    /// Exclude patterns for the directory walk (`*` and `?`).
    pub exclude: Vec<String>,
    pub follow_links: bool,
    /// Download retries after the first attempt.
    pub max_retries: u32,
    /// Per-request download timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            batch_size: Defaults::BATCH_SIZE,
            concurrency: None,
            skip_existing: Defaults::SKIP_EXISTING,
            pause_ms: Defaults::INTER_BATCH_PAUSE_MS,
            error_log: None,
            verbose: false,
            progress: false,
            fail_on_error: false,
            quality: Defaults::AVIF_QUALITY,
            speed: Defaults::AVIF_SPEED,
            exclude: Vec::new(),
            follow_links: false,
            max_retries: Defaults::MAX_RETRIES,
            timeout_secs: Defaults::TIMEOUT_SECS,
        }
    }
}

impl From<&Opts> for PipelineOpts {
    fn from(o: &Opts) -> Self {
        PipelineOpts {
            batch_size: o.batch_size,
            concurrency: o.concurrency,
            skip_existing: o.skip_existing,
            inter_batch_pause: Duration::from_millis(o.pause_ms),
            error_log: o.error_log.clone(),
        }
    }
}
