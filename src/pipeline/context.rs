//! Pipeline context and tuning: shared state handed to every item of a batch, and run-level settings.

use std::sync::{Arc, Mutex};

use crate::CancelFlag;
use crate::pipeline::ErrorLog;

/// Tuning derived from options and the FD limit.
#[derive(Clone, Debug)]
pub struct PipelineTuning {
    pub batch_size: usize,
    /// Worker threads for the per-batch pool.
    pub concurrency: usize,
    /// Capacity of the prefetch channel between the source thread and the scheduler.
    pub channel_cap: usize,
}

/// Shared by all concurrent `process_item` calls of a run. Everything in it is `Sync`.
pub struct PipelineContext<'a> {
    pub skip_existing: bool,
    pub error_log: &'a ErrorLog,
    pub cancel: &'a CancelFlag,
}

/// Enumeration problems recorded by a source: `(identifier, reason)`.
/// Shared between the source (which may run on the prefetch thread) and whoever reports them.
pub type SkippedItems = Arc<Mutex<Vec<(String, String)>>>;

pub fn new_skipped_items() -> SkippedItems {
    Arc::new(Mutex::new(Vec::new()))
}

/// Record one enumeration problem and log it.
pub fn record_skipped(skipped: &SkippedItems, identifier: String, reason: String) {
    log::warn!("Skipping {}: {}", identifier, reason);
    skipped
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .push((identifier, reason));
}
