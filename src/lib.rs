//! Bulkshift: batch task pipeline with bounded concurrency, per-item failure isolation and
//! skip-if-done idempotence.

pub mod convert;
pub mod engine;
pub mod fetch;
pub mod pipeline;
pub mod processors;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use pipeline::{
    BatchReport, DirSource, ItemProcessor, ItemSource, NoProgress, ProgressSink, RunStats,
    UrlListSource,
};

/// Result alias used by public bulkshift API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point for custom pipelines: drain `source` through `processor` in batches.
///
/// - Batches of `opts.batch_size` items run one at a time; items of a batch run on up to
///   `opts.concurrency` worker threads (default: one per item).
/// - Item failures become [`Outcome::Failed`], are appended to `opts.error_log` and counted;
///   they never fail the run. Invalid options or a failing [`ItemProcessor::prepare`] do, before
///   any item is processed.
/// - Pass [`NoProgress`] when you don't need batch callbacks; set `cancel` to stop after the
///   current batch.
///
/// ```ignore
/// let source = bulkshift::DirSource::new("photos", &["jpg", "png"]);
/// let converter = bulkshift::processors::AvifConverter::new("photos-avif");
/// let stats = bulkshift::run_batch(&source, &converter, &Default::default(), &Default::default(), &mut bulkshift::NoProgress)?;
/// assert_eq!(stats.scanned, stats.processed + stats.skipped + stats.errored);
/// ```
pub fn run_batch<S, P>(
    source: &S,
    processor: &P,
    opts: &PipelineOpts,
    cancel: &CancelFlag,
    sink: &mut dyn ProgressSink,
) -> Result<RunStats>
where
    S: ItemSource,
    P: ItemProcessor<Item = S::Item>,
{
    log::debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    pipeline::run_pipeline(source, processor, opts, cancel, sink)
}
