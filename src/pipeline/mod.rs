//! Pipeline components: sources, per-item processing, scheduler, statistics, error log.

pub mod context;
pub mod error_handler;
pub mod error_log;
pub mod orchestrator;
pub mod process;
pub mod source;
pub mod stats;
pub mod walk;

pub use context::{
    PipelineContext, PipelineTuning, SkippedItems, new_skipped_items, record_skipped,
};
pub use error_handler::check_for_skipped_items;
pub use error_log::{ErrorLog, ErrorLogEntry};
pub use orchestrator::{run_pipeline, setup_pipeline_tuning};
pub use process::{ItemProcessor, process_item};
pub use source::{ItemSource, UrlListSource, parse_remote};
pub use stats::{BatchReport, NoProgress, ProgressSink, RunStats, rate};
pub use walk::{DirSource, WalkOutcome, to_outcome_walkdir};
