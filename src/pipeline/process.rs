//! Per-item step: idempotence check, then the processor, with failures turned into outcomes.

use anyhow::{Context, Result, anyhow};
use log::{debug, error};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use super::context::PipelineContext;
use super::error_log::ErrorLogEntry;
use crate::utils::tempfiles::{create_partial, persist_partial};
use crate::{CancelFlag, Interrupted, Outcome, WorkItem};

/// Transforms one work item into a persisted output.
///
/// `transform` writes to `dest`, a temporary sibling of the final output; the pipeline renames
/// it into place on success and removes it on failure.
pub trait ItemProcessor: Sync {
    type Item: WorkItem;

    /// Run once before any item. Errors here are configuration errors and stop the run.
    fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Deterministic output location for `item`.
    fn output_path(&self, item: &Self::Item) -> Result<PathBuf>;

    /// Produce the output for `item` at `dest`. Long-running work should poll `cancel`
    /// and return [`Interrupted`] when it is set.
    fn transform(&self, item: &Self::Item, dest: &Path, cancel: &CancelFlag) -> Result<()>;
}

/// Process one item. Never fails: every error (and any panic inside the processor) becomes
/// [`Outcome::Failed`] and an error log entry.
pub fn process_item<P: ItemProcessor>(
    processor: &P,
    item: &P::Item,
    ctx: &PipelineContext<'_>,
) -> Outcome {
    if ctx.cancel.is_cancelled() {
        return Outcome::Cancelled;
    }
    match attempt(processor, item, ctx) {
        Ok(outcome) => outcome,
        Err(err) if err.is::<Interrupted>() => Outcome::Cancelled,
        Err(err) => {
            let identifier = item.identifier();
            let reason = format!("{err:#}");
            error!("Failed {}: {}", identifier, reason);
            ctx.error_log
                .append(&ErrorLogEntry::new(identifier, reason.clone()));
            Outcome::Failed(reason)
        }
    }
}

fn attempt<P: ItemProcessor>(
    processor: &P,
    item: &P::Item,
    ctx: &PipelineContext<'_>,
) -> Result<Outcome> {
    let dest = guarded(|| processor.output_path(item)).context("resolve output path")?;
    if ctx.skip_existing && dest.exists() {
        debug!("skip {} (exists: {})", item.identifier(), dest.display());
        return Ok(Outcome::Skipped);
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output directory {}", parent.display()))?;
    }

    // Dropping `partial` on an error path removes the file.
    let partial = create_partial(&dest)?;
    guarded(|| processor.transform(item, &partial, ctx.cancel))?;
    persist_partial(partial, &dest)?;
    debug!("done {} -> {}", item.identifier(), dest.display());
    Ok(Outcome::Processed)
}

/// Run processor code, turning a panic into an error so it stays confined to this item.
fn guarded<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(anyhow!("processor panicked: {}", panic_message(&*payload))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
