use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, bounded};
use log::{debug, info};
use rayon::ThreadPool;
use rayon::prelude::*;
use std::thread;

use crate::pipeline::{
    ErrorLog, ItemProcessor, ItemSource, PipelineContext, PipelineTuning, ProgressSink, RunStats,
    check_for_skipped_items, process_item,
};
use crate::utils::fd_limit::cap_workers_by_fd_limit;
use crate::{CancelFlag, Outcome, PipelineOpts};

/// Validate options and derive worker count and channel capacity. Fails before any work starts.
pub fn setup_pipeline_tuning(opts: &PipelineOpts) -> Result<PipelineTuning> {
    opts.validate()?;
    let concurrency = cap_workers_by_fd_limit(opts.requested_concurrency());
    debug!(
        "batch size {}, concurrency {}, pause {:?}",
        opts.batch_size, concurrency, opts.inter_batch_pause
    );
    Ok(PipelineTuning {
        batch_size: opts.batch_size,
        concurrency,
        channel_cap: opts.batch_size,
    })
}

/// Producer side of the prefetch channel: walk the source and send items until it is exhausted,
/// the scheduler hangs up, or the run is cancelled. Returns the number of items sent.
fn feed_items<S: ItemSource>(source: &S, item_tx: Sender<S::Item>, cancel: &CancelFlag) -> usize {
    let mut sent = 0_usize;
    for item in source.items() {
        if cancel.is_cancelled() || item_tx.send(item).is_err() {
            break;
        }
        sent += 1;
    }
    drop(item_tx);
    sent
}

/// Pull items into `batch` until it holds `batch_size` items or the channel closes.
fn fill_batch<T>(item_rx: &Receiver<T>, batch: &mut Vec<T>, batch_size: usize) {
    while batch.len() < batch_size {
        match item_rx.recv() {
            Ok(item) => batch.push(item),
            Err(_) => break,
        }
    }
}

/// Fan the batch out over the pool and wait for every item (fan-in barrier).
/// Outcomes come back in scheduling order whatever the completion order was.
fn dispatch_batch<P: ItemProcessor>(
    pool: &ThreadPool,
    processor: &P,
    ctx: &PipelineContext<'_>,
    batch: &[P::Item],
) -> Vec<Outcome> {
    pool.install(|| {
        batch
            .par_iter()
            .with_max_len(1)
            .map(|item| process_item(processor, item, ctx))
            .collect()
    })
}

/// Main orchestrator: drain `source` into batches and run each through `processor`.
///
/// Source (prefetch thread) → bounded channel → batch of `batch_size` → worker pool → barrier →
/// stats + progress → pause (only when another batch follows) → next batch. Only one batch is
/// ever in flight. Item failures never fail the run; configuration problems (options, `prepare`,
/// error log) fail it before any item is processed.
pub fn run_pipeline<S, P>(
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
    let tuning = setup_pipeline_tuning(opts)?;
    processor.prepare()?;
    let error_log = ErrorLog::open(opts.error_log.as_deref())?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(tuning.concurrency)
        .thread_name(|i| format!("{}-worker-{i}", env!("CARGO_PKG_NAME")))
        .build()
        .context("build worker pool")?;

    let ctx = PipelineContext {
        skip_existing: opts.skip_existing,
        error_log: &error_log,
        cancel,
    };
    let mut stats = RunStats::new();
    let (item_tx, item_rx) = bounded::<S::Item>(tuning.channel_cap);

    thread::scope(|scope| {
        let feeder = scope.spawn(move || feed_items(source, item_tx, cancel));

        let mut batch = Vec::with_capacity(tuning.batch_size);
        while !cancel.is_cancelled() {
            fill_batch(&item_rx, &mut batch, tuning.batch_size);
            if batch.is_empty() {
                break;
            }
            // Pause only between batches: never before the first, never after the last.
            if stats.batches > 0 && !opts.inter_batch_pause.is_zero() {
                thread::sleep(opts.inter_batch_pause);
                if cancel.is_cancelled() {
                    break;
                }
            }
            stats.scanned += batch.len();
            let outcomes = dispatch_batch(&pool, processor, &ctx, &batch);
            let report = stats.record_batch(&outcomes);
            sink.on_batch(&report, &stats);
            batch.clear();
        }
        // Hang up so a producer blocked on a full channel (cancelled run) can exit.
        drop(item_rx);
        match feeder.join() {
            Ok(sent) => debug!("source produced {} items", sent),
            Err(_) => log::error!("source thread panicked; run ended early"),
        }
    });

    if cancel.is_cancelled() {
        info!("Run cancelled; statistics cover the items finished so far");
    }
    check_for_skipped_items(&source.skipped());
    sink.on_finish(&stats);
    Ok(stats)
}
