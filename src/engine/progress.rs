//! Progress reporting for the CLI: one log line per batch, or a kdam counter bar

use kdam::{Animation, Bar, BarExt};
use log::info;
use std::sync::{Arc, Mutex};

use crate::pipeline::{BatchReport, ProgressSink, RunStats};
use crate::utils::Colors;

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Force a refresh of the bar (e.g. so the counter shows "0 items" immediately).
pub fn refresh_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.try_lock() {
        let _ = bar.refresh();
    }
}

/// Create a counter for unknown total (shows count without percentage)
pub fn create_counter(desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = " items"
    )))
}

/// Advance the bar by `n` and replace its postfix.
/// Uses try_lock so a contended bar never blocks the scheduler; the next batch catches up.
pub fn update_progress_bar(pb: &ProgressBar, n: usize, postfix: String) {
    if let Ok(mut bar) = pb.try_lock() {
        bar.postfix = postfix;
        let _ = bar.update(n);
    }
}

/// `scanned 120, processed 100, skipped 15, errors 5, 12.34 items/s`
pub fn progress_line(stats: &RunStats) -> String {
    let mut line = format!(
        "scanned {}, {}, {}, {}, {:.2} items/s",
        stats.scanned,
        Colors::colorize(Colors::PROCESSED, &format!("processed {}", stats.processed)),
        Colors::colorize(Colors::SKIPPED, &format!("skipped {}", stats.skipped)),
        Colors::colorize(Colors::FAILED, &format!("errors {}", stats.errored)),
        stats.throughput()
    );
    if stats.cancelled > 0 {
        line.push_str(&format!(
            ", {}",
            Colors::colorize(Colors::CANCELLED, &format!("cancelled {}", stats.cancelled))
        ));
    }
    line
}

/// Final summary block, one entry per line.
pub fn summary_lines(stats: &RunStats) -> Vec<String> {
    let mut lines = vec![
        format!("Elapsed:    {:.2} s", stats.elapsed().as_secs_f64()),
        format!("Batches:    {}", stats.batches),
        Colors::colorize(Colors::PROCESSED, &format!("Processed:  {}", stats.processed)),
        Colors::colorize(Colors::SKIPPED, &format!("Skipped:    {}", stats.skipped)),
        Colors::colorize(Colors::FAILED, &format!("Failed:     {}", stats.errored)),
    ];
    if stats.cancelled > 0 {
        lines.push(Colors::colorize(
            Colors::CANCELLED,
            &format!("Cancelled:  {}", stats.cancelled),
        ));
    }
    lines.push(format!("Throughput: {:.2} items/s", stats.throughput()));
    lines
}

/// CLI progress sink.
pub struct Reporter {
    label: &'static str,
    bar: Option<ProgressBar>,
}

impl Reporter {
    /// `show_bar`: kdam counter instead of one log line per batch.
    pub fn new(label: &'static str, show_bar: bool) -> Self {
        let bar = show_bar.then(|| {
            let b = create_counter(label);
            refresh_bar(&b);
            b
        });
        Self { label, bar }
    }
}

impl ProgressSink for Reporter {
    fn on_batch(&mut self, report: &BatchReport, stats: &RunStats) {
        match &self.bar {
            Some(bar) => update_progress_bar(
                bar,
                report.size,
                format!(
                    "ok {} skip {} err {}",
                    stats.processed, stats.skipped, stats.errored
                ),
            ),
            None => info!("{} batch {}: {}", self.label, report.index, progress_line(stats)),
        }
    }

    fn on_finish(&mut self, stats: &RunStats) {
        if let Some(bar) = &self.bar {
            refresh_bar(bar);
            eprintln!();
        }
        info!("{} finished", self.label);
        for line in summary_lines(stats) {
            info!("  {}", line);
        }
    }
}
