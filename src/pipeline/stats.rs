//! Run statistics, per-batch reports and the progress sink seam.

use std::time::{Duration, Instant};

use crate::Outcome;

/// Counters for one run. Owned by the scheduler and only updated at the post-batch barrier,
/// so no locking is involved.
///
/// Once the source is exhausted and every batch drained:
/// `scanned == processed + skipped + errored + cancelled` (`cancelled` is 0 unless the run was cancelled).
#[derive(Clone, Debug)]
pub struct RunStats {
    pub scanned: usize,
    pub processed: usize,
    pub skipped: usize,
    pub errored: usize,
    pub cancelled: usize,
    pub batches: usize,
    started: Instant,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            scanned: 0,
            processed: 0,
            skipped: 0,
            errored: 0,
            cancelled: 0,
            batches: 0,
            started: Instant::now(),
        }
    }

    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Processed => self.processed += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed(_) => self.errored += 1,
            Outcome::Cancelled => self.cancelled += 1,
        }
    }

    /// Fold one drained batch into the counters and return its report.
    /// `scanned` is advanced by the scheduler when the batch is pulled, not here.
    pub fn record_batch(&mut self, outcomes: &[Outcome]) -> BatchReport {
        self.batches += 1;
        let mut report = BatchReport {
            index: self.batches,
            size: outcomes.len(),
            ..BatchReport::default()
        };
        for outcome in outcomes {
            self.record(outcome);
            report.count(outcome);
        }
        report
    }

    /// Items with an outcome so far.
    pub fn completed(&self) -> usize {
        self.processed + self.skipped + self.errored + self.cancelled
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Processed items per second; 0.0 when nothing was processed or no time has passed.
    pub fn throughput(&self) -> f64 {
        rate(self.processed, self.elapsed())
    }
}

/// `count / elapsed` in items per second, 0.0 for an empty count or zero elapsed time.
pub fn rate(count: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if count == 0 || secs <= 0.0 {
        0.0
    } else {
        count as f64 / secs
    }
}

/// Outcome counts of one batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// 1-based batch number.
    pub index: usize,
    pub size: usize,
    pub processed: usize,
    pub skipped: usize,
    pub errored: usize,
    pub cancelled: usize,
}

impl BatchReport {
    fn count(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Processed => self.processed += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed(_) => self.errored += 1,
            Outcome::Cancelled => self.cancelled += 1,
        }
    }
}

/// Receives progress from the scheduler: once per drained batch, once at the end.
pub trait ProgressSink {
    fn on_batch(&mut self, report: &BatchReport, stats: &RunStats);
    fn on_finish(&mut self, stats: &RunStats);
}

/// Sink that reports nothing.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_batch(&mut self, _report: &BatchReport, _stats: &RunStats) {}
    fn on_finish(&mut self, _stats: &RunStats) {}
}
