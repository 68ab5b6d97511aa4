//! Scheduler tests with an in-memory source and a scripted processor: batching, isolation,
//! idempotence, statistics, error log, cancellation.

use anyhow::Result;
use bulkshift::pipeline::{BatchReport, ItemProcessor, ItemSource, ProgressSink, RunStats};
use bulkshift::{CancelFlag, NoProgress, PipelineOpts, WorkItem, run_batch};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
struct Name(String);

impl WorkItem for Name {
    fn identifier(&self) -> String {
        self.0.clone()
    }
}

struct VecSource(Vec<&'static str>);

impl ItemSource for VecSource {
    type Item = Name;

    fn items(&self) -> Box<dyn Iterator<Item = Name> + '_> {
        Box::new(self.0.iter().map(|s| Name(s.to_string())))
    }
}

/// Writes `<out>/<name>.out`; fails or panics for the configured names.
struct Scripted {
    out: PathBuf,
    fail: HashSet<&'static str>,
    panic_on: HashSet<&'static str>,
    cancel_on: Option<(&'static str, CancelFlag)>,
    delay: Duration,
    started: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Scripted {
    fn new(out: &Path) -> Self {
        Self {
            out: out.to_path_buf(),
            fail: HashSet::new(),
            panic_on: HashSet::new(),
            cancel_on: None,
            delay: Duration::ZERO,
            started: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

impl ItemProcessor for Scripted {
    type Item = Name;

    fn output_path(&self, item: &Name) -> Result<PathBuf> {
        Ok(self.out.join(format!("{}.out", item.0)))
    }

    fn transform(&self, item: &Name, dest: &Path, _cancel: &CancelFlag) -> Result<()> {
        self.started.lock().unwrap().push(item.0.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some((name, flag)) = &self.cancel_on
            && *name == item.0
        {
            flag.cancel();
        }
        if self.panic_on.contains(item.0.as_str()) {
            panic!("decoder blew up on {}", item.0);
        }
        if self.fail.contains(item.0.as_str()) {
            anyhow::bail!("cannot transform {}", item.0);
        }
        std::fs::write(dest, item.0.as_bytes())?;
        Ok(())
    }
}

#[derive(Default)]
struct Recording {
    reports: Vec<BatchReport>,
    snapshots: Vec<(usize, usize)>,
    finished: usize,
}

impl ProgressSink for Recording {
    fn on_batch(&mut self, report: &BatchReport, stats: &RunStats) {
        self.reports.push(report.clone());
        self.snapshots.push((stats.scanned, stats.completed()));
    }

    fn on_finish(&mut self, _stats: &RunStats) {
        self.finished += 1;
    }
}

fn opts(batch_size: usize) -> PipelineOpts {
    PipelineOpts {
        batch_size,
        inter_batch_pause: Duration::ZERO,
        ..PipelineOpts::default()
    }
}

/// Temporary `.part` files still present directly under `dir`.
fn leftover_partials(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
        .count()
}

fn assert_balanced(stats: &RunStats) {
    assert_eq!(
        stats.scanned,
        stats.processed + stats.skipped + stats.errored + stats.cancelled
    );
}

#[test]
fn test_three_items_two_batches_all_processed() {
    let dir = tempfile::tempdir().unwrap();
    let processor = Scripted::new(dir.path());
    let mut sink = Recording::default();
    let o = PipelineOpts {
        skip_existing: false,
        ..opts(2)
    };

    let stats = run_batch(
        &VecSource(vec!["a.jpg", "b.jpg", "c.jpg"]),
        &processor,
        &o,
        &CancelFlag::new(),
        &mut sink,
    )
    .unwrap();

    assert_eq!(stats.processed, 3);
    assert_eq!(stats.skipped, 0);
    assert_eq!(stats.errored, 0);
    assert_eq!(stats.scanned, 3);
    assert_eq!(stats.batches, 2);
    let sizes: Vec<usize> = sink.reports.iter().map(|r| r.size).collect();
    assert_eq!(sizes, vec![2, 1]);
    assert_eq!(sink.finished, 1);

    // The second batch only starts after the first drained.
    let started = processor.started();
    let first: HashSet<&str> = started[..2].iter().map(String::as_str).collect();
    assert_eq!(first, HashSet::from(["a.jpg", "b.jpg"]));
    assert_eq!(started[2], "c.jpg");
}

#[test]
fn test_existing_output_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("b.jpg.out"), b"done").unwrap();
    let processor = Scripted::new(dir.path());

    let stats = run_batch(
        &VecSource(vec!["a.jpg", "b.jpg", "c.jpg"]),
        &processor,
        &opts(2),
        &CancelFlag::new(),
        &mut NoProgress,
    )
    .unwrap();

    assert_eq!(stats.processed, 2);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.errored, 0);
    assert!(!processor.started().contains(&"b.jpg".to_string()));
    assert_eq!(
        std::fs::read(dir.path().join("b.jpg.out")).unwrap(),
        b"done"
    );
}

#[test]
fn test_failing_item_is_isolated_and_logged() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let log_path = dir.path().join("logs").join("errors.log");
    let mut processor = Scripted::new(&out);
    processor.fail.insert("c.jpg");
    let o = PipelineOpts {
        error_log: Some(log_path.clone()),
        ..opts(2)
    };

    let stats = run_batch(
        &VecSource(vec!["a.jpg", "b.jpg", "c.jpg"]),
        &processor,
        &o,
        &CancelFlag::new(),
        &mut NoProgress,
    )
    .unwrap();

    assert_eq!(stats.processed, 2);
    assert_eq!(stats.skipped, 0);
    assert_eq!(stats.errored, 1);
    assert_balanced(&stats);
    assert!(out.join("a.jpg.out").is_file());
    assert!(out.join("b.jpg.out").is_file());
    assert!(!out.join("c.jpg.out").exists());
    assert_eq!(leftover_partials(&out), 0);

    let log = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("ERROR: c.jpg - "));
    assert!(lines[0].contains("cannot transform c.jpg"));
}

#[test]
fn test_panicking_processor_only_fails_its_item() {
    let dir = tempfile::tempdir().unwrap();
    let mut processor = Scripted::new(dir.path());
    processor.panic_on.insert("b");

    let stats = run_batch(
        &VecSource(vec!["a", "b", "c", "d"]),
        &processor,
        &opts(4),
        &CancelFlag::new(),
        &mut NoProgress,
    )
    .unwrap();

    assert_eq!(stats.processed, 3);
    assert_eq!(stats.errored, 1);
    for name in ["a", "c", "d"] {
        assert!(dir.path().join(format!("{name}.out")).is_file());
    }
}

#[test]
fn test_second_run_skips_everything() {
    let dir = tempfile::tempdir().unwrap();
    let source = VecSource(vec!["a", "b", "c", "d", "e"]);

    let first = run_batch(
        &source,
        &Scripted::new(dir.path()),
        &opts(2),
        &CancelFlag::new(),
        &mut NoProgress,
    )
    .unwrap();
    assert_eq!(first.processed, 5);

    let processor = Scripted::new(dir.path());
    let second = run_batch(
        &source,
        &processor,
        &opts(2),
        &CancelFlag::new(),
        &mut NoProgress,
    )
    .unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped, second.scanned);
    assert_eq!(second.scanned, 5);
    assert!(processor.started().is_empty());
}

#[test]
fn test_batch_boundaries() {
    let dir = tempfile::tempdir().unwrap();
    let names = vec!["1", "2", "3", "4", "5", "6", "7"];
    let mut sink = Recording::default();

    let stats = run_batch(
        &VecSource(names),
        &Scripted::new(dir.path()),
        &opts(3),
        &CancelFlag::new(),
        &mut sink,
    )
    .unwrap();

    assert_eq!(stats.batches, 3);
    let sizes: Vec<usize> = sink.reports.iter().map(|r| r.size).collect();
    assert_eq!(sizes, vec![3, 3, 1]);
    let indexes: Vec<usize> = sink.reports.iter().map(|r| r.index).collect();
    assert_eq!(indexes, vec![1, 2, 3]);
}

#[test]
fn test_exact_multiple_has_no_empty_batch() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = Recording::default();

    let stats = run_batch(
        &VecSource(vec!["1", "2", "3", "4"]),
        &Scripted::new(dir.path()),
        &opts(2),
        &CancelFlag::new(),
        &mut sink,
    )
    .unwrap();

    assert_eq!(stats.batches, 2);
    assert!(sink.reports.iter().all(|r| r.size == 2));
}

#[test]
fn test_progress_is_monotonic_and_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let mut processor = Scripted::new(dir.path());
    processor.fail.insert("3");
    let mut sink = Recording::default();

    run_batch(
        &VecSource(vec!["1", "2", "3", "4", "5"]),
        &processor,
        &opts(2),
        &CancelFlag::new(),
        &mut sink,
    )
    .unwrap();

    let mut last = 0;
    for (scanned, completed) in &sink.snapshots {
        assert!(*completed >= last);
        assert!(completed <= scanned);
        last = *completed;
    }
    assert_eq!(last, 5);
}

#[test]
fn test_concurrency_never_exceeds_one_batch() {
    let dir = tempfile::tempdir().unwrap();
    let mut processor = Scripted::new(dir.path());
    processor.delay = Duration::from_millis(20);

    run_batch(
        &VecSource(vec!["1", "2", "3", "4", "5", "6", "7", "8"]),
        &processor,
        &opts(3),
        &CancelFlag::new(),
        &mut NoProgress,
    )
    .unwrap();

    assert!(processor.max_in_flight.load(Ordering::SeqCst) <= 3);
}

#[test]
fn test_explicit_concurrency_bounds_workers() {
    let dir = tempfile::tempdir().unwrap();
    let mut processor = Scripted::new(dir.path());
    processor.delay = Duration::from_millis(10);
    let o = PipelineOpts {
        concurrency: Some(1),
        ..opts(4)
    };

    let stats = run_batch(
        &VecSource(vec!["1", "2", "3", "4"]),
        &processor,
        &o,
        &CancelFlag::new(),
        &mut NoProgress,
    )
    .unwrap();

    assert_eq!(stats.processed, 4);
    assert_eq!(processor.max_in_flight.load(Ordering::SeqCst), 1);
}

#[test]
fn test_empty_source_reports_zeroes() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = Recording::default();

    let stats = run_batch(
        &VecSource(vec![]),
        &Scripted::new(dir.path()),
        &opts(5),
        &CancelFlag::new(),
        &mut sink,
    )
    .unwrap();

    assert_eq!(stats.scanned, 0);
    assert_eq!(stats.completed(), 0);
    assert_eq!(stats.batches, 0);
    assert_eq!(stats.throughput(), 0.0);
    assert!(sink.reports.is_empty());
    assert_eq!(sink.finished, 1);
}

#[test]
fn test_zero_batch_size_fails_before_work() {
    let dir = tempfile::tempdir().unwrap();
    let processor = Scripted::new(dir.path());

    let err = run_batch(
        &VecSource(vec!["a"]),
        &processor,
        &opts(0),
        &CancelFlag::new(),
        &mut NoProgress,
    )
    .unwrap_err();

    assert!(format!("{err:#}").contains("batch size"));
    assert!(processor.started().is_empty());
}

#[test]
fn test_zero_concurrency_fails_before_work() {
    let dir = tempfile::tempdir().unwrap();
    let o = PipelineOpts {
        concurrency: Some(0),
        ..opts(2)
    };

    assert!(
        run_batch(
            &VecSource(vec!["a"]),
            &Scripted::new(dir.path()),
            &o,
            &CancelFlag::new(),
            &mut NoProgress,
        )
        .is_err()
    );
}

#[test]
fn test_cancel_before_start_processes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let processor = Scripted::new(dir.path());
    let cancel = CancelFlag::new();
    cancel.cancel();

    let stats = run_batch(
        &VecSource(vec!["a", "b", "c"]),
        &processor,
        &opts(2),
        &cancel,
        &mut NoProgress,
    )
    .unwrap();

    assert_eq!(stats.scanned, 0);
    assert!(processor.started().is_empty());
}

#[test]
fn test_cancel_mid_run_stops_after_current_batch() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancelFlag::new();
    let mut processor = Scripted::new(dir.path());
    processor.cancel_on = Some(("b", cancel.clone()));
    let o = PipelineOpts {
        concurrency: Some(1),
        ..opts(2)
    };
    let mut sink = Recording::default();

    let stats = run_batch(
        &VecSource(vec!["a", "b", "c", "d", "e", "f"]),
        &processor,
        &o,
        &cancel,
        &mut sink,
    )
    .unwrap();

    assert_eq!(stats.batches, 1);
    assert_eq!(stats.scanned, 2);
    assert_eq!(stats.processed + stats.cancelled, 2);
    assert_balanced(&stats);
    assert_eq!(sink.finished, 1);
    assert!(!processor.started().contains(&"c".to_string()));
}

#[test]
fn test_prepare_failure_is_a_configuration_error() {
    struct Unprepared;

    impl ItemProcessor for Unprepared {
        type Item = Name;

        fn prepare(&self) -> Result<()> {
            anyhow::bail!("output root is read-only")
        }

        fn output_path(&self, _item: &Name) -> Result<PathBuf> {
            unreachable!("no item may be processed")
        }

        fn transform(&self, _item: &Name, _dest: &Path, _cancel: &CancelFlag) -> Result<()> {
            unreachable!("no item may be processed")
        }
    }

    let err = run_batch(
        &VecSource(vec!["a"]),
        &Unprepared,
        &opts(1),
        &CancelFlag::new(),
        &mut NoProgress,
    )
    .unwrap_err();
    assert!(err.to_string().contains("read-only"));
}

/// Maps every item to the same output file.
struct SharedOutput {
    dest: PathBuf,
}

impl ItemProcessor for SharedOutput {
    type Item = Name;

    fn output_path(&self, _item: &Name) -> Result<PathBuf> {
        Ok(self.dest.clone())
    }

    fn transform(&self, item: &Name, dest: &Path, _cancel: &CancelFlag) -> Result<()> {
        let body = item.0.repeat(4096);
        std::fs::write(dest, &body[..2048])?;
        std::thread::sleep(Duration::from_millis(10));
        std::fs::OpenOptions::new()
            .append(true)
            .open(dest)?
            .write_all(&body.as_bytes()[2048..])?;
        Ok(())
    }
}

#[test]
fn test_items_sharing_an_output_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("photo.avif");
    let processor = SharedOutput { dest: dest.clone() };
    let names = vec!["a", "b", "c", "d"];

    let o = PipelineOpts {
        skip_existing: false,
        ..opts(4)
    };

    for _ in 0..5 {
        let stats = run_batch(
            &VecSource(names.clone()),
            &processor,
            &o,
            &CancelFlag::new(),
            &mut NoProgress,
        )
        .unwrap();

        assert_eq!(stats.processed, 4);
        assert_eq!(stats.errored, 0);
        let written = std::fs::read_to_string(&dest).unwrap();
        let first = &written[..1];
        assert!(names.contains(&first));
        assert_eq!(written, first.repeat(4096));
        assert_eq!(leftover_partials(dir.path()), 0);
    }
}

#[cfg(target_os = "linux")]
#[test]
fn test_unwritable_error_log_does_not_stop_the_run() {
    // Every write to /dev/full fails with ENOSPC.
    if !Path::new("/dev/full").exists() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let mut processor = Scripted::new(dir.path());
    processor.fail.insert("b");
    let o = PipelineOpts {
        error_log: Some(PathBuf::from("/dev/full")),
        ..opts(2)
    };

    let stats = run_batch(
        &VecSource(vec!["a", "b", "c"]),
        &processor,
        &o,
        &CancelFlag::new(),
        &mut NoProgress,
    )
    .unwrap();

    assert_eq!(stats.processed, 2);
    assert_eq!(stats.errored, 1);
    assert_eq!(stats.batches, 2);
    assert_balanced(&stats);
}

#[derive(Default)]
struct Timed {
    batches: Vec<Instant>,
    finished: Option<Instant>,
}

impl ProgressSink for Timed {
    fn on_batch(&mut self, _report: &BatchReport, _stats: &RunStats) {
        self.batches.push(Instant::now());
    }

    fn on_finish(&mut self, _stats: &RunStats) {
        self.finished = Some(Instant::now());
    }
}

#[test]
fn test_pause_between_batches_but_not_after_last() {
    let dir = tempfile::tempdir().unwrap();
    let pause = Duration::from_millis(50);
    let o = PipelineOpts {
        batch_size: 1,
        inter_batch_pause: pause,
        ..PipelineOpts::default()
    };
    let mut sink = Timed::default();

    let started = Instant::now();
    let stats = run_batch(
        &VecSource(vec!["a", "b", "c"]),
        &Scripted::new(dir.path()),
        &o,
        &CancelFlag::new(),
        &mut sink,
    )
    .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(stats.batches, 3);
    assert!(elapsed >= pause * 2);
    for pair in sink.batches.windows(2) {
        assert!(pair[1] - pair[0] >= pause);
    }
    let last = *sink.batches.last().unwrap();
    assert!(sink.finished.unwrap() - last < pause);
}
