//! Cycle state machine tests: transitions, export outcomes, and error
//! containment at the cycle boundary. No real waiting or network access.

use chrono::{DateTime, Duration as ChronoDuration, Local, TimeZone};
use homefeed_core::{FeedProvider, FetchError, Pacer, PageResponse, SweepError};
use homefeed_runner::{
    read_manifest, Clock, CycleError, CycleExporter, CycleOutcome, CycleState, Poller,
};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;

// ── Fakes ────────────────────────────────────────────────────────────

struct ScriptedFeed {
    pages: HashMap<u32, PageResponse>,
    failing_pages: Vec<u32>,
    /// Number of upcoming page-1 requests that fail.
    first_page_failures: Cell<usize>,
    calls: RefCell<Vec<u32>>,
}

impl ScriptedFeed {
    fn uniform(total_count: u64, per_page: usize) -> Self {
        let mut pages = HashMap::new();
        let mut id = 0;
        let mut page = 1;
        let mut remaining = total_count as usize;
        while remaining > 0 {
            let n = remaining.min(per_page);
            let records = (0..n)
                .map(|_| {
                    id += 1;
                    record(id)
                })
                .collect();
            pages.insert(
                page,
                PageResponse {
                    total_count,
                    records,
                    success: true,
                },
            );
            remaining -= n;
            page += 1;
        }
        if pages.is_empty() {
            pages.insert(
                1,
                PageResponse {
                    total_count: 0,
                    records: Vec::new(),
                    success: true,
                },
            );
        }
        Self {
            pages,
            failing_pages: Vec::new(),
            first_page_failures: Cell::new(0),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl FeedProvider for ScriptedFeed {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch_page(&self, page: u32) -> Result<PageResponse, FetchError> {
        self.calls.borrow_mut().push(page);
        if page == 1 && self.first_page_failures.get() > 0 {
            self.first_page_failures.set(self.first_page_failures.get() - 1);
            return Err(FetchError::NetworkUnreachable("dns lookup failed".into()));
        }
        if self.failing_pages.contains(&page) {
            return Err(FetchError::HttpStatus { page, status: 503 });
        }
        self.pages
            .get(&page)
            .cloned()
            .ok_or(FetchError::HttpStatus { page, status: 404 })
    }
}

#[derive(Default)]
struct RecordingPacer {
    pauses: RefCell<Vec<Duration>>,
}

impl Pacer for RecordingPacer {
    fn pause(&self, duration: Duration) {
        self.pauses.borrow_mut().push(duration);
    }
}

/// Advances one minute per reading so consecutive cycles get distinct files.
struct SteppingClock {
    next: Cell<DateTime<Local>>,
}

impl SteppingClock {
    fn starting_at(start: DateTime<Local>) -> Self {
        Self {
            next: Cell::new(start),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Local> {
        let now = self.next.get();
        self.next.set(now + ChronoDuration::minutes(1));
        now
    }
}

fn start_time() -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
}

fn record(id: i64) -> Value {
    json!({
        "id": id,
        "name": format!("event-{id}"),
        "display_name": format!("Will event {id} happen?"),
        "image_url": "https://cdn.example.com/e.png",
        "yes_price": "₹ 6.5",
        "no_price": "₹ 3.5",
        "trading_info": "1K traders",
        "traders_count_numeric": 1000,
        "expiry_date": "16 Oct",
        "expiry_date_time_stamp": "2026-10-16T16:30:00Z",
        "probability_data": {"text": "65% chance", "value": 65}
    })
}

const PAGE_DELAY: Duration = Duration::from_millis(1000);
const CYCLE_INTERVAL: Duration = Duration::from_secs(300);

fn poller<'a>(
    feed: &'a ScriptedFeed,
    pacer: &'a RecordingPacer,
    clock: &'a SteppingClock,
    exporter: CycleExporter,
) -> Poller<'a> {
    Poller::new(feed, pacer, clock, exporter, PAGE_DELAY, CYCLE_INTERVAL)
}

fn csv_files(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    files.sort();
    files
}

// ── Transitions ──────────────────────────────────────────────────────

#[test]
fn successful_cycle_walks_every_state() {
    let dir = tempfile::tempdir().unwrap();
    let feed = ScriptedFeed::uniform(25, 10);
    let pacer = RecordingPacer::default();
    let clock = SteppingClock::starting_at(start_time());
    let mut p = poller(&feed, &pacer, &clock, CycleExporter::new(dir.path(), "homefeed_data"));

    assert_eq!(p.state(), CycleState::Idle);
    assert_eq!(p.cycles_completed(), 0);
    assert!(p.step().is_none());
    assert_eq!(p.state(), CycleState::FetchingFirstPage);
    assert!(p.step().is_none());
    assert_eq!(p.state(), CycleState::SweepingPages);
    assert!(p.step().is_none());
    assert_eq!(p.state(), CycleState::Exporting);

    let report = p.step().expect("cycle should end after export");
    assert_eq!(p.state(), CycleState::Sleeping);
    assert_eq!(report.cycle, 1);
    assert_eq!(p.cycles_completed(), 1);
    assert_eq!(report.completed_at, start_time());
    assert_eq!(report.sweep.unwrap().events, 25);

    assert!(p.step().is_none());
    assert_eq!(p.state(), CycleState::FetchingFirstPage);
    assert_eq!(pacer.pauses.borrow().last(), Some(&CYCLE_INTERVAL));
}

#[test]
fn export_is_named_after_completion_time() {
    let dir = tempfile::tempdir().unwrap();
    let feed = ScriptedFeed::uniform(5, 10);
    let pacer = RecordingPacer::default();
    let clock = SteppingClock::starting_at(start_time());
    let mut p = poller(&feed, &pacer, &clock, CycleExporter::new(dir.path(), "homefeed_data"));

    p.run(Some(1), None);

    assert_eq!(
        csv_files(dir.path()),
        vec![dir.path().join("homefeed_data_20261016_120000.csv")]
    );
}

// ── Outcomes ─────────────────────────────────────────────────────────

#[test]
fn empty_sweep_reports_no_data_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let feed = ScriptedFeed::uniform(0, 10);
    let pacer = RecordingPacer::default();
    let clock = SteppingClock::starting_at(start_time());
    let mut p = poller(&feed, &pacer, &clock, CycleExporter::new(dir.path(), "homefeed_data"));

    let report = (0..4).find_map(|_| p.step()).unwrap();

    assert!(matches!(report.outcome, CycleOutcome::NoData));
    assert!(csv_files(dir.path()).is_empty());
    assert_eq!(p.state(), CycleState::Sleeping);
}

#[test]
fn all_records_invalid_is_no_data() {
    let dir = tempfile::tempdir().unwrap();
    let mut feed = ScriptedFeed::uniform(3, 10);
    for r in &mut feed.pages.get_mut(&1).unwrap().records {
        r["yes_price"] = json!("₹ closed");
    }
    let pacer = RecordingPacer::default();
    let clock = SteppingClock::starting_at(start_time());
    let mut p = poller(&feed, &pacer, &clock, CycleExporter::new(dir.path(), "homefeed_data"));

    let report = (0..4).find_map(|_| p.step()).unwrap();

    assert!(matches!(report.outcome, CycleOutcome::NoData));
    assert_eq!(report.sweep.unwrap().records_rejected, 3);
}

#[test]
fn failed_page_undercounts_but_still_exports() {
    let dir = tempfile::tempdir().unwrap();
    let mut feed = ScriptedFeed::uniform(100, 10);
    feed.failing_pages.push(4);
    let pacer = RecordingPacer::default();
    let clock = SteppingClock::starting_at(start_time());
    let mut p = poller(&feed, &pacer, &clock, CycleExporter::new(dir.path(), "homefeed_data"));

    let report = (0..4).find_map(|_| p.step()).unwrap();

    match report.outcome {
        CycleOutcome::Exported(artifacts) => assert_eq!(artifacts.rows, 90),
        other => panic!("expected export, got {other:?}"),
    }
    assert_eq!(report.sweep.unwrap().pages_failed, 1);
    assert_eq!(*feed.calls.borrow(), (1..=10).collect::<Vec<_>>());
}

// ── Error containment ────────────────────────────────────────────────

#[test]
fn first_page_failure_ends_cycle_and_still_sleeps() {
    let dir = tempfile::tempdir().unwrap();
    let feed = ScriptedFeed::uniform(20, 10);
    feed.first_page_failures.set(1);
    let pacer = RecordingPacer::default();
    let clock = SteppingClock::starting_at(start_time());
    let mut p = poller(&feed, &pacer, &clock, CycleExporter::new(dir.path(), "homefeed_data"));

    p.step(); // Idle → FetchingFirstPage
    let report = p.step().expect("first-page failure ends the cycle");

    assert!(matches!(
        report.outcome,
        CycleOutcome::Failed(CycleError::Sweep(SweepError::FirstPage(_)))
    ));
    assert!(report.sweep.is_none());
    assert_eq!(p.state(), CycleState::Sleeping);
    assert_eq!(p.cycles_completed(), 1);

    p.step();
    assert_eq!(*pacer.pauses.borrow(), vec![CYCLE_INTERVAL]);

    // The next cycle recovers.
    let report = (0..4).find_map(|_| p.step()).unwrap();
    assert_eq!(report.cycle, 2);
    assert!(matches!(report.outcome, CycleOutcome::Exported(_)));
}

#[test]
fn degenerate_first_page_is_a_cycle_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut feed = ScriptedFeed::uniform(0, 10);
    feed.pages.get_mut(&1).unwrap().total_count = 50;
    let pacer = RecordingPacer::default();
    let clock = SteppingClock::starting_at(start_time());
    let mut p = poller(&feed, &pacer, &clock, CycleExporter::new(dir.path(), "homefeed_data"));

    let report = (0..4).find_map(|_| p.step()).unwrap();

    assert!(matches!(
        report.outcome,
        CycleOutcome::Failed(CycleError::Sweep(SweepError::Pagination(_)))
    ));
    assert_eq!(p.state(), CycleState::Sleeping);
}

#[test]
fn export_failure_is_contained() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"occupied").unwrap();
    let feed = ScriptedFeed::uniform(5, 10);
    let pacer = RecordingPacer::default();
    let clock = SteppingClock::starting_at(start_time());
    let mut p = poller(&feed, &pacer, &clock, CycleExporter::new(&blocker, "homefeed_data"));

    let report = (0..4).find_map(|_| p.step()).unwrap();

    assert!(matches!(
        report.outcome,
        CycleOutcome::Failed(CycleError::Export(_))
    ));
    assert_eq!(report.sweep.unwrap().events, 5);
    assert_eq!(p.state(), CycleState::Sleeping);
}

// ── Bounded runs ─────────────────────────────────────────────────────

#[test]
fn bounded_run_sleeps_between_cycles_only() {
    let dir = tempfile::tempdir().unwrap();
    let feed = ScriptedFeed::uniform(30, 10);
    let pacer = RecordingPacer::default();
    let clock = SteppingClock::starting_at(start_time());
    let mut p = poller(&feed, &pacer, &clock, CycleExporter::new(dir.path(), "homefeed_data"));

    let completed = p.run(Some(2), None);

    assert_eq!(completed, 2);
    assert_eq!(
        *pacer.pauses.borrow(),
        vec![PAGE_DELAY, PAGE_DELAY, CYCLE_INTERVAL, PAGE_DELAY, PAGE_DELAY]
    );
    assert_eq!(csv_files(dir.path()).len(), 2);
    assert_eq!(*feed.calls.borrow(), vec![1, 2, 3, 1, 2, 3]);
}

#[test]
fn cancelled_run_does_nothing() {
    let feed = ScriptedFeed::uniform(30, 10);
    let pacer = RecordingPacer::default();
    let clock = SteppingClock::starting_at(start_time());
    let dir = tempfile::tempdir().unwrap();
    let mut p = poller(&feed, &pacer, &clock, CycleExporter::new(dir.path(), "homefeed_data"));
    let cancel = std::sync::atomic::AtomicBool::new(true);

    assert_eq!(p.run(None, Some(&cancel)), 0);
    assert!(feed.calls.borrow().is_empty());
}

// ── Manifest ─────────────────────────────────────────────────────────

#[test]
fn manifest_describes_the_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let mut feed = ScriptedFeed::uniform(30, 10);
    feed.failing_pages.push(2);
    feed.pages.get_mut(&3).unwrap().records[0]["probability_data"] = json!(null);
    let pacer = RecordingPacer::default();
    let clock = SteppingClock::starting_at(start_time());
    let exporter = CycleExporter::new(dir.path(), "snap").with_manifest(true);
    let mut p = poller(&feed, &pacer, &clock, exporter);

    let report = (0..4).find_map(|_| p.step()).unwrap();
    let CycleOutcome::Exported(artifacts) = report.outcome else {
        panic!("expected export");
    };

    let manifest_path = artifacts.manifest.expect("manifest enabled");
    assert_eq!(manifest_path, dir.path().join("snap_20261016_120000.manifest.json"));
    let manifest = read_manifest(&manifest_path).unwrap();
    assert_eq!(manifest.csv_file, "snap_20261016_120000.csv");
    assert_eq!(manifest.total_count, 30);
    assert_eq!(manifest.total_pages, 3);
    assert_eq!(manifest.pages_attempted, 3);
    assert_eq!(manifest.pages_failed, 1);
    assert_eq!(manifest.records_rejected, 1);
    assert_eq!(manifest.rows_exported, 19);

    let bytes = std::fs::read(&artifacts.csv).unwrap();
    assert_eq!(manifest.data_hash, blake3::hash(&bytes).to_hex().to_string());
}

#[test]
fn manifest_failure_names_the_written_csv() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the manifest file should go makes its write fail.
    std::fs::create_dir(dir.path().join("snap_20261016_120000.manifest.json")).unwrap();
    let feed = ScriptedFeed::uniform(10, 10);
    let pacer = RecordingPacer::default();
    let clock = SteppingClock::starting_at(start_time());
    let exporter = CycleExporter::new(dir.path(), "snap").with_manifest(true);
    let mut p = poller(&feed, &pacer, &clock, exporter);

    let report = (0..4).find_map(|_| p.step()).unwrap();
    let CycleOutcome::Failed(CycleError::Export(e)) = report.outcome else {
        panic!("expected export failure");
    };

    let csv_path = dir.path().join("snap_20261016_120000.csv");
    assert!(csv_path.exists());
    assert!(format!("{e:#}").contains(&csv_path.display().to_string()));
    assert_eq!(p.state(), CycleState::Sleeping);
}
