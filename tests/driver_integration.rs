use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use batchwatch::config::Config;
use batchwatch::err::Result;
use batchwatch::utilities::init_file_logger;
use batchwatch::{
    Collaborators, JobId, JobSource, MemoryJobSource, Notifier, OutputPersister, ProductionJob,
    StockCreator, TickDriver,
};

// Each test installs a real file logger; only the first set wins and the
// rest keep logging through it.
async fn init_test_logger(prefix: &str) {
    let mut p = std::env::temp_dir();
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    p.push(format!("{}_{}_{}.log", prefix, std::process::id(), ts));
    let (logger, _task) = init_file_logger(&p).await.expect("init logger");
    let _ = batchwatch::global_var::LOGGER_CELL.set(logger);
}

fn test_config(fast_secs: u64, slow_secs: u64, cycle_secs: u64) -> Config {
    let mut config = Config::default();
    config.ticks.fast_secs = fast_secs;
    config.ticks.slow_secs = slow_secs;
    config.production.cycle_duration_secs = cycle_secs;
    config.production.history_capacity = 16;
    config
}

struct RecordingStock {
    calls: Mutex<Vec<(JobId, u32)>>,
    fail_for: Option<JobId>,
}

#[async_trait]
impl StockCreator for RecordingStock {
    async fn create_stock(&self, job: &ProductionJob, units: u32) -> Result<()> {
        self.calls.lock().unwrap().push((job.id, units));
        if self.fail_for == Some(job.id) {
            return Err(format!("warehouse rejected {}", job.product_code).into());
        }
        Ok(())
    }
}

#[derive(Default)]
struct RecordingPersister {
    calls: Mutex<Vec<(JobId, u32)>>,
}

#[async_trait]
impl OutputPersister for RecordingPersister {
    async fn persist_actual_output(&self, job_id: JobId, cumulative_units: u32) -> Result<()> {
        self.calls.lock().unwrap().push((job_id, cumulative_units));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

struct CountingJobSource {
    jobs: Vec<ProductionJob>,
    calls: AtomicUsize,
}

#[async_trait]
impl JobSource for CountingJobSource {
    async fn snapshot(&self) -> Result<Vec<ProductionJob>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.jobs.clone())
    }
}

/// Fails the first `failures` snapshot calls, then recovers.
struct FlakyJobSource {
    jobs: Vec<ProductionJob>,
    calls: AtomicUsize,
    failures: usize,
}

#[async_trait]
impl JobSource for FlakyJobSource {
    async fn snapshot(&self) -> Result<Vec<ProductionJob>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err("job list briefly unavailable".into());
        }
        Ok(self.jobs.clone())
    }
}

struct Harness {
    stock: Arc<RecordingStock>,
    output: Arc<RecordingPersister>,
    notifier: Arc<RecordingNotifier>,
}

fn collaborators_with(
    jobs: Arc<dyn JobSource>,
    fail_stock_for: Option<JobId>,
) -> (Collaborators, Harness) {
    let stock = Arc::new(RecordingStock {
        calls: Mutex::new(Vec::new()),
        fail_for: fail_stock_for,
    });
    let output = Arc::new(RecordingPersister::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let collaborators = Collaborators {
        jobs,
        stock: stock.clone(),
        output: output.clone(),
        notifier: notifier.clone(),
    };
    (
        collaborators,
        Harness {
            stock,
            output,
            notifier,
        },
    )
}

#[tokio::test]
async fn board_is_populated_before_spawn_returns() {
    init_test_logger("batchwatch_integ_board").await;
    let now = Utc::now();
    let source = Arc::new(MemoryJobSource::new(vec![
        ProductionJob::new(1, "MTR-204", now - chrono::Duration::seconds(90), 10),
        ProductionJob::new(2, "GSK-110", now - chrono::Duration::seconds(30), 8),
    ]));
    let (collaborators, _harness) = collaborators_with(source, None);

    // Ticks are far in the future; whatever is on the board right now came
    // from the mount refresh.
    let driver = TickDriver::spawn(&test_config(3600, 3600, 60), collaborators).await;

    let board = driver.board();
    assert_eq!(board.snapshots().await.len(), 2);
    assert!(board.next_completion().await.is_some());

    driver.dispose().await;
}

#[tokio::test]
async fn catch_up_units_create_stock_exactly_once() {
    init_test_logger("batchwatch_integ_catchup").await;
    let now = Utc::now();
    let source = Arc::new(MemoryJobSource::new(vec![ProductionJob::new(
        1,
        "MTR-204",
        now - chrono::Duration::seconds(150),
        10,
    )]));
    let (collaborators, harness) = collaborators_with(source, None);

    // Zero-period fast tick reruns as quickly as the runtime allows, so any
    // redetection bug shows up as duplicate stock calls here.
    let driver = TickDriver::spawn(&test_config(0, 3600, 60), collaborators).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    driver.dispose().await;

    let stock_calls = harness.stock.calls.lock().unwrap().clone();
    assert_eq!(stock_calls, vec![(1, 2)]);

    let persisted = harness.output.calls.lock().unwrap().clone();
    assert_eq!(persisted, vec![(1, 2)]);

    let messages = harness.notifier.messages.lock().unwrap().clone();
    assert_eq!(messages, vec!["MTR-204: 2/10 units completed".to_string()]);

    let events = driver.board().recent_completions().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].job_id, 1);
    assert_eq!(events[0].units_newly_completed, 2);
}

#[tokio::test]
async fn stock_failure_for_one_job_leaves_others_untouched() {
    init_test_logger("batchwatch_integ_stockfail").await;
    let now = Utc::now();
    let source = Arc::new(MemoryJobSource::new(vec![
        ProductionJob::new(1, "MTR-204", now - chrono::Duration::seconds(150), 10),
        ProductionJob::new(2, "GSK-110", now - chrono::Duration::seconds(150), 8),
    ]));
    let (collaborators, harness) = collaborators_with(source, Some(1));

    let driver = TickDriver::spawn(&test_config(0, 3600, 60), collaborators).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    driver.dispose().await;

    let stock_calls = harness.stock.calls.lock().unwrap().clone();
    assert_eq!(
        stock_calls.len(),
        2,
        "one attempt per job, no retries: {:?}",
        stock_calls
    );
    assert!(stock_calls.contains(&(1, 2)));
    assert!(stock_calls.contains(&(2, 2)));

    // Job 1 failed before its completion was recorded or persisted.
    let persisted = harness.output.calls.lock().unwrap().clone();
    assert_eq!(persisted, vec![(2, 2)]);

    let events = driver.board().recent_completions().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].job_id, 2);

    let messages = harness.notifier.messages.lock().unwrap().clone();
    assert!(
        messages
            .iter()
            .any(|m| m.contains("Stock creation failed for MTR-204")),
        "messages: {:?}",
        messages
    );
    assert!(
        messages.iter().any(|m| m == "GSK-110: 2/8 units completed"),
        "messages: {:?}",
        messages
    );
}

#[tokio::test]
async fn dispose_stops_ticking_and_is_idempotent() {
    init_test_logger("batchwatch_integ_dispose").await;
    let now = Utc::now();
    let source = Arc::new(CountingJobSource {
        jobs: vec![ProductionJob::new(1, "MTR-204", now, 10)],
        calls: AtomicUsize::new(0),
    });
    let (collaborators, _harness) = collaborators_with(source.clone(), None);

    let driver = TickDriver::spawn(&test_config(0, 0, 60), collaborators).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!driver.is_disposed());

    tokio::time::timeout(Duration::from_secs(5), driver.dispose())
        .await
        .expect("dispose timed out");
    assert!(driver.is_disposed());

    let after_dispose = source.calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(source.calls.load(Ordering::SeqCst), after_dispose);

    // A second dispose finds nothing left to stop.
    driver.dispose().await;
}

#[tokio::test]
async fn empty_job_list_shuts_the_driver_down() {
    init_test_logger("batchwatch_integ_empty").await;
    let source = Arc::new(MemoryJobSource::new(Vec::new()));
    let (collaborators, harness) = collaborators_with(source, None);

    let driver = TickDriver::spawn(&test_config(0, 0, 60), collaborators).await;

    // The mount refresh already saw the empty floor and requested shutdown.
    assert!(driver.is_disposed());
    assert!(driver.board().snapshots().await.is_empty());

    tokio::time::timeout(Duration::from_secs(5), driver.dispose())
        .await
        .expect("dispose timed out");

    assert!(harness.stock.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn job_list_hiccup_skips_ticks_without_stopping_them() {
    init_test_logger("batchwatch_integ_flaky").await;
    let now = Utc::now();
    let source = Arc::new(FlakyJobSource {
        jobs: vec![ProductionJob::new(
            1,
            "MTR-204",
            now - chrono::Duration::seconds(150),
            10,
        )],
        calls: AtomicUsize::new(0),
        failures: 3,
    });
    let (collaborators, harness) = collaborators_with(source, None);

    // The mount refresh and the first couple of ticks all land in the
    // failure window; detection and display must both recover on their own.
    let driver = TickDriver::spawn(&test_config(0, 0, 60), collaborators).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    driver.dispose().await;

    let stock_calls = harness.stock.calls.lock().unwrap().clone();
    assert_eq!(stock_calls, vec![(1, 2)]);
    assert_eq!(driver.board().snapshots().await.len(), 1);
}

#[tokio::test]
async fn stopped_jobs_never_fire_side_effects() {
    init_test_logger("batchwatch_integ_stopped").await;
    let now = Utc::now();
    let mut stopped = ProductionJob::new(7, "PMP-330", now - chrono::Duration::seconds(600), 10);
    stopped.status = batchwatch::JobStatus::Stopped;
    stopped.actual_output = 4;
    let source = Arc::new(MemoryJobSource::new(vec![stopped]));
    let (collaborators, harness) = collaborators_with(source, None);

    let driver = TickDriver::spawn(&test_config(0, 3600, 60), collaborators).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    driver.dispose().await;

    assert!(harness.stock.calls.lock().unwrap().is_empty());
    assert!(harness.output.calls.lock().unwrap().is_empty());

    // Frozen progress still shows on the board, but nothing is on the way.
    let snapshots = driver.board().snapshots().await;
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].units_done, 4);
    assert!(driver.board().next_completion().await.is_none());
}
