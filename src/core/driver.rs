use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::select;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::core::board::ProgressBoard;
use crate::core::collaborators::Collaborators;
use crate::core::completion::{CompletionEvent, CompletionLedger};
use crate::core::job::{JobId, ProductionJob};
use crate::core::next_unit::select_next_completion;
use crate::core::progress::compute_progress;
use crate::err::Result;
use crate::global_var::LOGGER;
use crate::utilities::duration_to_human_readable;

/// One periodic tick: runs the body, sleeps, repeats until shut down. The
/// body runs first so a fresh loop acts immediately instead of sleeping a
/// full period.
struct TickLoop<J, F>
where
    J: FnMut() -> F + Send + 'static,
    F: Future<Output = Result<()>> + Send + 'static,
{
    name: &'static str,
    body: J,
    period: Duration,
    disposed: Arc<AtomicBool>,
    shutdown_rx: oneshot::Receiver<()>,
}

impl<J, F> TickLoop<J, F>
where
    J: FnMut() -> F + Send + 'static,
    F: Future<Output = Result<()>> + Send + 'static,
{
    fn new(
        name: &'static str,
        body: J,
        period: Duration,
        disposed: Arc<AtomicBool>,
        shutdown_rx: oneshot::Receiver<()>,
    ) -> Self {
        Self {
            name,
            body,
            period,
            disposed,
            shutdown_rx,
        }
    }

    async fn run(mut self) {
        loop {
            if self.disposed.load(Ordering::SeqCst) {
                break;
            }
            match (self.body)().await {
                Ok(()) => {
                    LOGGER.debug(format!("Tick {} completed.", self.name));
                }
                Err(tick_err) => {
                    // A single failed tick must not take the loop down.
                    LOGGER.error(format!("Tick {} failed: {}", self.name, tick_err));
                }
            }
            select! {
                biased;
                _ = &mut self.shutdown_rx => {
                    LOGGER.info(format!("Received a shutdown signal. The {} tick will exit.", self.name));
                    break;
                }
                _ = tokio::time::sleep(self.period) => {}
            }
        }
    }
}

/// State shared by both tick loops and the side-effect tasks they spawn.
struct DriverShared {
    session_id: u64,
    cycle_secs: u64,
    board: Arc<ProgressBoard>,
    ledger: Mutex<CompletionLedger>,
    collaborators: Collaborators,
    disposed: Arc<AtomicBool>,
    fast_shutdown: Mutex<Option<oneshot::Sender<()>>>,
    slow_shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl DriverShared {
    /// Flips the disposed flag and signals both loops. Safe to call more
    /// than once; later calls find the flag already set and do nothing.
    async fn request_shutdown(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(tx) = self.fast_shutdown.lock().await.take() {
            let _ = tx.send(());
        }
        if let Some(tx) = self.slow_shutdown.lock().await.take() {
            let _ = tx.send(());
        }
    }

    /// Current job list, or None once production is over and shutdown has
    /// been requested.
    async fn live_jobs(&self) -> Result<Option<Vec<ProductionJob>>> {
        let jobs = self.collaborators.jobs.snapshot().await?;
        if jobs.is_empty() {
            LOGGER.info(format!(
                "[{:x}] No production jobs left to watch. Shutting the ticks down.",
                self.session_id
            ));
            self.request_shutdown().await;
            return Ok(None);
        }
        Ok(Some(jobs))
    }

    /// Slow tick body. Recomputes every job's progress and the floor-wide
    /// next completion, then publishes them to the board in one update.
    async fn refresh_display(&self) -> Result<()> {
        let Some(jobs) = self.live_jobs().await? else {
            return Ok(());
        };
        let now = Utc::now();
        let snapshots: Vec<_> = jobs
            .iter()
            .map(|job| compute_progress(job, self.cycle_secs, now))
            .collect();
        let next = select_next_completion(&jobs, self.cycle_secs, now);

        for snapshot in &snapshots {
            LOGGER.debug(format!(
                "[{:x}] Job {}: {}% done, {} unit(s) remaining, estimated completion {}.",
                self.session_id,
                snapshot.job_id,
                snapshot.percent,
                snapshot.units_remaining,
                snapshot.estimated_completion,
            ));
        }
        match &next {
            Some(next) => {
                LOGGER.info(format!(
                    "[{:x}] Board refreshed with {} job(s). Next unit from job {} due in {}.",
                    self.session_id,
                    snapshots.len(),
                    next.job_id,
                    duration_to_human_readable(chrono::Duration::milliseconds(
                        next.time_remaining_ms
                    )),
                ));
            }
            None => {
                LOGGER.info(format!(
                    "[{:x}] Board refreshed with {} job(s). No unit is currently on the way.",
                    self.session_id,
                    snapshots.len(),
                ));
            }
        }

        self.board.publish_display(snapshots, next).await;
        Ok(())
    }

    /// Fast tick body. Advances the completion ledger first, then hands each
    /// job's newly completed units to a detached side-effect task. Because
    /// the ledger moves before anything is spawned, a tick that fires again
    /// right away detects nothing new, however slow the side effects are.
    async fn fast_tick(self: Arc<Self>) -> Result<()> {
        let Some(jobs) = self.live_jobs().await? else {
            return Ok(());
        };
        let now = Utc::now();
        let mut fired: Vec<(ProductionJob, u32, u32)> = Vec::new();
        {
            let mut ledger = self.ledger.lock().await;
            for job in &jobs {
                let snapshot = compute_progress(job, self.cycle_secs, now);
                let units_new = ledger.observe(job.id, job.actual_output, snapshot.units_done);
                if units_new > 0 {
                    let cumulative = ledger
                        .last_observed(job.id)
                        .unwrap_or(snapshot.units_done);
                    fired.push((job.clone(), units_new, cumulative));
                }
            }
            let live_ids: HashSet<JobId> = jobs.iter().map(|job| job.id).collect();
            ledger.prune(&live_ids);
        }
        for (job, units_new, cumulative) in fired {
            let shared = self.clone();
            tokio::spawn(async move {
                shared.run_side_effects(job, units_new, cumulative, now).await;
            });
        }
        Ok(())
    }

    /// Side-effect chain for one job's detection: register stock, then record
    /// and announce the completion, then persist the cumulative output. A
    /// stock failure aborts the chain for this job; a persist failure is
    /// logged and left for the operator.
    async fn run_side_effects(
        &self,
        job: ProductionJob,
        units_new: u32,
        cumulative: u32,
        detected_at: DateTime<Utc>,
    ) {
        LOGGER.info(format!(
            "[{:x}] Job {} ({}) completed {} new unit(s), {} in total.",
            self.session_id, job.id, job.product_code, units_new, cumulative
        ));

        if let Err(stock_err) = self.collaborators.stock.create_stock(&job, units_new).await {
            LOGGER.error(format!(
                "[{:x}] Failed to create stock for job {}: {}",
                self.session_id, job.id, stock_err
            ));
            self.collaborators.notifier.notify(&format!(
                "Stock creation failed for {}: {}",
                job.product_code, stock_err
            ));
            return;
        }

        self.board
            .record_completion(CompletionEvent {
                job_id: job.id,
                units_newly_completed: units_new,
                detected_at,
            })
            .await;
        self.collaborators.notifier.notify(&format!(
            "{}: {}/{} units completed",
            job.product_code,
            cumulative,
            job.effective_expected_output()
        ));

        if let Err(persist_err) = self
            .collaborators
            .output
            .persist_actual_output(job.id, cumulative)
            .await
        {
            LOGGER.error(format!(
                "[{:x}] Failed to persist output for job {}: {}",
                self.session_id, job.id, persist_err
            ));
        }
    }
}

/// Owns the two tick loops watching a production floor. The fast tick
/// detects completed units and drives their side effects; the slow tick
/// refreshes the progress board. `dispose` stops both and joins them.
pub struct TickDriver {
    shared: Arc<DriverShared>,
    fast_handle: Mutex<Option<JoinHandle<()>>>,
    slow_handle: Mutex<Option<JoinHandle<()>>>,
}

impl TickDriver {
    pub async fn spawn(config: &Config, collaborators: Collaborators) -> TickDriver {
        let (fast_tx, fast_rx) = oneshot::channel::<()>();
        let (slow_tx, slow_rx) = oneshot::channel::<()>();
        let shared = Arc::new(DriverShared {
            session_id: rand::random::<u64>(),
            cycle_secs: config.production.cycle_duration_secs,
            board: Arc::new(ProgressBoard::new(config.production.history_capacity)),
            ledger: Mutex::new(CompletionLedger::default()),
            collaborators,
            disposed: Arc::new(AtomicBool::new(false)),
            fast_shutdown: Mutex::new(Some(fast_tx)),
            slow_shutdown: Mutex::new(Some(slow_tx)),
        });

        // Fill the board before the loops start so readers never catch it
        // blank while the first slow tick is still pending.
        if let Err(refresh_err) = shared.refresh_display().await {
            LOGGER.error(format!(
                "[{:x}] Initial display refresh failed: {}",
                shared.session_id, refresh_err
            ));
        }

        let fast_shared = shared.clone();
        let fast = TickLoop::new(
            "fast",
            move || fast_shared.clone().fast_tick(),
            Duration::from_secs(config.ticks.fast_secs),
            shared.disposed.clone(),
            fast_rx,
        );
        let slow_shared = shared.clone();
        let slow = TickLoop::new(
            "slow",
            move || {
                let shared = slow_shared.clone();
                async move { shared.refresh_display().await }
            },
            Duration::from_secs(config.ticks.slow_secs),
            shared.disposed.clone(),
            slow_rx,
        );
        let fast_handle = tokio::spawn(fast.run());
        let slow_handle = tokio::spawn(slow.run());

        LOGGER.info(format!(
            "[{:x}] Tick driver started, fast tick every {}s, slow tick every {}s.",
            shared.session_id, config.ticks.fast_secs, config.ticks.slow_secs
        ));

        TickDriver {
            shared,
            fast_handle: Mutex::new(Some(fast_handle)),
            slow_handle: Mutex::new(Some(slow_handle)),
        }
    }

    pub fn board(&self) -> Arc<ProgressBoard> {
        self.shared.board.clone()
    }

    pub fn session_id(&self) -> u64 {
        self.shared.session_id
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }

    /// Stops both tick loops and waits for them to exit. Side-effect tasks
    /// already in flight are left to finish on their own. Calling this again
    /// afterwards does nothing.
    pub async fn dispose(&self) {
        self.shared.request_shutdown().await;
        if let Some(handle) = self.fast_handle.lock().await.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.slow_handle.lock().await.take() {
            let _ = handle.await;
        }
        LOGGER.info(format!(
            "[{:x}] Tick driver disposed.",
            self.shared.session_id
        ));
    }
}
