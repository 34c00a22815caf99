use crate::core::job::{JobId, JobStatus, ProductionJob};
use serde::{Deserialize, Serialize};

/// Derived per-job progress at one instant. Recomputed from scratch on every
/// tick and never stored across ticks, so a clock jump (suspended tab, NTP
/// step) corrects itself on the next evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub job_id: JobId,
    pub units_done: u32,
    pub units_remaining: u32,
    /// Whole percent, clamped to [0, 100] even for over-cycle jobs.
    pub percent: u8,
    pub estimated_completion: chrono::DateTime<chrono::Utc>,
}

fn percent_of(units_done: u32, expected: u32) -> u8 {
    let pct = (units_done as f64 / expected as f64 * 100.0).round();
    pct.min(100.0) as u8
}

/// Progress as a step function of elapsed time: `floor(elapsed / cycle)`
/// whole units, no partials. Stopped jobs report their frozen persisted
/// count instead of extrapolating.
pub fn compute_progress(
    job: &ProductionJob,
    cycle_secs: u64,
    now: chrono::DateTime<chrono::Utc>,
) -> ProgressSnapshot {
    let cycle = cycle_secs.max(1);
    let expected = job.effective_expected_output();

    let units_done = match job.status {
        JobStatus::Stopped => job.actual_output,
        JobStatus::Running => {
            // Clamp at zero so a clock that moved backward never yields
            // negative progress.
            let elapsed = (now - job.start_instant).num_seconds().max(0) as u64;
            u32::try_from(elapsed / cycle).unwrap_or(u32::MAX)
        }
    };

    ProgressSnapshot {
        job_id: job.id,
        units_done,
        units_remaining: expected.saturating_sub(units_done),
        percent: percent_of(units_done, expected),
        estimated_completion: job.start_instant
            + chrono::Duration::seconds(expected as i64 * cycle as i64),
    }
}
