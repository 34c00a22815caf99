use crate::core::job::{JobId, ProductionJob};
use crate::core::progress::compute_progress;
use serde::{Deserialize, Serialize};

/// The single running job whose next unit lands soonest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextCompletion {
    pub job_id: JobId,
    pub time_remaining_ms: i64,
    pub estimated_instant: chrono::DateTime<chrono::Utc>,
}

/// Scan every running job for the one whose next unit is due soonest.
///
/// Only strictly positive time remaining qualifies; a job sitting exactly on
/// a cycle boundary is skipped rather than flickering between "done" and
/// "due". Exact ties go to the first job in input order.
pub fn select_next_completion(
    jobs: &[ProductionJob],
    cycle_secs: u64,
    now: chrono::DateTime<chrono::Utc>,
) -> Option<NextCompletion> {
    let cycle = cycle_secs.max(1) as i64;
    let mut best: Option<NextCompletion> = None;

    for job in jobs.iter().filter(|j| j.is_running()) {
        let units_done = compute_progress(job, cycle_secs, now).units_done;
        let next_instant =
            job.start_instant + chrono::Duration::seconds((units_done as i64 + 1) * cycle);
        let remaining_ms = (next_instant - now).num_milliseconds();
        if remaining_ms <= 0 {
            continue;
        }
        // Strict comparison keeps the first-encountered job on exact ties.
        if best
            .as_ref()
            .is_none_or(|b| remaining_ms < b.time_remaining_ms)
        {
            best = Some(NextCompletion {
                job_id: job.id,
                time_remaining_ms: remaining_ms,
                estimated_instant: next_instant,
            });
        }
    }

    best
}
