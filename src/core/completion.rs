use crate::core::job::JobId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Units finished between two observations of the same job. Never negative;
/// a count that failed to advance (or went backward) yields zero.
pub fn newly_completed(previous_units_done: u32, current_units_done: u32) -> u32 {
    current_units_done.saturating_sub(previous_units_done)
}

/// One batch of detected completions, kept only in the board's bounded
/// recent-history queue for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub job_id: JobId,
    pub units_newly_completed: u32,
    pub detected_at: chrono::DateTime<chrono::Utc>,
}

/// Last-observed unit counts, carried across fast ticks so the same
/// completion is never reported twice.
///
/// The first observation of a job seeds from its persisted `actual_output`,
/// so units produced while no driver was watching surface as catch-up
/// completions. Observations keep the high-water mark: a count that moved
/// backward (clock regression) reads as zero new units and cannot re-fire
/// once the clock recovers, and the cumulative count handed to persistence
/// never shrinks.
#[derive(Debug, Default)]
pub struct CompletionLedger {
    seen: HashMap<JobId, u32>,
}

impl CompletionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current count for `job_id` and return how many units are
    /// newly completed since the last observation. The ledger is advanced
    /// whether or not anything fired, and it is never rolled back when a
    /// downstream side effect fails; the unit counts as seen either way.
    pub fn observe(&mut self, job_id: JobId, persisted_output: u32, units_done: u32) -> u32 {
        let prev = *self.seen.entry(job_id).or_insert(persisted_output);
        let delta = newly_completed(prev, units_done);
        self.seen.insert(job_id, prev.max(units_done));
        delta
    }

    pub fn last_observed(&self, job_id: JobId) -> Option<u32> {
        self.seen.get(&job_id).copied()
    }

    /// Drop jobs that are no longer in the live list so ledger size tracks
    /// the floor, not history.
    pub fn prune(&mut self, live_ids: &HashSet<JobId>) {
        self.seen.retain(|id, _| live_ids.contains(id));
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newly_completed_is_never_negative() {
        assert_eq!(newly_completed(5, 5), 0);
        assert_eq!(newly_completed(5, 3), 0);
        assert_eq!(newly_completed(0, 0), 0);
        assert_eq!(newly_completed(2, 4), 2);
    }

    #[test]
    fn first_observation_seeds_from_persisted_output() {
        let mut ledger = CompletionLedger::new();
        // Last persisted count was 2, the clock says 5 units by now: three
        // catch-up completions.
        assert_eq!(ledger.observe(1, 2, 5), 3);
        assert_eq!(ledger.last_observed(1), Some(5));
    }

    #[test]
    fn repeated_observation_without_progress_fires_nothing() {
        let mut ledger = CompletionLedger::new();
        assert_eq!(ledger.observe(1, 0, 4), 4);
        assert_eq!(ledger.observe(1, 0, 4), 0);
        assert_eq!(ledger.observe(1, 0, 4), 0);
    }

    #[test]
    fn progress_after_idle_fires_only_the_delta() {
        let mut ledger = CompletionLedger::new();
        assert_eq!(ledger.observe(9, 0, 2), 2);
        assert_eq!(ledger.observe(9, 0, 2), 0);
        assert_eq!(ledger.observe(9, 0, 4), 2);
    }

    #[test]
    fn backward_count_keeps_high_water_mark() {
        let mut ledger = CompletionLedger::new();
        assert_eq!(ledger.observe(1, 0, 5), 5);
        // Clock moved backward: count regresses, nothing fires, mark holds.
        assert_eq!(ledger.observe(1, 0, 3), 0);
        assert_eq!(ledger.last_observed(1), Some(5));
        // Clock recovered past the mark: only the genuinely new unit fires.
        assert_eq!(ledger.observe(1, 0, 6), 1);
    }

    #[test]
    fn ledger_tracks_jobs_independently() {
        let mut ledger = CompletionLedger::new();
        assert_eq!(ledger.observe(1, 0, 3), 3);
        assert_eq!(ledger.observe(2, 1, 1), 0);
        assert_eq!(ledger.observe(1, 0, 3), 0);
        assert_eq!(ledger.observe(2, 1, 2), 1);
    }

    #[test]
    fn prune_drops_departed_jobs() {
        let mut ledger = CompletionLedger::new();
        ledger.observe(1, 0, 1);
        ledger.observe(2, 0, 1);
        ledger.observe(3, 0, 1);

        let live: HashSet<JobId> = [1, 3].into_iter().collect();
        ledger.prune(&live);

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.last_observed(2), None);
        assert_eq!(ledger.last_observed(1), Some(1));
    }
}
