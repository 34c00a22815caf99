use std::collections::VecDeque;

use tokio::sync::RwLock;

use crate::core::completion::CompletionEvent;
use crate::core::next_unit::NextCompletion;
use crate::core::progress::ProgressSnapshot;

#[derive(Debug, Default)]
struct BoardInner {
    snapshots: Vec<ProgressSnapshot>,
    next_completion: Option<NextCompletion>,
    recent_events: VecDeque<CompletionEvent>,
}

/// Latest published view of the production floor. Display refreshes replace
/// the snapshot set wholesale; completion events accumulate into a bounded
/// history with the oldest entries evicted first.
#[derive(Debug)]
pub struct ProgressBoard {
    inner: RwLock<BoardInner>,
    history_capacity: usize,
}

impl ProgressBoard {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            inner: RwLock::new(BoardInner::default()),
            history_capacity: history_capacity.max(1),
        }
    }

    /// Replaces the displayed snapshots and next-completion estimate as one
    /// atomic update, so readers never observe a half-refreshed board.
    pub async fn publish_display(
        &self,
        snapshots: Vec<ProgressSnapshot>,
        next_completion: Option<NextCompletion>,
    ) {
        let mut inner = self.inner.write().await;
        inner.snapshots = snapshots;
        inner.next_completion = next_completion;
    }

    pub async fn record_completion(&self, event: CompletionEvent) {
        let mut inner = self.inner.write().await;
        while inner.recent_events.len() >= self.history_capacity {
            inner.recent_events.pop_front();
        }
        inner.recent_events.push_back(event);
    }

    pub async fn snapshots(&self) -> Vec<ProgressSnapshot> {
        self.inner.read().await.snapshots.clone()
    }

    pub async fn next_completion(&self) -> Option<NextCompletion> {
        self.inner.read().await.next_completion.clone()
    }

    /// Recent completion events, oldest first.
    pub async fn recent_completions(&self) -> Vec<CompletionEvent> {
        self.inner.read().await.recent_events.iter().cloned().collect()
    }
}
