//! Agent run state and bookkeeping shared with the control surface.
//!
//! A single lock guards run state, counters and the recent-items feed
//! so each mutation lands as one unit. The scheduler task is the only
//! writer of counters and the feed; lifecycle calls write the run state.

use std::collections::VecDeque;
use std::fmt;

use serde::{Serialize, Serializer};
use tokio::sync::RwLock;
use tracing::debug;

use crate::pipeline::types::{RecentItem, Stats};

/// Maximum number of items kept in the recent-items feed.
pub const RECENT_CAPACITY: usize = 10;

/// Lifecycle state of the agent loop.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Stopped,
    Running,
    /// Start failed; carries the reason.
    Error(String),
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => f.write_str("Stopped"),
            Self::Running => f.write_str("Running"),
            Self::Error(reason) => write!(f, "Error: {reason}"),
        }
    }
}

impl Serialize for RunState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Default)]
struct Inner {
    run_state: RunState,
    stats: Stats,
    recent: VecDeque<RecentItem>,
}

/// Shared, lock-guarded agent state.
#[derive(Debug, Default)]
pub struct AgentState {
    inner: RwLock<Inner>,
}

impl AgentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run_state(&self) -> RunState {
        self.inner.read().await.run_state.clone()
    }

    pub async fn set_run_state(&self, run_state: RunState) {
        let mut inner = self.inner.write().await;
        debug!(from = %inner.run_state, to = %run_state, "Run state transition");
        inner.run_state = run_state;
    }

    pub async fn stats(&self) -> Stats {
        self.inner.read().await.stats
    }

    /// Recent items, newest first.
    pub async fn recent_items(&self) -> Vec<RecentItem> {
        self.inner.read().await.recent.iter().cloned().collect()
    }

    /// Insert at the front, evict beyond capacity, and refresh
    /// `priority_count` under the same lock.
    pub async fn push_recent(&self, item: RecentItem) {
        let mut inner = self.inner.write().await;
        inner.recent.push_front(item);
        inner.recent.truncate(RECENT_CAPACITY);
        inner.stats.priority_count = inner.recent.len();
    }

    pub async fn record_event_created(&self) {
        self.inner.write().await.stats.events_created += 1;
    }
}
