use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::CategoryId;

/// Every state change in the engine produces an Event.
/// Presentation code subscribes via [`crate::TimerEngine::subscribe`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    CategoryAdded {
        category: CategoryId,
        at: DateTime<Utc>,
    },
    TimerAdded {
        category: CategoryId,
        name: String,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerStarted {
        category: CategoryId,
        name: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        category: CategoryId,
        name: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        category: CategoryId,
        name: String,
        at: DateTime<Utc>,
    },
    /// Fired exactly once per completion, by the tick that drains the
    /// timer to zero.
    TimerCompleted {
        category: CategoryId,
        name: String,
        at: DateTime<Utc>,
    },
}
