//! The persisted view of one countdown timer.

use serde::{Deserialize, Serialize};

use crate::category::CategoryId;
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerStatus {
    NotStarted,
    InProgress,
    Paused,
    Completed,
}

/// One countdown timer as it exists on disk and in snapshots.
///
/// The runtime supplement -- the handle of the live tick task -- is engine
/// state keyed by (category, name). It has no field here, so a serialized
/// record structurally cannot carry it.
///
/// Invariants the engine maintains:
/// - `remaining_duration` stays within `[0, total_duration]`
/// - `remaining_duration == 0` exactly when `status == Completed`
/// - `total_duration` never changes after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerRecord {
    pub name: String,
    pub category: CategoryId,
    /// Seconds.
    pub total_duration: u64,
    /// Seconds left.
    pub remaining_duration: u64,
    pub status: TimerStatus,
}

impl TimerRecord {
    /// Validate and build a fresh `NotStarted` record.
    pub fn new(
        name: &str,
        duration_secs: u64,
        category: CategoryId,
    ) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyField { field: "name" });
        }
        if duration_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "duration",
                message: "must be a positive number of seconds".to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            category,
            total_duration: duration_secs,
            remaining_duration: duration_secs,
            status: TimerStatus::NotStarted,
        })
    }

    /// Percentage of the duration still remaining, `0.0..=100.0`.
    /// Consumers render the complement as a depleting bar.
    pub fn progress_percent_remaining(&self) -> f64 {
        if self.total_duration == 0 {
            return 0.0;
        }
        self.remaining_duration as f64 / self.total_duration as f64 * 100.0
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::InProgress
    }
}
