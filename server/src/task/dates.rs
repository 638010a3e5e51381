use chrono::{DateTime, NaiveTime, Utc};

use super::TaskStatus;

/// Lifecycle timestamps carried by a task.
///
/// Both fields are written at most once over the task's lifetime:
/// `started_at` the first time the status leaves `pending`, `resolved_at` the
/// first time the status reaches `done`. Neither is ever cleared, even when
/// the status later moves back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LifecycleDates {
    pub started_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Computes the lifecycle timestamps for a status transition.
///
/// `previous` holds the timestamps already recorded on the task (absent on
/// creation). Existing values win unconditionally; newly set values share a
/// single clock read so a task created straight in `done` gets the same
/// instant for both fields. A `None` in the result means "leave the stored
/// field untouched", never "clear it".
pub fn derive_lifecycle_dates(
    status: TaskStatus,
    previous: Option<&LifecycleDates>,
) -> LifecycleDates {
    let now = Utc::now();

    let started_at = match previous.and_then(|p| p.started_at) {
        Some(existing) => Some(existing),
        None if status != TaskStatus::Pending => Some(now),
        None => None,
    };

    let resolved_at = match previous.and_then(|p| p.resolved_at) {
        Some(existing) => Some(existing),
        None if status == TaskStatus::Done => Some(now),
        None => None,
    };

    LifecycleDates {
        started_at,
        resolved_at,
    }
}

/// Today's date normalized to UTC midnight, used for deadline comparisons and
/// as the anchor of the rolling 30-day dashboard window.
pub fn today_midnight() -> DateTime<Utc> {
    Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc()
}
