//! Retry backoff for failed preview generations.
//!
//! Two retry mechanisms exist and must stay distinct: the task queue's own
//! bounded retries smooth over within-attempt jitter, while this table
//! gates *new* dispatches across requests. The steps are intentionally
//! coarse: a persistently broken source settles at one attempt every six
//! hours, yet an opportunistic retry is still possible whenever a caller
//! re-requests the link.

use chrono::Duration;

use crate::types::Timestamp;

/// Minimum wait before re-dispatching generation for a record that has
/// failed `attempts` times since its last success.
pub fn retry_backoff(attempts: i32) -> Duration {
    match attempts {
        a if a <= 0 => Duration::zero(),
        1 => Duration::minutes(15),
        2 => Duration::minutes(60),
        _ => Duration::hours(6),
    }
}

/// Whether a failed record is eligible for a new generation dispatch.
///
/// `updated_at` is the record's last mutation, which for a failed record is
/// the moment the failure was written.
pub fn retry_eligible(attempts: i32, updated_at: Timestamp, now: Timestamp) -> bool {
    now.signed_duration_since(updated_at) >= retry_backoff(attempts)
}
