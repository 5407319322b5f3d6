// Moderation domain models - data structures for channel purges.
//
// These are pure domain types with no Discord dependencies.
// The infra layer converts Discord messages into `RecentMessage`.

use chrono::{DateTime, Duration, Utc};

/// Discord refuses bulk deletes of more than 100 messages per request.
pub const MAX_PURGE_COUNT: i64 = 100;

/// Bulk delete only accepts messages younger than two weeks.
pub const BULK_DELETE_WINDOW_DAYS: i64 = 14;

/// A message as seen by the purge logic: an id and when it was posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentMessage {
    pub id: u64,
    pub created_at: DateTime<Utc>,
}

/// Platform limits applied to every purge.
#[derive(Debug, Clone)]
pub struct PurgeLimits {
    /// Largest `count` accepted by a single purge
    pub max_count: i64,
    /// Messages older than this are skipped
    pub eligibility_window: Duration,
}

impl Default for PurgeLimits {
    fn default() -> Self {
        Self {
            max_count: MAX_PURGE_COUNT,
            eligibility_window: Duration::days(BULK_DELETE_WINDOW_DAYS),
        }
    }
}

impl PurgeLimits {
    /// Whether a message posted at `created_at` can still be bulk deleted at `now`.
    pub fn is_eligible(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - created_at < self.eligibility_window
    }
}
