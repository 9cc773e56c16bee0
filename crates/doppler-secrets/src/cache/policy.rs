//! Entry freshness.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// TTL applied when the store configuration does not set one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// `now - last_checked_at > ttl`.
///
/// A `last_checked_at` in the future (clock step) counts as fresh.
pub(crate) fn is_expired_at(last_checked_at: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    match (now - last_checked_at).to_std() {
        Ok(age) => age > ttl,
        Err(_) => false,
    }
}
