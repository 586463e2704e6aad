//! Provider-connect policy.
//!
//! A connect attempt is a short-lived CSRF state row; attempts that never
//! complete expire back to disconnected after a fixed window.

use chrono::{DateTime, Duration, Utc};

/// How long an in-flight connect attempt (CSRF state) stays valid.
pub const STATE_TTL_MINUTES: i64 = 10;

/// Returns the expiry instant for a state issued at `now`.
#[must_use]
pub fn state_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::minutes(STATE_TTL_MINUTES)
}
