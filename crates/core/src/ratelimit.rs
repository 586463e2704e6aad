//! Rate-limit policy for customer-facing token lookups.
//!
//! The counters themselves live in the datastore so the service stays
//! stateless; this module owns the window arithmetic and the decision rule.

use chrono::{DateTime, Duration, Utc};

/// Failed-lookup rate-limit policy: a fixed window per client IP.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    /// Failed lookups allowed within one window.
    pub max_failed: u32,
    /// Window length in minutes.
    pub window_minutes: i64,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_failed: 10,
            window_minutes: 15,
        }
    }
}

impl RateLimitPolicy {
    /// Returns the instant before which a window entry counts as expired.
    #[must_use]
    pub fn window_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::minutes(self.window_minutes)
    }

    /// Whether a client with this many failed lookups is locked out.
    #[must_use]
    pub const fn is_limited(&self, failed_count: u32) -> bool {
        failed_count >= self.max_failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.max_failed, 10);
        assert_eq!(policy.window_minutes, 15);
    }

    #[test]
    fn test_limit_boundary() {
        let policy = RateLimitPolicy::default();
        assert!(!policy.is_limited(0));
        assert!(!policy.is_limited(9));
        assert!(policy.is_limited(10));
        assert!(policy.is_limited(11));
    }

    #[test]
    fn test_window_cutoff() {
        let policy = RateLimitPolicy::default();
        let now = Utc::now();
        assert_eq!(now - policy.window_cutoff(now), Duration::minutes(15));
    }
}
