//! Failed-lookup rate limiter backed by the rate_limits table.
//!
//! Counters live in the datastore so the service stays stateless across
//! replicas. Expired windows are purged lazily on each check; increments use
//! an atomic upsert so concurrent failures never lose counts.

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait, QueryFilter,
    Statement,
};
use sha2::{Digest, Sha256};

use paylink_core::ratelimit::RateLimitPolicy;

use crate::entities::rate_limits;

/// Rate limit repository keyed by hashed client IP.
#[derive(Debug, Clone)]
pub struct RateLimitRepository {
    db: DatabaseConnection,
}

impl RateLimitRepository {
    /// Creates a new rate limit repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Hashes a client IP for storage.
    #[must_use]
    pub fn hash_ip(ip: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(ip.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Returns whether this client is currently locked out.
    ///
    /// Purges expired window entries first, so a client whose window has
    /// elapsed starts clean without any background sweeper.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn is_limited(&self, ip: &str, policy: &RateLimitPolicy) -> Result<bool, DbErr> {
        let cutoff = policy.window_cutoff(chrono::Utc::now());

        rate_limits::Entity::delete_many()
            .filter(rate_limits::Column::WindowStart.lt(cutoff))
            .exec(&self.db)
            .await?;

        let entry = rate_limits::Entity::find_by_id(Self::hash_ip(ip))
            .one(&self.db)
            .await?;

        let failed = entry.map_or(0u32, |e| e.failed_count.unsigned_abs());
        Ok(policy.is_limited(failed))
    }

    /// Records a failed lookup for this client.
    ///
    /// Called only for well-formed tokens that resolved to nothing, so
    /// enumeration attempts are throttled without counting malformed noise.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn record_failure(&self, ip: &str) -> Result<(), DbErr> {
        // Atomic upsert: the window starts at the first failure and the
        // count can never lose a concurrent increment.
        let statement = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r"INSERT INTO rate_limits (ip_hash, failed_count, window_start)
              VALUES ($1, 1, now())
              ON CONFLICT (ip_hash)
              DO UPDATE SET failed_count = rate_limits.failed_count + 1",
            [Self::hash_ip(ip).into()],
        );

        self.db.execute(statement).await?;
        Ok(())
    }
}
