//! Integration tests for the failed-lookup rate limiter.

mod common;

use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

use common::connect;
use paylink_core::ratelimit::RateLimitPolicy;
use paylink_db::RateLimitRepository;
use paylink_db::entities::rate_limits;

/// A unique fake client IP per test run, since ip hashes are primary keys.
fn test_ip() -> String {
    format!("10.0.{}.{}", rand_octet(), rand_octet())
}

fn rand_octet() -> u32 {
    // Uuid bytes are a convenient unique source for test fixtures
    u32::from(Uuid::new_v4().as_bytes()[0])
}

#[tokio::test]
async fn test_lockout_after_max_failures() {
    let db = connect().await;
    let repo = RateLimitRepository::new(db.clone());
    let policy = RateLimitPolicy::default();
    let ip = test_ip();

    assert!(!repo.is_limited(&ip, &policy).await.unwrap());

    for _ in 0..9 {
        repo.record_failure(&ip).await.unwrap();
    }
    assert!(!repo.is_limited(&ip, &policy).await.unwrap());

    // The tenth failure trips the limit
    repo.record_failure(&ip).await.unwrap();
    assert!(repo.is_limited(&ip, &policy).await.unwrap());
}

#[tokio::test]
async fn test_window_expiry_resets_counter() {
    let db = connect().await;
    let repo = RateLimitRepository::new(db.clone());
    let policy = RateLimitPolicy::default();
    let ip = test_ip();

    for _ in 0..10 {
        repo.record_failure(&ip).await.unwrap();
    }
    assert!(repo.is_limited(&ip, &policy).await.unwrap());

    // Age the window past the cutoff; the next check purges it lazily
    rate_limits::ActiveModel {
        ip_hash: Set(RateLimitRepository::hash_ip(&ip)),
        window_start: Set((Utc::now() - Duration::minutes(16)).into()),
        ..Default::default()
    }
    .update(&db)
    .await
    .unwrap();

    assert!(!repo.is_limited(&ip, &policy).await.unwrap());
}

#[tokio::test]
async fn test_clients_are_isolated() {
    let db = connect().await;
    let repo = RateLimitRepository::new(db.clone());
    let policy = RateLimitPolicy::default();
    let noisy = test_ip();
    let quiet = test_ip();

    for _ in 0..10 {
        repo.record_failure(&noisy).await.unwrap();
    }

    assert!(repo.is_limited(&noisy, &policy).await.unwrap());
    assert!(!repo.is_limited(&quiet, &policy).await.unwrap());
}
