//! Integration tests for the OAuth CSRF state repository.

mod common;

use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

use common::{connect, create_test_company};
use paylink_core::PaymentProvider;
use paylink_db::OAuthStateRepository;
use paylink_db::entities::oauth_states;
use paylink_shared::token::generate_csrf_state;

#[tokio::test]
async fn test_state_create_and_find_valid() {
    let db = connect().await;
    let company = create_test_company(&db).await;
    let repo = OAuthStateRepository::new(db.clone());

    let token = generate_csrf_state();
    let state = repo
        .create(company.id, PaymentProvider::Stripe, &token)
        .await
        .expect("Failed to create state");
    assert_eq!(state.provider, "stripe");
    assert!(state.expires_at > Utc::now());

    let found = repo
        .find_valid(&token, PaymentProvider::Stripe)
        .await
        .unwrap()
        .expect("State should be valid");
    assert_eq!(found.company_id, company.id);
}

#[tokio::test]
async fn test_state_provider_must_match() {
    let db = connect().await;
    let company = create_test_company(&db).await;
    let repo = OAuthStateRepository::new(db.clone());

    let token = generate_csrf_state();
    repo.create(company.id, PaymentProvider::Paypal, &token)
        .await
        .unwrap();

    // A Square callback cannot consume a PayPal state
    let mismatch = repo
        .find_valid(&token, PaymentProvider::Square)
        .await
        .unwrap();
    assert!(mismatch.is_none());
}

#[tokio::test]
async fn test_state_single_use() {
    let db = connect().await;
    let company = create_test_company(&db).await;
    let repo = OAuthStateRepository::new(db.clone());

    let token = generate_csrf_state();
    let state = repo
        .create(company.id, PaymentProvider::Square, &token)
        .await
        .unwrap();

    repo.delete(state.id).await.unwrap();

    let reused = repo
        .find_valid(&token, PaymentProvider::Square)
        .await
        .unwrap();
    assert!(reused.is_none());
}

#[tokio::test]
async fn test_expired_state_rejected_and_swept() {
    let db = connect().await;
    let company = create_test_company(&db).await;
    let repo = OAuthStateRepository::new(db.clone());

    // Insert a row that expired a minute ago
    let token = generate_csrf_state();
    let expired_at = Utc::now() - Duration::minutes(1);
    oauth_states::ActiveModel {
        id: Set(Uuid::new_v4()),
        company_id: Set(company.id),
        provider: Set("stripe".to_string()),
        state_token: Set(token.clone()),
        expires_at: Set(expired_at.into()),
        created_at: Set((expired_at - Duration::minutes(10)).into()),
    }
    .insert(&db)
    .await
    .unwrap();

    let found = repo
        .find_valid(&token, PaymentProvider::Stripe)
        .await
        .unwrap();
    assert!(found.is_none());

    let swept = repo.sweep_expired().await.unwrap();
    assert!(swept >= 1);

    let after_sweep = repo
        .find_valid(&token, PaymentProvider::Stripe)
        .await
        .unwrap();
    assert!(after_sweep.is_none());
}
