//! End-to-end tests for the provider connect flows.

mod common;

use std::sync::atomic::Ordering;

use axum::http::StatusCode;
use http_body_util::BodyExt;
use serde_json::json;

use common::{assert_error_code, register_company, request_json, send_raw, spawn_app};
use paylink_core::PaymentProvider;
use paylink_db::{CompanyRepository, OAuthStateRepository};
use paylink_shared::token::generate_csrf_state;

/// Pulls the `state` query parameter out of an authorization URL.
fn state_from_url(url: &str) -> String {
    url.split("state=")
        .nth(1)
        .map(|rest| rest.split('&').next().unwrap_or(rest))
        .expect("authorization url should carry the state")
        .to_string()
}

#[tokio::test]
async fn test_stripe_connect_incomplete_then_complete() {
    let test = spawn_app().await;
    let (company_id, api_key) = register_company(&test.app).await;

    // Initiate: issues CSRF state, provisions the connected account
    let (status, body) = request_json(
        &test.app,
        "POST",
        "/api/v1/connect/stripe/initiate",
        Some(&api_key),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "initiate failed: {body}");
    let authorization_url = body["authorization_url"].as_str().unwrap().to_string();
    let state_token = state_from_url(&authorization_url);

    let companies = CompanyRepository::new((*test.state.db).clone());
    let after_initiate = companies.find_by_id(company_id).await.unwrap().unwrap();
    assert_eq!(after_initiate.stripe_account_id.as_deref(), Some("acct_fake_1"));
    assert!(!after_initiate.provider_connected(PaymentProvider::Stripe));

    // First callback: onboarding incomplete, expect a re-redirect and the
    // state row kept alive for the second round trip
    test.stripe.onboarding_complete.store(false, Ordering::SeqCst);
    let response = send_raw(
        &test.app,
        "GET",
        &format!("/connect/callback/stripe?state={state_token}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get("location").unwrap(),
        "https://provider.test/onboard/again"
    );

    let states = OAuthStateRepository::new((*test.state.db).clone());
    assert!(
        states
            .find_valid(&state_token, PaymentProvider::Stripe)
            .await
            .unwrap()
            .is_some(),
        "state must survive the re-redirect"
    );

    // Second callback: onboarding finished
    test.stripe.onboarding_complete.store(true, Ordering::SeqCst);
    let response = send_raw(
        &test.app,
        "GET",
        &format!("/connect/callback/stripe?state={state_token}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let connected = companies.find_by_id(company_id).await.unwrap().unwrap();
    assert!(connected.provider_connected(PaymentProvider::Stripe));
    assert!(connected.stripe_charges_enabled);

    // The state is consumed: replaying the callback is rejected
    assert!(
        states
            .find_valid(&state_token, PaymentProvider::Stripe)
            .await
            .unwrap()
            .is_none()
    );
    let replay = send_raw(
        &test.app,
        "GET",
        &format!("/connect/callback/stripe?state={state_token}"),
    )
    .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_callback_with_unknown_state_rejected() {
    let test = spawn_app().await;

    let phantom = generate_csrf_state();
    let response = send_raw(
        &test.app,
        "GET",
        &format!("/connect/callback/paypal?state={phantom}&code=fakecode"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_callback_provider_error_consumes_state() {
    let test = spawn_app().await;
    let (_company_id, api_key) = register_company(&test.app).await;

    let (_, body) = request_json(
        &test.app,
        "POST",
        "/api/v1/connect/square/initiate",
        Some(&api_key),
        Some(json!({})),
    )
    .await;
    let state_token = state_from_url(body["authorization_url"].as_str().unwrap());

    // The user declined at the provider: terminal failure, state deleted
    let response = send_raw(
        &test.app,
        "GET",
        &format!("/connect/callback/square?state={state_token}&error=access_denied"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let states = OAuthStateRepository::new((*test.state.db).clone());
    assert!(
        states
            .find_valid(&state_token, PaymentProvider::Square)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_paypal_email_variant_flow() {
    let test = spawn_app().await;
    let (company_id, api_key) = register_company(&test.app).await;

    // The email variant points the user at our own hosted form
    let (status, body) = request_json(
        &test.app,
        "POST",
        "/api/v1/connect/paypal/initiate",
        Some(&api_key),
        Some(json!({"method": "email"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let authorization_url = body["authorization_url"].as_str().unwrap().to_string();
    assert!(authorization_url.contains("/connect/paypal/email?state="));
    let state_token = state_from_url(&authorization_url);

    // The form renders and round-trips the same state token
    let response = send_raw(
        &test.app,
        "GET",
        &format!("/connect/paypal/email?state={state_token}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(
        response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec(),
    )
    .unwrap();
    assert!(html.contains(&state_token));

    // Submitting the form persists the payee email and consumes the state
    let form_body = format!("state={state_token}&email=merchant%40example.com");
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/connect/paypal/email")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(axum::body::Body::from(form_body))
        .unwrap();
    let response = tower::ServiceExt::oneshot(test.app.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let companies = CompanyRepository::new((*test.state.db).clone());
    let company = companies.find_by_id(company_id).await.unwrap().unwrap();
    assert_eq!(company.paypal_email.as_deref(), Some("merchant@example.com"));
    assert!(company.provider_connected(PaymentProvider::Paypal));

    let states = OAuthStateRepository::new((*test.state.db).clone());
    assert!(
        states
            .find_valid(&state_token, PaymentProvider::Paypal)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let test = spawn_app().await;
    let (company_id, api_key) = register_company(&test.app).await;

    // Connect PayPal through the fake, then disconnect twice
    let (_, body) = request_json(
        &test.app,
        "POST",
        "/api/v1/connect/paypal/initiate",
        Some(&api_key),
        Some(json!({})),
    )
    .await;
    let state_token = state_from_url(body["authorization_url"].as_str().unwrap());
    let response = send_raw(
        &test.app,
        "GET",
        &format!("/connect/callback/paypal?state={state_token}&code=authcode"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    for _ in 0..2 {
        let (status, body) = request_json(
            &test.app,
            "POST",
            "/api/v1/connect/paypal/disconnect",
            Some(&api_key),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "disconnect failed: {body}");
    }

    let companies = CompanyRepository::new((*test.state.db).clone());
    let company = companies.find_by_id(company_id).await.unwrap().unwrap();
    assert!(!company.provider_connected(PaymentProvider::Paypal));
    assert!(company.paypal_merchant_id.is_none());
}

#[tokio::test]
async fn test_initiate_requires_company_key() {
    let test = spawn_app().await;

    let (status, body) = request_json(
        &test.app,
        "POST",
        "/api/v1/connect/stripe/initiate",
        None,
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_error_code(&body, "UNAUTHORIZED");
}

#[tokio::test]
async fn test_initiate_rejects_unknown_provider() {
    let test = spawn_app().await;
    let (_company_id, api_key) = register_company(&test.app).await;

    let (status, body) = request_json(
        &test.app,
        "POST",
        "/api/v1/connect/venmo/initiate",
        Some(&api_key),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_code(&body, "INVALID_INPUT");
}
