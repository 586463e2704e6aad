//! End-to-end tests for publish → view → checkout → confirm → sync.

mod common;

use axum::http::StatusCode;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use uuid::Uuid;

use common::{assert_error_code, publish_invoice, register_company, request_json, spawn_app};
use paylink_core::PaymentProvider;
use paylink_db::CompanyRepository;
use paylink_db::repositories::CredentialUpdate;

fn decimal_field(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|text| text.parse().ok())
        .expect("decimal field")
}

/// Wires Stripe credentials straight onto the company row, standing in for
/// the connect flow covered by its own tests.
async fn connect_stripe(test: &common::TestApp, company_id: Uuid) {
    CompanyRepository::new((*test.state.db).clone())
        .apply_credentials(
            company_id,
            PaymentProvider::Stripe,
            &CredentialUpdate {
                account_id: Some("acct_fake_1".to_string()),
                charges_enabled: true,
                ..CredentialUpdate::default()
            },
        )
        .await
        .expect("Failed to set credentials");
}

async fn connect_square(test: &common::TestApp, company_id: Uuid) {
    CompanyRepository::new((*test.state.db).clone())
        .apply_credentials(
            company_id,
            PaymentProvider::Square,
            &CredentialUpdate {
                account_id: Some("MERCHANT_FAKE".to_string()),
                access_token: Some("sq0atp-fake".to_string()),
                location_id: Some("LOC_FAKE".to_string()),
                ..CredentialUpdate::default()
            },
        )
        .await
        .expect("Failed to set credentials");
}

#[tokio::test]
async fn test_stripe_publish_view_checkout_confirm() {
    let test = spawn_app().await;
    let (company_id, api_key) = register_company(&test.app).await;
    connect_stripe(&test, company_id).await;

    let (_number, invoice_token, _customer) =
        publish_invoice(&test.app, &api_key, "50.00").await;

    // Customer opens the invoice: credentials hidden, flags exposed
    let (status, body) = request_json(
        &test.app,
        "GET",
        &format!("/api/v1/pay/invoice/{invoice_token}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "fetch failed: {body}");
    assert_eq!(body["payment_methods"]["stripe"], json!(true));
    assert_eq!(body["payment_methods"]["paypal"], json!(false));
    assert_eq!(body["invoice"]["status"], json!("viewed"));
    let raw = body.to_string();
    assert!(!raw.contains("acct_fake_1"), "account id leaked: {raw}");
    assert!(!raw.contains("api_key"), "api key leaked: {raw}");

    // Checkout returns the client secret for the card widget
    let (status, body) = request_json(
        &test.app,
        "POST",
        &format!("/api/v1/pay/invoice/{invoice_token}/checkout"),
        None,
        Some(json!({"provider": "stripe", "amount": "50.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "checkout failed: {body}");
    assert_eq!(body["client_secret"], json!("pi_fake_1_secret"));
    assert_eq!(body["publishable_key"], json!("pk_test_fake"));

    // Confirm after the client-side charge: re-verified, then recorded
    test.stripe.set_verification(true, Some(dec!(50.00)), "usd");
    let provider_payment_id = format!("pi_{}", Uuid::new_v4().simple());
    let (status, body) = request_json(
        &test.app,
        "POST",
        &format!("/api/v1/pay/invoice/{invoice_token}/confirm"),
        None,
        Some(json!({
            "provider": "stripe",
            "provider_payment_id": provider_payment_id,
            "amount": "50.00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "confirm failed: {body}");
    let reference = body["reference_number"].as_str().unwrap().to_string();
    assert!(reference.starts_with("PAY-"));
    assert_eq!(body["duplicate"], json!(false));

    // The balance reconciled to zero and the invoice settled
    let (_, body) = request_json(
        &test.app,
        "GET",
        &format!("/api/v1/pay/invoice/{invoice_token}"),
        None,
        None,
    )
    .await;
    assert_eq!(body["invoice"]["status"], json!("paid"));
    assert_eq!(decimal_field(&body["invoice"]["balance_due"]), dec!(0.00));

    // A duplicate confirmation is idempotent: same reference, one row
    let (status, body) = request_json(
        &test.app,
        "POST",
        &format!("/api/v1/pay/invoice/{invoice_token}/confirm"),
        None,
        Some(json!({
            "provider": "stripe",
            "provider_payment_id": provider_payment_id,
            "amount": "50.00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reference_number"], json!(reference));
    assert_eq!(body["duplicate"], json!(true));

    // The client app pulls exactly one payment and acknowledges it
    let (_, body) = request_json(
        &test.app,
        "GET",
        "/api/v1/payments/unsynced",
        Some(&api_key),
        None,
    )
    .await;
    assert_eq!(body["count"], json!(1));
    let payment_id = body["payments"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(body["payments"][0]["reference_number"], json!(reference));

    let (_, body) = request_json(
        &test.app,
        "POST",
        "/api/v1/payments/acknowledge",
        Some(&api_key),
        Some(json!({"payment_ids": [payment_id]})),
    )
    .await;
    assert_eq!(body["acknowledged"], json!(1));

    let (_, body) = request_json(
        &test.app,
        "GET",
        "/api/v1/payments/unsynced",
        Some(&api_key),
        None,
    )
    .await;
    assert_eq!(body["count"], json!(0));
}

#[tokio::test]
async fn test_checkout_rejects_amount_above_balance() {
    let test = spawn_app().await;
    let (company_id, api_key) = register_company(&test.app).await;
    connect_stripe(&test, company_id).await;

    let (_number, invoice_token, _customer) =
        publish_invoice(&test.app, &api_key, "50.00").await;

    let (status, body) = request_json(
        &test.app,
        "POST",
        &format!("/api/v1/pay/invoice/{invoice_token}/checkout"),
        None,
        Some(json!({"provider": "stripe", "amount": "50.02"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_code(&body, "INVALID_INPUT");

    // No side effects: nothing recorded against the invoice
    let (_, body) = request_json(
        &test.app,
        "GET",
        "/api/v1/payments/unsynced",
        Some(&api_key),
        None,
    )
    .await;
    assert_eq!(body["count"], json!(0));
}

#[tokio::test]
async fn test_checkout_requires_connected_provider() {
    let test = spawn_app().await;
    let (_company_id, api_key) = register_company(&test.app).await;

    let (_number, invoice_token, _customer) =
        publish_invoice(&test.app, &api_key, "50.00").await;

    let (status, body) = request_json(
        &test.app,
        "POST",
        &format!("/api/v1/pay/invoice/{invoice_token}/checkout"),
        None,
        Some(json!({"provider": "stripe", "amount": "25.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_error_code(&body, "CONFLICT");
}

#[tokio::test]
async fn test_confirm_amount_mismatch_is_hard_failure() {
    let test = spawn_app().await;
    let (company_id, api_key) = register_company(&test.app).await;
    connect_stripe(&test, company_id).await;

    let (_number, invoice_token, _customer) =
        publish_invoice(&test.app, &api_key, "50.00").await;

    // Provider reports 40.00 but the client claims 50.00
    test.stripe.set_verification(true, Some(dec!(40.00)), "usd");
    let (status, body) = request_json(
        &test.app,
        "POST",
        &format!("/api/v1/pay/invoice/{invoice_token}/confirm"),
        None,
        Some(json!({
            "provider": "stripe",
            "provider_payment_id": format!("pi_{}", Uuid::new_v4().simple()),
            "amount": "50.00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_error_code(&body, "CONFLICT");

    // The unpaid balance is untouched
    let (_, body) = request_json(
        &test.app,
        "GET",
        &format!("/api/v1/pay/invoice/{invoice_token}"),
        None,
        None,
    )
    .await;
    assert_eq!(decimal_field(&body["invoice"]["balance_due"]), dec!(50.00));
}

#[tokio::test]
async fn test_confirm_rejects_incomplete_charge() {
    let test = spawn_app().await;
    let (company_id, api_key) = register_company(&test.app).await;
    connect_stripe(&test, company_id).await;

    let (_number, invoice_token, _customer) =
        publish_invoice(&test.app, &api_key, "50.00").await;

    test.stripe.set_verification(false, None, "usd");
    let (status, body) = request_json(
        &test.app,
        "POST",
        &format!("/api/v1/pay/invoice/{invoice_token}/confirm"),
        None,
        Some(json!({
            "provider": "stripe",
            "provider_payment_id": format!("pi_{}", Uuid::new_v4().simple()),
            "amount": "50.00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_error_code(&body, "CONFLICT");
}

#[tokio::test]
async fn test_square_source_token_charges_synchronously() {
    let test = spawn_app().await;
    let (company_id, api_key) = register_company(&test.app).await;
    connect_square(&test, company_id).await;

    let (_number, invoice_token, _customer) =
        publish_invoice(&test.app, &api_key, "80.00").await;

    // Without a source token: the card form configuration
    let (status, body) = request_json(
        &test.app,
        "POST",
        &format!("/api/v1/pay/invoice/{invoice_token}/checkout"),
        None,
        Some(json!({"provider": "square", "amount": "80.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["application_id"], json!("sq0idp-fake"));
    assert_eq!(body["location_id"], json!("LOC_FAKE"));

    // With one: the charge settles and is reconciled immediately
    let (status, body) = request_json(
        &test.app,
        "POST",
        &format!("/api/v1/pay/invoice/{invoice_token}/checkout"),
        None,
        Some(json!({
            "provider": "square",
            "amount": "80.00",
            "source_token": "cnon:card-nonce-ok",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "square charge failed: {body}");
    assert!(body["reference_number"].as_str().unwrap().starts_with("PAY-"));

    let (_, body) = request_json(
        &test.app,
        "GET",
        &format!("/api/v1/pay/invoice/{invoice_token}"),
        None,
        None,
    )
    .await;
    assert_eq!(body["invoice"]["status"], json!("paid"));

    // Square settles at checkout; the confirm endpoint refuses it
    let (status, body) = request_json(
        &test.app,
        "POST",
        &format!("/api/v1/pay/invoice/{invoice_token}/confirm"),
        None,
        Some(json!({
            "provider": "square",
            "provider_payment_id": "sqpay_anything",
            "amount": "80.00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_code(&body, "INVALID_INPUT");
}

#[tokio::test]
async fn test_partial_payments_accumulate() {
    let test = spawn_app().await;
    let (company_id, api_key) = register_company(&test.app).await;
    connect_stripe(&test, company_id).await;

    let (_number, invoice_token, _customer) =
        publish_invoice(&test.app, &api_key, "100.00").await;

    test.stripe.set_verification(true, Some(dec!(40.00)), "usd");
    let (status, _) = request_json(
        &test.app,
        "POST",
        &format!("/api/v1/pay/invoice/{invoice_token}/confirm"),
        None,
        Some(json!({
            "provider": "stripe",
            "provider_payment_id": format!("pi_{}", Uuid::new_v4().simple()),
            "amount": "40.00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = request_json(
        &test.app,
        "GET",
        &format!("/api/v1/pay/invoice/{invoice_token}"),
        None,
        None,
    )
    .await;
    assert_eq!(body["invoice"]["status"], json!("partial"));
    assert_eq!(decimal_field(&body["invoice"]["balance_due"]), dec!(60.00));

    test.stripe.set_verification(true, Some(dec!(60.00)), "usd");
    let (status, _) = request_json(
        &test.app,
        "POST",
        &format!("/api/v1/pay/invoice/{invoice_token}/confirm"),
        None,
        Some(json!({
            "provider": "stripe",
            "provider_payment_id": format!("pi_{}", Uuid::new_v4().simple()),
            "amount": "60.00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = request_json(
        &test.app,
        "GET",
        &format!("/api/v1/pay/invoice/{invoice_token}"),
        None,
        None,
    )
    .await;
    assert_eq!(body["invoice"]["status"], json!("paid"));
    assert_eq!(decimal_field(&body["invoice"]["balance_due"]), dec!(0.00));

    // Once settled, further checkouts are refused
    let (status, body) = request_json(
        &test.app,
        "POST",
        &format!("/api/v1/pay/invoice/{invoice_token}/checkout"),
        None,
        Some(json!({"provider": "stripe", "amount": "10.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_error_code(&body, "CONFLICT");
}
