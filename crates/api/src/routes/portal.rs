//! Customer-facing portal API: token-keyed reads, checkout, confirmation.
//!
//! Every lookup passes the access guard first: malformed tokens are rejected
//! before the database is touched, lockouts are checked per client IP, and a
//! well-formed token that resolves to nothing feeds the same failure counter
//! whatever the reason, so existing and non-existing tokens are not
//! distinguishable from outside.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::AppState;
use crate::extractors::ClientIp;
use crate::response::{ApiError, ApiResult};
use paylink_core::ratelimit::RateLimitPolicy;
use paylink_core::{InvoiceStatus, PaymentProvider, checkout};
use paylink_db::entities::{companies, invoices};
use paylink_db::{
    CompanyRepository, InvoiceRepository, PaymentRepository, RateLimitRepository,
    RecordPaymentInput,
};
use paylink_providers::types::{CheckoutIntent, CheckoutRequest, ProviderCredentials};
use paylink_shared::AppError;
use paylink_shared::token::is_well_formed_token;

/// Creates the portal router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pay/invoice/{token}", get(get_invoice))
        .route("/pay/invoice/{token}/checkout", post(create_checkout))
        .route("/pay/invoice/{token}/confirm", post(confirm_payment))
        .route("/pay/customer/{token}", get(get_customer))
}

/// Guarded invoice lookup shared by the portal routes and pages.
pub(crate) async fn lookup_invoice(
    state: &AppState,
    ip: &str,
    token: &str,
) -> Result<invoices::Model, ApiError> {
    // Malformed input is rejected cheaply and never counted
    if !is_well_formed_token(token) {
        return Err(AppError::InvalidInput("Malformed token".to_string()).into());
    }

    let limiter = RateLimitRepository::new((*state.db).clone());
    let policy = RateLimitPolicy::default();
    if limiter.is_limited(ip, &policy).await? {
        return Err(AppError::RateLimited.into());
    }

    let repo = InvoiceRepository::new((*state.db).clone());
    match repo.find_by_token(token).await? {
        Some(invoice) => Ok(invoice),
        None => {
            limiter.record_failure(ip).await?;
            Err(AppError::NotFound("Invoice not found".to_string()).into())
        }
    }
}

/// Guarded customer lookup: every invoice sharing the customer token.
pub(crate) async fn lookup_customer_invoices(
    state: &AppState,
    ip: &str,
    token: &str,
) -> Result<Vec<invoices::Model>, ApiError> {
    if !is_well_formed_token(token) {
        return Err(AppError::InvalidInput("Malformed token".to_string()).into());
    }

    let limiter = RateLimitRepository::new((*state.db).clone());
    let policy = RateLimitPolicy::default();
    if limiter.is_limited(ip, &policy).await? {
        return Err(AppError::RateLimited.into());
    }

    let repo = InvoiceRepository::new((*state.db).clone());
    let found = repo.find_by_customer_token(token).await?;
    if found.is_empty() {
        limiter.record_failure(ip).await?;
        return Err(AppError::NotFound("Customer not found".to_string()).into());
    }

    Ok(found)
}

/// Parses the stored status column; corrupt data is an internal error, not
/// the caller's.
fn invoice_status(invoice: &invoices::Model) -> Result<InvoiceStatus, ApiError> {
    invoice
        .status
        .parse()
        .map_err(|_| AppError::Internal("Invoice has an unrecognized status".to_string()).into())
}

async fn load_company(state: &AppState, company_id: uuid::Uuid) -> Result<companies::Model, ApiError> {
    CompanyRepository::new((*state.db).clone())
        .find_by_id(company_id)
        .await?
        .ok_or_else(|| AppError::Internal("Invoice has no owning company".to_string()).into())
}

/// The only provider detail customers ever see: availability flags.
fn payment_methods_json(company: &companies::Model) -> serde_json::Value {
    json!({
        "stripe": company.provider_connected(PaymentProvider::Stripe),
        "paypal": company.provider_connected(PaymentProvider::Paypal),
        "square": company.provider_connected(PaymentProvider::Square),
    })
}

fn invoice_summary_json(invoice: &invoices::Model, status: InvoiceStatus) -> serde_json::Value {
    let display = status.display_status(invoice.due_date, Utc::now().date_naive());
    json!({
        "invoice_number": invoice.invoice_number,
        "invoice_token": invoice.invoice_token,
        "customer_name": invoice.customer_name,
        "status": display,
        "total_amount": invoice.total_amount,
        "balance_due": invoice.balance_due,
        "currency": invoice.currency,
        "due_date": invoice.due_date,
    })
}

/// GET /pay/invoice/{token} - A single invoice, by its token.
async fn get_invoice(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ClientIp(ip): ClientIp,
) -> ApiResult<impl IntoResponse> {
    let invoice = lookup_invoice(&state, &ip, &token).await?;
    let mut status = invoice_status(&invoice)?;

    // First open flips sent -> viewed; payment-driven statuses are left alone
    if status == InvoiceStatus::Sent {
        InvoiceRepository::new((*state.db).clone())
            .mark_viewed(invoice.id)
            .await?;
        status = InvoiceStatus::Viewed;
    }

    let company = load_company(&state, invoice.company_id).await?;

    Ok(Json(json!({
        "success": true,
        "invoice": invoice_summary_json(&invoice, status),
        "payload": invoice.payload,
        "company": {
            "name": company.name,
            "logo_url": company.logo_url,
        },
        "payment_methods": payment_methods_json(&company),
    })))
}

/// GET /pay/customer/{token} - Every invoice for one customer, plus history.
async fn get_customer(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ClientIp(ip): ClientIp,
) -> ApiResult<impl IntoResponse> {
    let found = lookup_customer_invoices(&state, &ip, &token).await?;
    let company = load_company(&state, found[0].company_id).await?;

    let mut active = Vec::new();
    let mut settled = Vec::new();
    for invoice in &found {
        let status = invoice_status(invoice)?;
        let summary = invoice_summary_json(invoice, status);
        if status.accepts_payment() {
            active.push(summary);
        } else {
            settled.push(summary);
        }
    }

    let invoice_ids: Vec<uuid::Uuid> = found.iter().map(|invoice| invoice.id).collect();
    let history = PaymentRepository::new((*state.db).clone())
        .for_invoices(&invoice_ids)
        .await?;

    Ok(Json(json!({
        "success": true,
        "company": {
            "name": company.name,
            "logo_url": company.logo_url,
        },
        "payment_methods": payment_methods_json(&company),
        "active_invoices": active,
        "settled_invoices": settled,
        "payments": history
            .iter()
            .map(|payment| json!({
                "invoice_number": payment.invoice_number,
                "amount": payment.amount,
                "currency": payment.currency,
                "method": payment.method,
                "reference_number": payment.reference_number,
                "status": payment.status,
                "created_at": payment.created_at,
            }))
            .collect::<Vec<_>>(),
    })))
}

fn provider_credentials(
    company: &companies::Model,
    provider: PaymentProvider,
) -> ProviderCredentials {
    match provider {
        PaymentProvider::Stripe => ProviderCredentials {
            account_id: company.stripe_account_id.clone(),
            ..ProviderCredentials::default()
        },
        PaymentProvider::Paypal => ProviderCredentials {
            account_id: company.paypal_merchant_id.clone(),
            email: company.paypal_email.clone(),
            ..ProviderCredentials::default()
        },
        PaymentProvider::Square => ProviderCredentials {
            account_id: company.square_merchant_id.clone(),
            access_token: company.square_access_token.clone(),
            location_id: company.square_location_id.clone(),
            ..ProviderCredentials::default()
        },
    }
}

/// Sends the customer a receipt; failures are logged, never surfaced.
async fn send_receipt(
    state: &AppState,
    company: &companies::Model,
    invoice: &invoices::Model,
    amount: Decimal,
    reference_number: &str,
) {
    let Some(customer_email) = invoice.customer_email.as_deref() else {
        return;
    };

    if let Err(err) = state
        .email
        .send_receipt_email(
            customer_email,
            &invoice.customer_name,
            &company.name,
            &invoice.invoice_number,
            amount,
            &invoice.currency,
            reference_number,
        )
        .await
    {
        warn!(error = %err, invoice_id = %invoice.id, "Failed to send receipt email");
    }
}

/// Checkout request payload.
#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    /// Selected payment provider.
    pub provider: String,
    /// Amount to pay toward the balance.
    pub amount: Decimal,
    /// Tokenized payment source collected client-side (Square).
    pub source_token: Option<String>,
    /// Caller-supplied idempotency key (Square).
    pub idempotency_key: Option<String>,
}

/// POST /pay/invoice/{token}/checkout - Create a provider charge intent.
async fn create_checkout(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ClientIp(ip): ClientIp,
    Json(payload): Json<CheckoutBody>,
) -> ApiResult<impl IntoResponse> {
    let invoice = lookup_invoice(&state, &ip, &token).await?;
    let provider: PaymentProvider = payload.provider.parse()?;

    let status = invoice_status(&invoice)?;
    checkout::validate(status, invoice.balance_due, payload.amount)?;

    let company = load_company(&state, invoice.company_id).await?;
    if !company.provider_connected(provider) {
        return Err(AppError::Conflict(format!(
            "{} is not connected for this company",
            provider.display_name()
        ))
        .into());
    }

    let request = CheckoutRequest {
        credentials: provider_credentials(&company, provider),
        company_id: company.id,
        invoice_number: invoice.invoice_number.clone(),
        customer_name: invoice.customer_name.clone(),
        amount: payload.amount,
        currency: invoice.currency.clone(),
        source_token: payload.source_token,
        idempotency_key: payload.idempotency_key,
    };

    let intent = state.gateways.get(provider).create_checkout(&request).await?;

    match intent {
        CheckoutIntent::CardPayment {
            intent_id,
            client_secret,
        } => Ok(Json(json!({
            "success": true,
            "provider": provider,
            "intent_id": intent_id,
            "client_secret": client_secret,
            "publishable_key": state.config.providers.stripe.publishable_key,
        }))),
        CheckoutIntent::PayeeOrder { payee } => Ok(Json(json!({
            "success": true,
            "provider": provider,
            "payee": payee,
        }))),
        CheckoutIntent::CardForm {
            application_id,
            location_id,
        } => Ok(Json(json!({
            "success": true,
            "provider": provider,
            "application_id": application_id,
            "location_id": location_id,
        }))),
        CheckoutIntent::Charged(charge) => {
            // The charge settled synchronously; reconcile it immediately
            let recorded = PaymentRepository::new((*state.db).clone())
                .record(RecordPaymentInput {
                    company_id: company.id,
                    invoice_id: invoice.id,
                    invoice_number: invoice.invoice_number.clone(),
                    customer_name: invoice.customer_name.clone(),
                    amount: payload.amount,
                    processing_fee: charge.processing_fee,
                    currency: invoice.currency.clone(),
                    method: provider,
                    provider_payment_id: Some(charge.provider_payment_id),
                    provider_transaction_id: charge.provider_transaction_id,
                })
                .await?;

            info!(
                invoice_id = %invoice.id,
                reference = %recorded.payment.reference_number,
                duplicate = recorded.duplicate,
                "Recorded synchronous payment"
            );

            if !recorded.duplicate {
                send_receipt(
                    &state,
                    &company,
                    &invoice,
                    payload.amount,
                    &recorded.payment.reference_number,
                )
                .await;
            }

            Ok(Json(json!({
                "success": true,
                "provider": provider,
                "reference_number": recorded.payment.reference_number,
                "status": "completed",
            })))
        }
    }
}

/// Confirmation request payload.
#[derive(Debug, Deserialize)]
pub struct ConfirmBody {
    /// Provider that settled the charge.
    pub provider: String,
    /// Provider-assigned payment/order id to verify and record.
    pub provider_payment_id: String,
    /// Amount the client believes was paid.
    pub amount: Decimal,
}

/// POST /pay/invoice/{token}/confirm - Verify and record a client-completed
/// charge (Stripe and PayPal; Square settles synchronously at checkout).
async fn confirm_payment(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ClientIp(ip): ClientIp,
    Json(payload): Json<ConfirmBody>,
) -> ApiResult<impl IntoResponse> {
    let invoice = lookup_invoice(&state, &ip, &token).await?;
    let provider: PaymentProvider = payload.provider.parse()?;

    if provider == PaymentProvider::Square {
        return Err(AppError::InvalidInput(
            "Square payments are captured at checkout and need no confirmation".to_string(),
        )
        .into());
    }
    if payload.provider_payment_id.is_empty() {
        return Err(AppError::InvalidInput("provider_payment_id is required".to_string()).into());
    }
    if payload.amount <= Decimal::ZERO {
        return Err(AppError::InvalidInput("Amount must be positive".to_string()).into());
    }

    let company = load_company(&state, invoice.company_id).await?;
    if !company.provider_connected(provider) {
        return Err(AppError::Conflict(format!(
            "{} is not connected for this company",
            provider.display_name()
        ))
        .into());
    }

    // Never take the client's word for it: re-verify with the provider
    let verification = state
        .gateways
        .get(provider)
        .verify_charge(
            &provider_credentials(&company, provider),
            &payload.provider_payment_id,
        )
        .await?;

    if !verification.succeeded {
        return Err(AppError::Conflict(
            "The charge has not completed with the provider".to_string(),
        )
        .into());
    }

    // Where the provider reports the paid amount, it must match within one
    // cent; a mismatch is a hard failure, never silently accepted.
    if let Some(reported) = verification.amount {
        if (reported - payload.amount).abs() > checkout::amount_tolerance() {
            return Err(AppError::Conflict(format!(
                "Amount mismatch: provider reports {reported}, request says {}",
                payload.amount
            ))
            .into());
        }
    }
    if let Some(reported_currency) = verification.currency.as_deref() {
        if !reported_currency.eq_ignore_ascii_case(&invoice.currency) {
            return Err(AppError::Conflict(format!(
                "Currency mismatch: provider reports {reported_currency}, invoice is {}",
                invoice.currency
            ))
            .into());
        }
    }

    let recorded = PaymentRepository::new((*state.db).clone())
        .record(RecordPaymentInput {
            company_id: company.id,
            invoice_id: invoice.id,
            invoice_number: invoice.invoice_number.clone(),
            customer_name: invoice.customer_name.clone(),
            amount: payload.amount,
            processing_fee: Decimal::ZERO,
            currency: invoice.currency.clone(),
            method: provider,
            provider_payment_id: Some(payload.provider_payment_id),
            provider_transaction_id: verification.transaction_id,
        })
        .await?;

    info!(
        invoice_id = %invoice.id,
        reference = %recorded.payment.reference_number,
        duplicate = recorded.duplicate,
        "Confirmed payment"
    );

    if !recorded.duplicate {
        send_receipt(
            &state,
            &company,
            &invoice,
            payload.amount,
            &recorded.payment.reference_number,
        )
        .await;
    }

    Ok(Json(json!({
        "success": true,
        "reference_number": recorded.payment.reference_number,
        "duplicate": recorded.duplicate,
    })))
}
