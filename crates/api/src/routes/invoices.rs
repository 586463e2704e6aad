//! Invoice publish/update route.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use validator::Validate;

use crate::AppState;
use crate::middleware::auth::AuthCompany;
use crate::response::ApiResult;
use paylink_core::InvoiceStatus;
use paylink_db::{InvoiceRepository, UpsertInvoiceInput};
use paylink_shared::AppError;
use paylink_shared::token::is_well_formed_token;

/// Creates the invoices router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/invoices", post(publish))
}

/// Invoice publish payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PublishInvoiceRequest {
    /// Company-scoped external invoice id (the upsert key).
    #[validate(length(min = 1, max = 100))]
    pub invoice_number: String,
    /// Customer display name.
    #[validate(length(min = 1, max = 255))]
    pub customer_name: String,
    /// Customer email for notifications and grouping.
    #[validate(email)]
    pub customer_email: Option<String>,
    /// Existing customer token to group under, if the client app tracks it.
    pub customer_token: Option<String>,
    /// Opaque invoice payload (line items, totals, notes).
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Lifecycle status; defaults to `sent`.
    pub status: Option<String>,
    /// Invoice total.
    pub total_amount: Decimal,
    /// Remaining balance; defaults to the total.
    pub balance_due: Option<Decimal>,
    /// ISO 4217 currency code.
    #[validate(length(equal = 3))]
    pub currency: String,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
    /// Whether to email the customer their portal link.
    #[serde(default)]
    pub send_email: bool,
}

/// POST /invoices - Publish or update an invoice.
#[allow(clippy::too_many_lines)]
async fn publish(
    State(state): State<AppState>,
    AuthCompany(company): AuthCompany,
    Json(payload): Json<PublishInvoiceRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let status: InvoiceStatus = payload.status.as_deref().unwrap_or("sent").parse()?;

    let balance_due = payload.balance_due.unwrap_or(payload.total_amount);
    if payload.total_amount < Decimal::ZERO || balance_due < Decimal::ZERO {
        return Err(AppError::InvalidInput("Amounts must not be negative".to_string()).into());
    }
    if balance_due > payload.total_amount {
        return Err(AppError::InvalidInput(
            "balance_due must not exceed total_amount".to_string(),
        )
        .into());
    }

    if let Some(token) = payload.customer_token.as_deref() {
        if !is_well_formed_token(token) {
            return Err(AppError::InvalidInput("Malformed customer token".to_string()).into());
        }
    }

    let repo = InvoiceRepository::new((*state.db).clone());
    let (invoice, created) = repo
        .upsert(UpsertInvoiceInput {
            company_id: company.id,
            invoice_number: payload.invoice_number,
            customer_name: payload.customer_name,
            customer_email: payload.customer_email,
            customer_token: payload.customer_token,
            payload: payload.payload,
            status,
            total_amount: payload.total_amount,
            balance_due,
            currency: payload.currency.to_uppercase(),
            due_date: payload.due_date,
        })
        .await?;

    let base_url = state.config.portal.base_url.trim_end_matches('/');
    let portal_url = format!("{base_url}/invoice/{}", invoice.invoice_token);

    info!(
        company_id = %company.id,
        invoice_id = %invoice.id,
        created,
        "Published invoice"
    );

    // Notification email is best-effort; a delivery failure never fails
    // the publish.
    if payload.send_email {
        if let Some(customer_email) = invoice.customer_email.as_deref() {
            if let Err(err) = state
                .email
                .send_invoice_email(
                    customer_email,
                    &invoice.customer_name,
                    &company.name,
                    &invoice.invoice_number,
                    invoice.balance_due,
                    &invoice.currency,
                    &portal_url,
                )
                .await
            {
                warn!(error = %err, invoice_id = %invoice.id, "Failed to send invoice email");
            }
        }
    }

    Ok(Json(json!({
        "success": true,
        "created": created,
        "invoice": {
            "id": invoice.id,
            "invoice_number": invoice.invoice_number,
            "invoice_token": invoice.invoice_token,
            "customer_token": invoice.customer_token,
            "status": invoice.status,
            "total_amount": invoice.total_amount,
            "balance_due": invoice.balance_due,
            "currency": invoice.currency,
            "portal_url": portal_url,
        },
    })))
}
