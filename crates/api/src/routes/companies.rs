//! Company registration and status routes.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get, routing::post};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::AppState;
use crate::middleware::auth::AuthCompany;
use crate::response::ApiResult;
use paylink_core::{InvoiceStatus, PaymentProvider};
use paylink_db::{CompanyRepository, CreateCompanyInput, InvoiceRepository, PaymentRepository};
use paylink_shared::token::generate_api_key;

/// Creates the registration router (master-key guarded).
pub fn registration_routes() -> Router<AppState> {
    Router::new().route("/companies/register", post(register))
}

/// Creates the company router (company-key guarded).
pub fn routes() -> Router<AppState> {
    Router::new().route("/companies/status", get(status))
}

/// Registration request payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterCompanyRequest {
    /// Company display name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Contact email, also used during provider onboarding.
    #[validate(email)]
    pub contact_email: Option<String>,
    /// Optional logo shown on portal pages.
    #[validate(url)]
    pub logo_url: Option<String>,
}

/// POST /companies/register - Register a client-app tenant.
///
/// The API key is returned exactly once, here.
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterCompanyRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let repo = CompanyRepository::new((*state.db).clone());
    let company = repo
        .create(CreateCompanyInput {
            name: payload.name,
            logo_url: payload.logo_url,
            contact_email: payload.contact_email,
            api_key: generate_api_key(),
        })
        .await?;

    info!(company_id = %company.id, "Registered company");

    Ok(Json(json!({
        "success": true,
        "company": {
            "id": company.id,
            "name": company.name,
            "api_key": company.api_key,
        },
    })))
}

/// GET /companies/status - Summary counts and provider availability.
async fn status(
    State(state): State<AppState>,
    AuthCompany(company): AuthCompany,
) -> ApiResult<impl IntoResponse> {
    let invoice_repo = InvoiceRepository::new((*state.db).clone());
    let payment_repo = PaymentRepository::new((*state.db).clone());

    let total_invoices = invoice_repo.count_for_company(company.id).await?;
    let paid_invoices = invoice_repo
        .count_with_status(company.id, InvoiceStatus::Paid)
        .await?;
    let partial_invoices = invoice_repo
        .count_with_status(company.id, InvoiceStatus::Partial)
        .await?;
    let cancelled_invoices = invoice_repo
        .count_with_status(company.id, InvoiceStatus::Cancelled)
        .await?;
    let total_payments = payment_repo.count_for_company(company.id).await?;
    let unsynced_payments = payment_repo.count_unsynced(company.id).await?;

    Ok(Json(json!({
        "success": true,
        "company": {
            "id": company.id,
            "name": company.name,
        },
        "providers": {
            "stripe": company.provider_connected(PaymentProvider::Stripe),
            "paypal": company.provider_connected(PaymentProvider::Paypal),
            "square": company.provider_connected(PaymentProvider::Square),
        },
        "invoices": {
            "total": total_invoices,
            "paid": paid_invoices,
            "partial": partial_invoices,
            "cancelled": cancelled_invoices,
            "open": total_invoices - paid_invoices - cancelled_invoices,
        },
        "payments": {
            "total": total_payments,
            "unsynced": unsynced_payments,
        },
    })))
}
