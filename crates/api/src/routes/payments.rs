//! Payment sync routes: pull unsynced payments, acknowledge them.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::middleware::auth::AuthCompany;
use crate::response::ApiResult;
use paylink_db::PaymentRepository;
use paylink_db::entities::payments;

/// Creates the payments router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments/unsynced", get(pull_unsynced))
        .route("/payments/acknowledge", post(acknowledge))
}

/// Query parameters for the unsynced pull.
#[derive(Debug, Deserialize)]
pub struct UnsyncedQuery {
    /// Only return payments created after this watermark (RFC 3339).
    pub since: Option<DateTime<Utc>>,
}

fn payment_json(payment: &payments::Model) -> serde_json::Value {
    json!({
        "id": payment.id,
        "invoice_number": payment.invoice_number,
        "customer_name": payment.customer_name,
        "amount": payment.amount,
        "processing_fee": payment.processing_fee,
        "currency": payment.currency,
        "method": payment.method,
        "provider_payment_id": payment.provider_payment_id,
        "provider_transaction_id": payment.provider_transaction_id,
        "reference_number": payment.reference_number,
        "status": payment.status,
        "created_at": payment.created_at,
    })
}

/// GET /payments/unsynced - Payments the client app has not pulled yet.
///
/// Oldest first, so the client can replay them deterministically.
async fn pull_unsynced(
    State(state): State<AppState>,
    AuthCompany(company): AuthCompany,
    Query(query): Query<UnsyncedQuery>,
) -> ApiResult<impl IntoResponse> {
    let repo = PaymentRepository::new((*state.db).clone());
    let unsynced = repo.pull_unsynced(company.id, query.since).await?;

    Ok(Json(json!({
        "success": true,
        "count": unsynced.len(),
        "payments": unsynced.iter().map(payment_json).collect::<Vec<_>>(),
    })))
}

/// Acknowledge payload.
#[derive(Debug, Deserialize)]
pub struct AcknowledgeRequest {
    /// Payment ids the client app has durably stored.
    pub payment_ids: Vec<Uuid>,
}

/// POST /payments/acknowledge - Flip the sync flag for pulled payments.
///
/// Scoped to the authenticated company; foreign ids are ignored.
async fn acknowledge(
    State(state): State<AppState>,
    AuthCompany(company): AuthCompany,
    Json(payload): Json<AcknowledgeRequest>,
) -> ApiResult<impl IntoResponse> {
    let repo = PaymentRepository::new((*state.db).clone());
    let acknowledged = repo
        .acknowledge_synced(company.id, &payload.payment_ids)
        .await?;

    info!(company_id = %company.id, acknowledged, "Acknowledged synced payments");

    Ok(Json(json!({
        "success": true,
        "acknowledged": acknowledged,
    })))
}
