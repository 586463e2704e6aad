//! Provider connect routes: initiate onboarding, disconnect.
//!
//! Initiation issues a CSRF state row before anything touches the provider,
//! so the later callback can prove it belongs to an attempt we started.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::AppState;
use crate::middleware::auth::AuthCompany;
use crate::response::ApiResult;
use paylink_core::PaymentProvider;
use paylink_db::{CompanyRepository, OAuthStateRepository};
use paylink_providers::types::ConnectContext;
use paylink_shared::AppError;
use paylink_shared::token::generate_csrf_state;

/// Creates the connect router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/connect/{provider}/initiate", post(initiate))
        .route("/connect/{provider}/disconnect", post(disconnect))
}

/// Initiation options.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitiateRequest {
    /// PayPal only: `oauth` (default) or `email` for the form-based flow.
    #[serde(default)]
    pub method: Option<String>,
}

/// POST /connect/{provider}/initiate - Start onboarding a provider.
async fn initiate(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    AuthCompany(company): AuthCompany,
    payload: Option<Json<InitiateRequest>>,
) -> ApiResult<impl IntoResponse> {
    let provider: PaymentProvider = provider.parse()?;
    let options = payload.map(|Json(p)| p).unwrap_or_default();

    let state_repo = OAuthStateRepository::new((*state.db).clone());
    let state_token = generate_csrf_state();
    state_repo
        .create(company.id, provider, &state_token)
        .await?;

    // PayPal's variant flow skips OAuth entirely: the user types an email
    // into a form we host, still gated by the same CSRF state.
    if provider == PaymentProvider::Paypal && options.method.as_deref() == Some("email") {
        let authorization_url = format!(
            "{}/connect/paypal/email?state={state_token}",
            state.config.portal.base_url.trim_end_matches('/')
        );
        return Ok(Json(json!({
            "success": true,
            "authorization_url": authorization_url,
        })));
    }

    let ctx = ConnectContext {
        company_id: company.id,
        company_name: company.name.clone(),
        contact_email: company.contact_email.clone(),
        existing_account_id: company.stripe_account_id.clone(),
    };

    let initiation = state
        .gateways
        .get(provider)
        .begin_connect(&ctx, &state_token)
        .await?;

    // A Stripe connected account provisioned here must survive an abandoned
    // onboarding, so it is persisted before the user ever leaves.
    if let Some(account_id) = initiation.account_id.as_deref() {
        CompanyRepository::new((*state.db).clone())
            .set_stripe_account(company.id, account_id)
            .await?;
    }

    info!(company_id = %company.id, %provider, "Initiated provider connect");

    Ok(Json(json!({
        "success": true,
        "authorization_url": initiation.authorization_url,
    })))
}

/// POST /connect/{provider}/disconnect - Clear a provider's credentials.
///
/// Idempotent: disconnecting an already-disconnected provider succeeds.
async fn disconnect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    AuthCompany(company): AuthCompany,
) -> ApiResult<impl IntoResponse> {
    let provider: PaymentProvider = provider.parse()?;

    CompanyRepository::new((*state.db).clone())
        .clear_provider(company.id, provider)
        .await
        .map_err(AppError::db)?;

    info!(company_id = %company.id, %provider, "Disconnected provider");

    Ok(Json(json!({
        "success": true,
        "message": format!("{} disconnected", provider.display_name()),
    })))
}
