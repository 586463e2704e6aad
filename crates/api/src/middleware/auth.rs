//! API-key authentication middleware for server-to-server routes.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::info;

use crate::AppState;
use paylink_db::CompanyRepository;
use paylink_db::entities::companies;
use paylink_shared::token::{constant_time_eq, is_well_formed_api_key};

/// Pulls the API key from `X-Api-Key` or an `Authorization: Bearer` header.
fn extract_api_key(request: &Request) -> Option<&str> {
    if let Some(key) = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
    {
        return Some(key);
    }

    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| {
            header
                .strip_prefix("Bearer ")
                .or_else(|| header.strip_prefix("bearer "))
        })
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "success": false,
            "message": message,
            "errorCode": "UNAUTHORIZED",
        })),
    )
        .into_response()
}

/// Middleware guarding registration with the shared master key.
///
/// The master key is compared in constant time; it is the one secret an
/// attacker could usefully probe with timing.
pub async fn master_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(key) = extract_api_key(&request) else {
        return unauthorized("API key is required");
    };

    if !constant_time_eq(key, &state.config.auth.master_api_key) {
        info!("Registration attempt with invalid master key");
        return unauthorized("Invalid API key");
    }

    next.run(request).await
}

/// Middleware resolving a per-company API key to its company row.
///
/// Per-company keys are high-entropy and unique-indexed, so a direct lookup
/// is sufficient; the shape check rejects junk before touching the database.
pub async fn company_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(key) = extract_api_key(&request) else {
        return unauthorized("API key is required");
    };

    if !is_well_formed_api_key(key) {
        return unauthorized("Invalid API key");
    }

    let repo = CompanyRepository::new((*state.db).clone());
    match repo.find_by_api_key(key).await {
        Ok(Some(company)) => {
            request.extensions_mut().insert(company);
            next.run(request).await
        }
        Ok(None) => {
            info!("Request with unknown API key");
            unauthorized("Invalid API key")
        }
        Err(err) => {
            tracing::error!(error = %err, "Database error during authentication");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "An error occurred during authentication",
                    "errorCode": "DATABASE_ERROR",
                })),
            )
                .into_response()
        }
    }
}

/// Extractor for the authenticated company.
///
/// Use this in handlers behind `company_auth`:
///
/// ```ignore
/// async fn handler(AuthCompany(company): AuthCompany) -> impl IntoResponse {
///     let company_id = company.id;
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthCompany(pub companies::Model);

impl<S> FromRequestParts<S> for AuthCompany
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<companies::Model>()
            .cloned()
            .map(AuthCompany)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "success": false,
                        "message": "Authentication required",
                        "errorCode": "UNAUTHORIZED",
                    })),
                )
            })
    }
}
