//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - The server-to-server JSON API (API-key authenticated)
//! - The customer-facing portal API (token authenticated, rate limited)
//! - Provider callback endpoints (browser redirects, HTML)
//! - Minimal server-rendered portal pages

pub mod extractors;
pub mod middleware;
pub mod response;
pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use paylink_providers::Gateways;
use paylink_shared::{AppConfig, EmailService};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Payment provider gateways.
    pub gateways: Gateways,
    /// Email service for customer notifications.
    pub email: Arc<EmailService>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .merge(routes::callback::routes())
        .merge(routes::pages::routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
