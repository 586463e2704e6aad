//! API route definitions.

use axum::{Router, middleware};

use crate::{
    AppState,
    middleware::auth::{company_auth, master_auth},
};

pub mod callback;
pub mod companies;
pub mod connect;
pub mod health;
pub mod invoices;
pub mod pages;
pub mod payments;
pub mod portal;

/// Creates the `/api/v1` router with all routes.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Registration is guarded by the shared master key
    let registration_routes = Router::new()
        .merge(companies::registration_routes())
        .layer(middleware::from_fn_with_state(state.clone(), master_auth));

    // Everything else server-to-server uses a per-company API key
    let company_routes = Router::new()
        .merge(companies::routes())
        .merge(connect::routes())
        .merge(invoices::routes())
        .merge(payments::routes())
        .layer(middleware::from_fn_with_state(state.clone(), company_auth));

    // Customer-facing routes authenticate by token and rate limit inside
    Router::new()
        .merge(health::routes())
        .merge(portal::routes())
        .merge(registration_routes)
        .merge(company_routes)
}
