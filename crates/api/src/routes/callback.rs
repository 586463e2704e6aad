//! Provider callback endpoints.
//!
//! These are browser redirects, not JSON: every outcome renders a
//! human-readable HTML page (or re-redirects to the provider). Failures
//! clean up the CSRF state row, with one documented exception: when Stripe
//! reports onboarding incomplete the state survives, because the same token
//! must come back on the second round trip.

use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::AppState;
use paylink_core::PaymentProvider;
use paylink_db::entities::{companies, oauth_states};
use paylink_db::repositories::CredentialUpdate;
use paylink_db::{CompanyRepository, OAuthStateRepository};
use paylink_providers::types::{ConnectContext, ConnectOutcome, ConnectedCredentials};
use paylink_shared::token::is_well_formed_state;

/// Creates the callback router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/connect/callback/{provider}", get(provider_callback))
        .route(
            "/connect/paypal/email",
            get(paypal_email_form).post(paypal_email_submit),
        )
}

/// Query parameters a provider may send back.
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    state: Option<String>,
    code: Option<String>,
    error: Option<String>,
}

/// Renders a minimal result page.
fn page(status: StatusCode, heading: &str, body: &str) -> Response {
    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{heading} - Paylink</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 32rem; margin: 4rem auto; padding: 0 1rem; color: #1a1a2e; }}
h1 {{ font-size: 1.4rem; }}
p {{ line-height: 1.5; }}
</style>
</head>
<body>
<h1>{heading}</h1>
<p>{body}</p>
<p>You can close this window and return to your application.</p>
</body>
</html>
"#
    );
    (status, Html(html)).into_response()
}

fn invalid_state_page() -> Response {
    page(
        StatusCode::UNAUTHORIZED,
        "Connection link expired",
        "This connection link is invalid or has expired. Please restart the \
         connection from your application.",
    )
}

/// Looks up a valid state row for a raw state parameter.
async fn resolve_state(
    state: &AppState,
    raw_state: Option<&str>,
    provider: PaymentProvider,
) -> Result<oauth_states::Model, Response> {
    let Some(token) = raw_state.filter(|value| is_well_formed_state(value)) else {
        return Err(page(
            StatusCode::BAD_REQUEST,
            "Invalid request",
            "The connection request is missing required information.",
        ));
    };

    let repo = OAuthStateRepository::new((*state.db).clone());
    match repo.find_valid(token, provider).await {
        Ok(Some(row)) => Ok(row),
        Ok(None) => Err(invalid_state_page()),
        Err(err) => {
            error!(error = %err, "Database error resolving connect state");
            Err(page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong",
                "We could not complete the connection. Please try again.",
            ))
        }
    }
}

/// Deletes a state row, logging rather than failing the page on error.
async fn discard_state(state: &AppState, row: &oauth_states::Model) {
    let repo = OAuthStateRepository::new((*state.db).clone());
    if let Err(err) = repo.delete(row.id).await {
        warn!(error = %err, "Failed to delete connect state row");
    }
}

/// Opportunistically sweeps expired state rows after a success.
async fn sweep_states(state: &AppState) {
    let repo = OAuthStateRepository::new((*state.db).clone());
    match repo.sweep_expired().await {
        Ok(0) => {}
        Ok(swept) => info!(swept, "Swept expired connect states"),
        Err(err) => warn!(error = %err, "Failed to sweep expired connect states"),
    }
}

async fn load_company(state: &AppState, row: &oauth_states::Model) -> Option<companies::Model> {
    CompanyRepository::new((*state.db).clone())
        .find_by_id(row.company_id)
        .await
        .ok()
        .flatten()
}

/// GET /connect/callback/{provider} - The provider redirected the user back.
async fn provider_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Ok(provider) = provider.parse::<PaymentProvider>() else {
        return page(
            StatusCode::NOT_FOUND,
            "Unknown provider",
            "This payment provider is not supported.",
        );
    };

    let state_row = match resolve_state(&state, query.state.as_deref(), provider).await {
        Ok(row) => row,
        Err(response) => return response,
    };

    // The user cancelled or the provider refused at their end
    if let Some(provider_error) = query.error.as_deref() {
        info!(%provider, provider_error, "Provider returned an error callback");
        discard_state(&state, &state_row).await;
        return page(
            StatusCode::BAD_REQUEST,
            "Connection not completed",
            "The provider did not authorize the connection. Please restart \
             the connection from your application.",
        );
    }

    let Some(company) = load_company(&state, &state_row).await else {
        discard_state(&state, &state_row).await;
        return page(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong",
            "We could not complete the connection. Please try again.",
        );
    };

    let ctx = ConnectContext {
        company_id: company.id,
        company_name: company.name.clone(),
        contact_email: company.contact_email.clone(),
        existing_account_id: company.stripe_account_id.clone(),
    };

    let outcome = state
        .gateways
        .get(provider)
        .complete_connect(&ctx, query.code.as_deref(), &state_row.state_token)
        .await;

    match outcome {
        Ok(ConnectOutcome::Connected(credentials)) => {
            let update = credential_update(&credentials);
            let repo = CompanyRepository::new((*state.db).clone());
            if let Err(err) = repo.apply_credentials(company.id, provider, &update).await {
                error!(error = %err, "Failed to persist provider credentials");
                discard_state(&state, &state_row).await;
                return page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong",
                    "We could not save the connection. Please try again.",
                );
            }

            discard_state(&state, &state_row).await;
            sweep_states(&state).await;
            info!(company_id = %company.id, %provider, "Provider connected");

            page(
                StatusCode::OK,
                "Connected",
                &format!(
                    "{} is now connected and ready to take payments.",
                    provider.display_name()
                ),
            )
        }
        Ok(ConnectOutcome::Incomplete { onboarding_url }) => {
            // Deliberately keep the state row: the same token must survive
            // the second round trip through the provider.
            info!(company_id = %company.id, %provider, "Onboarding incomplete, re-redirecting");
            Redirect::to(&onboarding_url).into_response()
        }
        Err(err) => {
            warn!(%provider, error = %err, "Provider authorization failed");
            discard_state(&state, &state_row).await;
            page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authorization failed",
                &format!("The provider reported an error: {err}"),
            )
        }
    }
}

fn credential_update(credentials: &ConnectedCredentials) -> CredentialUpdate {
    CredentialUpdate {
        account_id: credentials.account_id.clone(),
        access_token: credentials.access_token.clone(),
        location_id: credentials.location_id.clone(),
        email: credentials.email.clone(),
        charges_enabled: credentials.charges_enabled,
    }
}

/// Query parameter for the PayPal email form.
#[derive(Debug, Deserialize)]
struct EmailFormQuery {
    state: Option<String>,
}

/// Form payload posted back by the PayPal email page.
#[derive(Debug, Deserialize)]
struct EmailFormSubmission {
    state: String,
    email: String,
}

/// GET /connect/paypal/email - The form-based PayPal variant.
///
/// Renders an email form that round-trips the same CSRF state token the
/// OAuth flow would have used.
async fn paypal_email_form(
    State(state): State<AppState>,
    Query(query): Query<EmailFormQuery>,
) -> Response {
    let state_row =
        match resolve_state(&state, query.state.as_deref(), PaymentProvider::Paypal).await {
            Ok(row) => row,
            Err(response) => return response,
        };

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Connect PayPal - Paylink</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 32rem; margin: 4rem auto; padding: 0 1rem; color: #1a1a2e; }}
h1 {{ font-size: 1.4rem; }}
label {{ display: block; margin: 1rem 0 0.25rem; }}
input[type=email] {{ width: 100%; padding: 0.5rem; }}
button {{ margin-top: 1rem; padding: 0.5rem 1.5rem; }}
</style>
</head>
<body>
<h1>Connect your PayPal account</h1>
<p>Enter the email address of the PayPal account that should receive payments.</p>
<form method="post" action="/connect/paypal/email">
<input type="hidden" name="state" value="{}">
<label for="email">PayPal email</label>
<input type="email" id="email" name="email" required>
<button type="submit">Connect</button>
</form>
</body>
</html>
"#,
        state_row.state_token
    );

    Html(html).into_response()
}

/// POST /connect/paypal/email - Persist the payee email.
async fn paypal_email_submit(
    State(state): State<AppState>,
    Form(submission): Form<EmailFormSubmission>,
) -> Response {
    let state_row =
        match resolve_state(&state, Some(submission.state.as_str()), PaymentProvider::Paypal).await
        {
            Ok(row) => row,
            Err(response) => return response,
        };

    let email = submission.email.trim();
    if email.is_empty() || !email.contains('@') {
        return page(
            StatusCode::BAD_REQUEST,
            "Invalid email",
            "Please go back and enter a valid PayPal email address.",
        );
    }

    let repo = CompanyRepository::new((*state.db).clone());
    if let Err(err) = repo.set_paypal_email(state_row.company_id, email).await {
        error!(error = %err, "Failed to persist PayPal email");
        discard_state(&state, &state_row).await;
        return page(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong",
            "We could not save the connection. Please try again.",
        );
    }

    discard_state(&state, &state_row).await;
    sweep_states(&state).await;
    info!(company_id = %state_row.company_id, "PayPal connected via email");

    page(
        StatusCode::OK,
        "Connected",
        "PayPal is now connected and ready to take payments.",
    )
}
