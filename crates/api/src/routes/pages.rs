//! Server-rendered portal pages.
//!
//! Minimal HTML views keyed by token. The pages embed publishable
//! identifiers only (Stripe publishable key, Square application id); secret
//! credentials never leave the server. Payment interaction itself happens
//! through the provider widgets driven by the portal API.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::Utc;

use crate::AppState;
use crate::extractors::ClientIp;
use crate::response::ApiError;
use crate::routes::portal::{lookup_customer_invoices, lookup_invoice};
use paylink_core::{InvoiceStatus, PaymentProvider};
use paylink_db::CompanyRepository;
use paylink_db::entities::{companies, invoices};

/// Creates the pages router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoice/{token}", get(invoice_page))
        .route("/customer/{token}", get(customer_page))
}

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 40rem; margin: 3rem auto; padding: 0 1rem; color: #1a1a2e; }}
h1 {{ font-size: 1.5rem; }}
table {{ width: 100%; border-collapse: collapse; margin: 1rem 0; }}
td, th {{ padding: 0.4rem 0; text-align: left; border-bottom: 1px solid #eee; }}
.amount {{ font-size: 1.3rem; font-weight: 600; }}
.status {{ text-transform: capitalize; color: #555; }}
img.logo {{ max-height: 3rem; }}
</style>
</head>
<body>
{body}
</body>
</html>
"#
    ))
}

/// Renders an `ApiError` as an HTML page instead of the JSON envelope.
fn error_page(err: &ApiError) -> Response {
    let status =
        StatusCode::from_u16(err.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = format!("<h1>Unable to load this page</h1><p>{}</p>", err.0);
    (status, layout("Paylink", &body)).into_response()
}

fn logo_html(company: &companies::Model) -> String {
    company.logo_url.as_deref().map_or_else(String::new, |url| {
        format!(r#"<img class="logo" src="{url}" alt="">"#)
    })
}

fn display_status(invoice: &invoices::Model) -> String {
    invoice
        .status
        .parse::<InvoiceStatus>()
        .map_or_else(
            |_| invoice.status.clone(),
            |status| {
                status
                    .display_status(invoice.due_date, Utc::now().date_naive())
                    .to_string()
            },
        )
}

/// The provider-widget configuration embedded into a payable page.
///
/// Publishable identifiers only; availability flags mirror the portal API.
fn payment_config(state: &AppState, company: &companies::Model) -> String {
    format!(
        r#"<div id="payment-methods"
  data-stripe-enabled="{stripe}" data-stripe-key="{stripe_key}"
  data-paypal-enabled="{paypal}"
  data-square-enabled="{square}" data-square-app-id="{square_app}"></div>"#,
        stripe = company.provider_connected(PaymentProvider::Stripe),
        stripe_key = state.config.providers.stripe.publishable_key,
        paypal = company.provider_connected(PaymentProvider::Paypal),
        square = company.provider_connected(PaymentProvider::Square),
        square_app = state.config.providers.square.application_id,
    )
}

/// GET /invoice/{token} - The single-invoice portal view.
async fn invoice_page(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ClientIp(ip): ClientIp,
) -> Response {
    let invoice = match lookup_invoice(&state, &ip, &token).await {
        Ok(invoice) => invoice,
        Err(err) => return error_page(&err),
    };
    let Ok(Some(company)) = CompanyRepository::new((*state.db).clone())
        .find_by_id(invoice.company_id)
        .await
    else {
        return error_page(&ApiError(paylink_shared::AppError::Internal(
            "Invoice has no owning company".to_string(),
        )));
    };

    let due = invoice
        .due_date
        .map_or_else(String::new, |date| format!("<tr><td>Due date</td><td>{date}</td></tr>"));
    let body = format!(
        r#"{logo}
<h1>Invoice {number} from {company_name}</h1>
<p class="status">Status: {status}</p>
<table>
<tr><td>Total</td><td>{total} {currency}</td></tr>
<tr><td>Balance due</td><td class="amount">{balance} {currency}</td></tr>
{due}
</table>
{payment_config}
"#,
        logo = logo_html(&company),
        number = invoice.invoice_number,
        company_name = company.name,
        status = display_status(&invoice),
        total = invoice.total_amount,
        balance = invoice.balance_due,
        currency = invoice.currency,
        payment_config = payment_config(&state, &company),
    );

    layout(
        &format!("Invoice {} - {}", invoice.invoice_number, company.name),
        &body,
    )
    .into_response()
}

/// GET /customer/{token} - All of a customer's invoices at one company.
async fn customer_page(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ClientIp(ip): ClientIp,
) -> Response {
    let found = match lookup_customer_invoices(&state, &ip, &token).await {
        Ok(found) => found,
        Err(err) => return error_page(&err),
    };
    let Ok(Some(company)) = CompanyRepository::new((*state.db).clone())
        .find_by_id(found[0].company_id)
        .await
    else {
        return error_page(&ApiError(paylink_shared::AppError::Internal(
            "Invoice has no owning company".to_string(),
        )));
    };

    let rows: String = found
        .iter()
        .map(|invoice| {
            format!(
                r#"<tr><td><a href="/invoice/{token}">{number}</a></td><td class="status">{status}</td><td>{balance} {currency}</td></tr>"#,
                token = invoice.invoice_token,
                number = invoice.invoice_number,
                status = display_status(invoice),
                balance = invoice.balance_due,
                currency = invoice.currency,
            )
        })
        .collect();

    let body = format!(
        r#"{logo}
<h1>Your invoices from {company_name}</h1>
<table>
<tr><th>Invoice</th><th>Status</th><th>Balance due</th></tr>
{rows}
</table>
"#,
        logo = logo_html(&company),
        company_name = company.name,
    );

    layout(&format!("Your invoices - {}", company.name), &body).into_response()
}
