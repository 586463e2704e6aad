//! Square gateway: OAuth onboarding with merchant location, and synchronous
//! card charges.
//!
//! Onboarding exchanges the authorization code for an access token scoped to
//! the merchant, then resolves the merchant's primary active location (and
//! business email when set). With a tokenized card source the charge is
//! processed server-side immediately under an idempotency key; without one
//! the portal gets the public ids needed to render Square's card form.

use async_trait::async_trait;
use chrono::Utc;
use rand::TryRngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use serde_json::json;

use paylink_core::PaymentProvider;
use paylink_shared::config::SquareConfig;

use crate::error::ProviderError;
use crate::gateway::{ProviderGateway, callback_url};
use crate::types::{
    ChargeRecord, ChargeVerification, CheckoutIntent, CheckoutRequest, ConnectContext,
    ConnectInitiation, ConnectOutcome, ConnectedCredentials, ProviderCredentials, from_minor_units,
    to_minor_units,
};

/// Square API client.
pub struct SquareGateway {
    http: reqwest::Client,
    config: SquareConfig,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    merchant_id: String,
}

#[derive(Debug, Deserialize)]
struct LocationList {
    #[serde(default)]
    locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
struct Location {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    business_email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentEnvelope {
    payment: Payment,
}

#[derive(Debug, Deserialize)]
struct Payment {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    processing_fee: Vec<ProcessingFee>,
}

#[derive(Debug, Deserialize)]
struct ProcessingFee {
    amount_money: Option<Money>,
}

#[derive(Debug, Deserialize)]
struct Money {
    #[serde(default)]
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl SquareGateway {
    /// Creates a gateway from configuration and this service's public URL.
    #[must_use]
    pub fn new(config: SquareConfig, base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| {
                body.errors
                    .into_iter()
                    .next()
                    .and_then(|e| e.detail.or(e.code))
            })
            .unwrap_or_else(|| format!("Square returned {status}"));
        Err(ProviderError::Api(message))
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, ProviderError> {
        let response = self
            .http
            .post(format!("{}/oauth2/token", self.config.api_base))
            .json(&json!({
                "client_id": self.config.application_id,
                "client_secret": self.config.application_secret,
                "code": code,
                "grant_type": "authorization_code",
                "redirect_uri": callback_url(&self.base_url, PaymentProvider::Square),
            }))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn primary_location(&self, access_token: &str) -> Result<Location, ProviderError> {
        let response = self
            .http
            .get(format!("{}/v2/locations", self.config.api_base))
            .bearer_auth(access_token)
            .send()
            .await?;
        let list: LocationList = Self::decode(response).await?;

        list.locations
            .into_iter()
            .find(|location| location.status == "ACTIVE")
            .ok_or_else(|| ProviderError::Decode("merchant has no active location".to_string()))
    }
}

/// Derives an idempotency key when the caller did not supply one.
///
/// # Panics
///
/// Panics if the operating system randomness source fails.
fn derive_idempotency_key() -> String {
    let mut suffix = [0u8; 8];
    OsRng
        .try_fill_bytes(&mut suffix)
        .expect("operating system randomness source failed");
    format!("{}-{}", Utc::now().timestamp_millis(), hex::encode(suffix))
}

#[async_trait]
impl ProviderGateway for SquareGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Square
    }

    async fn begin_connect(
        &self,
        _ctx: &ConnectContext,
        state: &str,
    ) -> Result<ConnectInitiation, ProviderError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/oauth2/authorize", self.config.api_base),
            &[
                ("client_id", self.config.application_id.as_str()),
                ("scope", "MERCHANT_PROFILE_READ PAYMENTS_WRITE"),
                ("session", "false"),
                ("state", state),
            ],
        )
        .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(ConnectInitiation {
            authorization_url: url.into(),
            account_id: None,
        })
    }

    async fn complete_connect(
        &self,
        _ctx: &ConnectContext,
        code: Option<&str>,
        _state: &str,
    ) -> Result<ConnectOutcome, ProviderError> {
        let code =
            code.ok_or_else(|| ProviderError::Api("missing authorization code".to_string()))?;

        let tokens = self.exchange_code(code).await?;
        let location = self.primary_location(&tokens.access_token).await?;

        Ok(ConnectOutcome::Connected(ConnectedCredentials {
            account_id: Some(tokens.merchant_id),
            access_token: Some(tokens.access_token),
            location_id: Some(location.id),
            email: location.business_email,
            charges_enabled: true,
        }))
    }

    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutIntent, ProviderError> {
        let access_token = request
            .credentials
            .access_token
            .as_deref()
            .ok_or_else(|| ProviderError::Decode("no Square access token on file".to_string()))?;
        let location_id = request
            .credentials
            .location_id
            .as_deref()
            .ok_or_else(|| ProviderError::Decode("no Square location on file".to_string()))?;

        // Without a tokenized source there is nothing to charge yet; the
        // portal renders the card form with the public ids.
        let Some(source_token) = request.source_token.as_deref() else {
            return Ok(CheckoutIntent::CardForm {
                application_id: self.config.application_id.clone(),
                location_id: location_id.to_string(),
            });
        };

        let idempotency_key = request
            .idempotency_key
            .clone()
            .unwrap_or_else(derive_idempotency_key);

        let response = self
            .http
            .post(format!("{}/v2/payments", self.config.api_base))
            .bearer_auth(access_token)
            .json(&json!({
                "source_id": source_token,
                "idempotency_key": idempotency_key,
                "amount_money": {
                    "amount": to_minor_units(request.amount)?,
                    "currency": request.currency,
                },
                "location_id": location_id,
                "reference_id": request.invoice_number,
                "note": format!("Invoice {}", request.invoice_number),
            }))
            .send()
            .await?;
        let envelope: PaymentEnvelope = Self::decode(response).await?;
        let payment = envelope.payment;

        if payment.status != "COMPLETED" && payment.status != "APPROVED" {
            return Err(ProviderError::Api(format!(
                "payment was not completed (status {})",
                payment.status
            )));
        }

        let fee_minor: i64 = payment
            .processing_fee
            .iter()
            .filter_map(|fee| fee.amount_money.as_ref())
            .map(|money| money.amount)
            .sum();

        Ok(CheckoutIntent::Charged(ChargeRecord {
            provider_payment_id: payment.id,
            provider_transaction_id: payment.order_id,
            processing_fee: from_minor_units(fee_minor),
        }))
    }

    async fn verify_charge(
        &self,
        _credentials: &ProviderCredentials,
        _charge_id: &str,
    ) -> Result<ChargeVerification, ProviderError> {
        // Square charges are captured synchronously in `create_checkout`;
        // there is no second confirmation round trip to verify.
        Err(ProviderError::Unsupported)
    }
}
