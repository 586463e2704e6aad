//! PayPal gateway: classic OAuth onboarding and order verification.
//!
//! Onboarding is an authorization-code flow against PayPal Connect; after
//! the exchange the merchant's payer id and primary email are read from the
//! identity endpoint. Checkout creates nothing server-side: the portal hands
//! the payee to PayPal's client SDK, and the confirmation path verifies the
//! resulting order before it is recorded.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use paylink_core::PaymentProvider;
use paylink_shared::config::PaypalConfig;

use crate::error::ProviderError;
use crate::gateway::{ProviderGateway, callback_url};
use crate::types::{
    ChargeVerification, CheckoutIntent, CheckoutRequest, ConnectContext, ConnectInitiation,
    ConnectOutcome, ConnectedCredentials, ProviderCredentials,
};

/// PayPal API client.
pub struct PaypalGateway {
    http: reqwest::Client,
    config: PaypalConfig,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    payer_id: Option<String>,
    #[serde(default)]
    emails: Vec<UserEmail>,
}

#[derive(Debug, Deserialize)]
struct UserEmail {
    value: String,
    #[serde(default)]
    primary: bool,
}

#[derive(Debug, Deserialize)]
struct Order {
    #[serde(default)]
    status: String,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    amount: Option<OrderAmount>,
    payments: Option<UnitPayments>,
}

#[derive(Debug, Deserialize)]
struct UnitPayments {
    #[serde(default)]
    captures: Vec<Capture>,
}

#[derive(Debug, Deserialize)]
struct Capture {
    id: String,
    amount: Option<OrderAmount>,
}

#[derive(Debug, Deserialize)]
struct OrderAmount {
    value: String,
    currency_code: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl PaypalGateway {
    /// Creates a gateway from configuration and this service's public URL.
    #[must_use]
    pub fn new(config: PaypalConfig, base_url: &str) -> Self {
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
            .and_then(|body| body.message.or(body.error_description))
            .unwrap_or_else(|| format!("PayPal returned {status}"));
        Err(ProviderError::Api(message))
    }

    async fn fetch_token(&self, grant: &[(&str, &str)]) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(format!("{}/v1/oauth2/token", self.config.api_base))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(grant)
            .send()
            .await?;
        let token: TokenResponse = Self::decode(response).await?;
        Ok(token.access_token)
    }

    async fn exchange_code(&self, code: &str) -> Result<String, ProviderError> {
        self.fetch_token(&[("grant_type", "authorization_code"), ("code", code)])
            .await
    }

    async fn app_token(&self) -> Result<String, ProviderError> {
        self.fetch_token(&[("grant_type", "client_credentials")])
            .await
    }

    async fn user_info(&self, access_token: &str) -> Result<UserInfo, ProviderError> {
        let response = self
            .http
            .get(format!(
                "{}/v1/identity/oauth2/userinfo?schema=paypalv1.1",
                self.config.api_base
            ))
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl ProviderGateway for PaypalGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Paypal
    }

    async fn begin_connect(
        &self,
        _ctx: &ConnectContext,
        state: &str,
    ) -> Result<ConnectInitiation, ProviderError> {
        let redirect_uri = callback_url(&self.base_url, PaymentProvider::Paypal);
        let url = reqwest::Url::parse_with_params(
            &format!("{}/connect", self.config.authorize_base),
            &[
                ("flowEntry", "static"),
                ("client_id", self.config.client_id.as_str()),
                ("scope", "openid email"),
                ("redirect_uri", redirect_uri.as_str()),
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

        let access_token = self.exchange_code(code).await?;
        let info = self.user_info(&access_token).await?;

        let merchant_id = info
            .payer_id
            .ok_or_else(|| ProviderError::Decode("identity response had no payer id".into()))?;
        let email = info
            .emails
            .iter()
            .find(|e| e.primary)
            .or_else(|| info.emails.first())
            .map(|e| e.value.clone());

        Ok(ConnectOutcome::Connected(ConnectedCredentials {
            account_id: Some(merchant_id),
            email,
            charges_enabled: true,
            ..ConnectedCredentials::default()
        }))
    }

    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutIntent, ProviderError> {
        // No server-side order: the portal builds the order client-side
        // against the company's payee, and confirmation verifies it.
        let payee = request
            .credentials
            .account_id
            .clone()
            .or_else(|| request.credentials.email.clone())
            .ok_or_else(|| ProviderError::Decode("no PayPal payee on file".to_string()))?;

        Ok(CheckoutIntent::PayeeOrder { payee })
    }

    async fn verify_charge(
        &self,
        _credentials: &ProviderCredentials,
        charge_id: &str,
    ) -> Result<ChargeVerification, ProviderError> {
        let token = self.app_token().await?;

        let response = self
            .http
            .get(format!(
                "{}/v2/checkout/orders/{charge_id}",
                self.config.api_base
            ))
            .bearer_auth(token)
            .send()
            .await?;
        let order: Order = Self::decode(response).await?;

        let capture = order
            .purchase_units
            .first()
            .and_then(|unit| unit.payments.as_ref())
            .and_then(|payments| payments.captures.first());
        let amount = capture
            .and_then(|c| c.amount.as_ref())
            .or_else(|| order.purchase_units.first().and_then(|u| u.amount.as_ref()));

        let parsed = amount
            .map(|a| {
                a.value
                    .parse::<Decimal>()
                    .map_err(|e| ProviderError::Decode(format!("bad order amount: {e}")))
            })
            .transpose()?;

        Ok(ChargeVerification {
            succeeded: order.status == "COMPLETED",
            amount: parsed,
            currency: amount.map(|a| a.currency_code.clone()),
            transaction_id: capture.map(|c| c.id.clone()),
        })
    }
}
