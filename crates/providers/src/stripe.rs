//! Stripe gateway: connected-account onboarding and destination charges.
//!
//! Onboarding uses the hosted-account model: a connected account is created
//! once per company and reused, and the user is sent to a time-boxed
//! account-onboarding link. Charges are `PaymentIntent`s created directly on
//! the connected account with no platform fee.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use paylink_core::PaymentProvider;
use paylink_shared::config::StripeConfig;

use crate::error::ProviderError;
use crate::gateway::{ProviderGateway, callback_url};
use crate::types::{
    ChargeVerification, CheckoutIntent, CheckoutRequest, ConnectContext, ConnectInitiation,
    ConnectOutcome, ConnectedCredentials, ProviderCredentials, from_minor_units, to_minor_units,
};

/// Stripe API client.
pub struct StripeGateway {
    http: reqwest::Client,
    config: StripeConfig,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Account {
    id: String,
    #[serde(default)]
    details_submitted: bool,
    #[serde(default)]
    charges_enabled: bool,
}

#[derive(Debug, Deserialize)]
struct AccountLink {
    url: String,
}

#[derive(Debug, Deserialize)]
struct PaymentIntent {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    amount_received: i64,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    latest_charge: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

impl StripeGateway {
    /// Creates a gateway from configuration and this service's public URL.
    #[must_use]
    pub fn new(config: StripeConfig, base_url: &str) -> Self {
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
            .and_then(|body| body.error.message)
            .unwrap_or_else(|| format!("Stripe returned {status}"));
        Err(ProviderError::Api(message))
    }

    async fn create_account(&self, ctx: &ConnectContext) -> Result<Account, ProviderError> {
        let company_id = ctx.company_id.to_string();
        let mut form = vec![
            ("type", "express"),
            ("metadata[company_id]", company_id.as_str()),
            ("business_profile[name]", ctx.company_name.as_str()),
        ];
        if let Some(email) = ctx.contact_email.as_deref() {
            form.push(("email", email));
        }

        let response = self
            .http
            .post(format!("{}/v1/accounts", self.config.api_base))
            .bearer_auth(&self.config.secret_key)
            .form(&form)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn onboarding_link(
        &self,
        account_id: &str,
        state: &str,
    ) -> Result<AccountLink, ProviderError> {
        let return_url = format!(
            "{}?state={state}",
            callback_url(&self.base_url, PaymentProvider::Stripe)
        );
        let form = [
            ("account", account_id),
            ("type", "account_onboarding"),
            ("return_url", return_url.as_str()),
            ("refresh_url", return_url.as_str()),
        ];

        let response = self
            .http
            .post(format!("{}/v1/account_links", self.config.api_base))
            .bearer_auth(&self.config.secret_key)
            .form(&form)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn retrieve_account(&self, account_id: &str) -> Result<Account, ProviderError> {
        let response = self
            .http
            .get(format!("{}/v1/accounts/{account_id}", self.config.api_base))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl ProviderGateway for StripeGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Stripe
    }

    async fn begin_connect(
        &self,
        ctx: &ConnectContext,
        state: &str,
    ) -> Result<ConnectInitiation, ProviderError> {
        // Creating the connected account is idempotent from the company's
        // point of view: an id already on file is always reused.
        let account_id = match ctx.existing_account_id.clone() {
            Some(id) => id,
            None => {
                let account = self.create_account(ctx).await?;
                debug!(account_id = %account.id, "Created Stripe connected account");
                account.id
            }
        };

        let link = self.onboarding_link(&account_id, state).await?;

        Ok(ConnectInitiation {
            authorization_url: link.url,
            account_id: Some(account_id),
        })
    }

    async fn complete_connect(
        &self,
        ctx: &ConnectContext,
        _code: Option<&str>,
        state: &str,
    ) -> Result<ConnectOutcome, ProviderError> {
        // No code exchange in the hosted-account model: the callback means
        // the user came back, not that onboarding finished.
        let account_id = ctx
            .existing_account_id
            .as_deref()
            .ok_or_else(|| ProviderError::Decode("no connected account on file".to_string()))?;

        let account = self.retrieve_account(account_id).await?;

        if account.details_submitted && account.charges_enabled {
            Ok(ConnectOutcome::Connected(ConnectedCredentials {
                account_id: Some(account.id),
                charges_enabled: true,
                ..ConnectedCredentials::default()
            }))
        } else {
            // Onboarding unfinished: issue a fresh link and send the user
            // back; the caller keeps the CSRF state alive for the retry.
            let link = self.onboarding_link(account_id, state).await?;
            Ok(ConnectOutcome::Incomplete {
                onboarding_url: link.url,
            })
        }
    }

    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutIntent, ProviderError> {
        let account_id = request
            .credentials
            .account_id
            .as_deref()
            .ok_or_else(|| ProviderError::Decode("no connected account on file".to_string()))?;

        let amount = to_minor_units(request.amount)?.to_string();
        let currency = request.currency.to_lowercase();
        let company_id = request.company_id.to_string();
        let description = format!("Invoice {}", request.invoice_number);
        let form = [
            ("amount", amount.as_str()),
            ("currency", currency.as_str()),
            ("description", description.as_str()),
            ("metadata[invoice_number]", request.invoice_number.as_str()),
            ("metadata[company_id]", company_id.as_str()),
            ("automatic_payment_methods[enabled]", "true"),
        ];

        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.config.api_base))
            .bearer_auth(&self.config.secret_key)
            .header("Stripe-Account", account_id)
            .form(&form)
            .send()
            .await?;
        let intent: PaymentIntent = Self::decode(response).await?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| ProviderError::Decode("payment intent had no client secret".into()))?;

        Ok(CheckoutIntent::CardPayment {
            intent_id: intent.id,
            client_secret,
        })
    }

    async fn verify_charge(
        &self,
        credentials: &ProviderCredentials,
        charge_id: &str,
    ) -> Result<ChargeVerification, ProviderError> {
        let account_id = credentials
            .account_id
            .as_deref()
            .ok_or_else(|| ProviderError::Decode("no connected account on file".to_string()))?;

        let response = self
            .http
            .get(format!(
                "{}/v1/payment_intents/{charge_id}",
                self.config.api_base
            ))
            .bearer_auth(&self.config.secret_key)
            .header("Stripe-Account", account_id)
            .send()
            .await?;
        let intent: PaymentIntent = Self::decode(response).await?;

        Ok(ChargeVerification {
            succeeded: intent.status == "succeeded",
            amount: Some(from_minor_units(intent.amount_received)),
            currency: Some(intent.currency),
            transaction_id: intent.latest_charge,
        })
    }
}
