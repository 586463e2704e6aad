//! The common provider capability set and the dispatch registry.

use std::sync::Arc;

use async_trait::async_trait;

use paylink_core::PaymentProvider;
use paylink_shared::config::ProvidersConfig;

use crate::error::ProviderError;
use crate::paypal::PaypalGateway;
use crate::square::SquareGateway;
use crate::stripe::StripeGateway;
use crate::types::{
    ChargeVerification, CheckoutIntent, CheckoutRequest, ConnectContext, ConnectInitiation,
    ConnectOutcome, ProviderCredentials,
};

/// The capability set every provider backend implements.
///
/// All calls are synchronous network round trips with no retry; errors are
/// terminal for the request that made them.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// The tag this gateway serves.
    fn provider(&self) -> PaymentProvider;

    /// Starts a connect flow, returning where to send the user and any
    /// account id provisioned along the way.
    async fn begin_connect(
        &self,
        ctx: &ConnectContext,
        state: &str,
    ) -> Result<ConnectInitiation, ProviderError>;

    /// Completes a connect callback: exchanges the authorization code, or
    /// for the hosted-account model re-retrieves account status.
    async fn complete_connect(
        &self,
        ctx: &ConnectContext,
        code: Option<&str>,
        state: &str,
    ) -> Result<ConnectOutcome, ProviderError>;

    /// Creates the provider-specific charge intent for a validated checkout.
    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutIntent, ProviderError>;

    /// Re-verifies that a client-confirmed charge/order reached a terminal
    /// successful state, reporting the paid amount where the provider does.
    async fn verify_charge(
        &self,
        credentials: &ProviderCredentials,
        charge_id: &str,
    ) -> Result<ChargeVerification, ProviderError>;
}

/// Registry of the three gateways, dispatched on the provider tag.
#[derive(Clone)]
pub struct Gateways {
    stripe: Arc<dyn ProviderGateway>,
    paypal: Arc<dyn ProviderGateway>,
    square: Arc<dyn ProviderGateway>,
}

impl Gateways {
    /// Builds the production gateways from configuration.
    #[must_use]
    pub fn from_config(config: &ProvidersConfig, base_url: &str) -> Self {
        Self {
            stripe: Arc::new(StripeGateway::new(config.stripe.clone(), base_url)),
            paypal: Arc::new(PaypalGateway::new(config.paypal.clone(), base_url)),
            square: Arc::new(SquareGateway::new(config.square.clone(), base_url)),
        }
    }

    /// Builds a registry from explicit gateways (used by tests).
    #[must_use]
    pub fn new(
        stripe: Arc<dyn ProviderGateway>,
        paypal: Arc<dyn ProviderGateway>,
        square: Arc<dyn ProviderGateway>,
    ) -> Self {
        Self {
            stripe,
            paypal,
            square,
        }
    }

    /// Returns the gateway for a provider tag.
    #[must_use]
    pub fn get(&self, provider: PaymentProvider) -> &dyn ProviderGateway {
        match provider {
            PaymentProvider::Stripe => self.stripe.as_ref(),
            PaymentProvider::Paypal => self.paypal.as_ref(),
            PaymentProvider::Square => self.square.as_ref(),
        }
    }
}

/// Builds the callback URL a provider redirects back to.
#[must_use]
pub fn callback_url(base_url: &str, provider: PaymentProvider) -> String {
    format!("{base_url}/connect/callback/{provider}")
}
