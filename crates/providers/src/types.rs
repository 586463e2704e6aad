//! Request and response types shared by the provider gateways.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

use crate::error::ProviderError;

/// Company context available when driving a connect flow.
#[derive(Debug, Clone)]
pub struct ConnectContext {
    /// The company initiating or completing the connection.
    pub company_id: Uuid,
    /// Company display name, passed to providers where supported.
    pub company_name: String,
    /// Company contact email, if any.
    pub contact_email: Option<String>,
    /// An already-provisioned provider account id (Stripe reuses it).
    pub existing_account_id: Option<String>,
}

/// Result of initiating a connect flow.
#[derive(Debug, Clone)]
pub struct ConnectInitiation {
    /// Where to send the user's browser.
    pub authorization_url: String,
    /// A provider account id provisioned during initiation, to be
    /// persisted before the redirect (Stripe's connected account).
    pub account_id: Option<String>,
}

/// Credentials persisted onto the company row after a successful callback.
#[derive(Debug, Clone, Default)]
pub struct ConnectedCredentials {
    /// Account / merchant identifier.
    pub account_id: Option<String>,
    /// Access credential, where the provider issues one.
    pub access_token: Option<String>,
    /// Location or sub-account identifier.
    pub location_id: Option<String>,
    /// Merchant email, where the provider reports one.
    pub email: Option<String>,
    /// Whether the provider reports the account ready to take charges.
    pub charges_enabled: bool,
}

/// Outcome of completing a connect callback.
#[derive(Debug, Clone)]
pub enum ConnectOutcome {
    /// Credentials are ready to persist.
    Connected(ConnectedCredentials),
    /// Onboarding is unfinished; send the user back to the provider. The
    /// CSRF state must survive for the second round trip.
    Incomplete {
        /// Fresh onboarding URL to redirect the user to.
        onboarding_url: String,
    },
}

/// The stored per-provider credentials needed for charges.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    /// Account / merchant identifier.
    pub account_id: Option<String>,
    /// Access credential, where applicable.
    pub access_token: Option<String>,
    /// Location identifier, where applicable.
    pub location_id: Option<String>,
    /// Merchant email, where applicable.
    pub email: Option<String>,
}

/// A checkout request handed to a gateway after validation.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Stored credentials for the selected provider.
    pub credentials: ProviderCredentials,
    /// Company owning the invoice.
    pub company_id: Uuid,
    /// Company-scoped invoice number, tagged onto charges.
    pub invoice_number: String,
    /// Customer display name.
    pub customer_name: String,
    /// Amount to charge.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Tokenized payment source collected client-side (Square).
    pub source_token: Option<String>,
    /// Caller-supplied idempotency key (Square).
    pub idempotency_key: Option<String>,
}

/// Client-actionable data returned from checkout creation.
#[derive(Debug, Clone)]
pub enum CheckoutIntent {
    /// Finish the charge client-side with this client secret (Stripe).
    CardPayment {
        /// Provider intent id, round-tripped through confirmation.
        intent_id: String,
        /// Secret the client uses to complete the charge.
        client_secret: String,
    },
    /// Build a client-side order against this payee (PayPal).
    PayeeOrder {
        /// Merchant id or email the order must settle to.
        payee: String,
    },
    /// Render a card-collection form (Square without a source token).
    CardForm {
        /// Public application id.
        application_id: String,
        /// Location the payment will be scoped to.
        location_id: String,
    },
    /// Charged synchronously server-side (Square with a source token).
    Charged(ChargeRecord),
}

/// A completed provider charge ready for the ledger.
#[derive(Debug, Clone)]
pub struct ChargeRecord {
    /// Provider-assigned payment id (the idempotency key).
    pub provider_payment_id: String,
    /// Provider-assigned transaction/capture id, when reported.
    pub provider_transaction_id: Option<String>,
    /// Processing fee, when reported.
    pub processing_fee: Decimal,
}

/// Result of re-verifying a client-confirmed charge with the provider.
#[derive(Debug, Clone)]
pub struct ChargeVerification {
    /// Whether the charge is in a terminal successful state.
    pub succeeded: bool,
    /// Paid amount as reported by the provider, when reported.
    pub amount: Option<Decimal>,
    /// Currency as reported by the provider, when reported.
    pub currency: Option<String>,
    /// Transaction/capture id, when reported.
    pub transaction_id: Option<String>,
}

/// Converts a two-decimal-place amount into integer minor units.
///
/// # Errors
///
/// Returns an error if the amount does not fit the provider wire format.
pub fn to_minor_units(amount: Decimal) -> Result<i64, ProviderError> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| ProviderError::Decode(format!("amount out of range: {amount}")))
}

/// Converts integer minor units back into a decimal amount.
#[must_use]
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_minor_unit_round_trip() {
        assert_eq!(to_minor_units(dec!(12.34)).unwrap(), 1234);
        assert_eq!(to_minor_units(dec!(0.01)).unwrap(), 1);
        assert_eq!(to_minor_units(dec!(100)).unwrap(), 10000);
        assert_eq!(from_minor_units(1234), dec!(12.34));
        assert_eq!(from_minor_units(0), dec!(0.00));
    }
}
