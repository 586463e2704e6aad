//! The closed set of supported payment providers.
//!
//! Provider selection arrives as a string in URLs and request bodies; it is
//! parsed exactly once into this enum, and everything downstream dispatches
//! on the tag.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A supported payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    /// Stripe, via the connected-account (hosted onboarding) model.
    Stripe,
    /// PayPal, via classic OAuth or the email-only variant.
    Paypal,
    /// Square, via OAuth with merchant and location lookup.
    Square,
}

/// Error returned when parsing an unknown provider name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown payment provider: {0}")]
pub struct UnknownProvider(pub String);

impl PaymentProvider {
    /// All supported providers.
    pub const ALL: [Self; 3] = [Self::Stripe, Self::Paypal, Self::Square];

    /// Returns the canonical lowercase name used in URLs and storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Paypal => "paypal",
            Self::Square => "square",
        }
    }

    /// Returns the human-readable display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Stripe => "Stripe",
            Self::Paypal => "PayPal",
            Self::Square => "Square",
        }
    }
}

impl FromStr for PaymentProvider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(Self::Stripe),
            "paypal" => Ok(Self::Paypal),
            "square" => Ok(Self::Square),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_providers() {
        for provider in PaymentProvider::ALL {
            assert_eq!(provider.as_str().parse::<PaymentProvider>(), Ok(provider));
        }
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!("venmo".parse::<PaymentProvider>().is_err());
        // Case-sensitive: stored values are always lowercase
        assert!("Stripe".parse::<PaymentProvider>().is_err());
        assert!(String::new().parse::<PaymentProvider>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase() {
        let json = serde_json::to_string(&PaymentProvider::Paypal).unwrap();
        assert_eq!(json, "\"paypal\"");
        let back: PaymentProvider = serde_json::from_str("\"square\"").unwrap();
        assert_eq!(back, PaymentProvider::Square);
    }
}
