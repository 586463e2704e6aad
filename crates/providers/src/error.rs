//! Provider client error types.

use thiserror::Error;

/// Errors surfaced by a provider gateway call.
///
/// Provider failures are terminal for the request that triggered them; the
/// caller surfaces the message and never retries automatically.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (connect, TLS, timeout).
    #[error("Provider request failed: {0}")]
    Request(String),

    /// The provider answered with an error payload.
    #[error("{0}")]
    Api(String),

    /// The provider answered 2xx but the payload was missing expected data.
    #[error("Unexpected provider response: {0}")]
    Decode(String),

    /// The operation does not exist for this provider.
    #[error("Operation not supported by this provider")]
    Unsupported,
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}
