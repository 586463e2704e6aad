//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed token, missing field, or otherwise invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Bad or missing API key, or an invalid CSRF state.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Invoice, company, or state not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invoice already settled, amount mismatch, or provider not connected.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Too many failed lookups from this client.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Upstream payment provider failure.
    #[error("Payment provider error: {0}")]
    Provider(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::RateLimited => 429,
            Self::Provider(_) | Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the machine-readable error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::RateLimited => "RATE_LIMITED",
            Self::Provider(_) => "PROVIDER_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Wraps any displayable error as a `Database` error.
    pub fn db<E: std::fmt::Display>(err: E) -> Self {
        Self::Database(err.to_string())
    }
}
