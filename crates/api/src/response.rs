//! The JSON response envelope and error mapping.
//!
//! Every JSON response carries a `success` boolean; failures add a
//! human-readable `message` and a machine-readable `errorCode`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use paylink_core::checkout::CheckoutError;
use paylink_core::invoice::UnknownStatus;
use paylink_core::provider::UnknownProvider;
use paylink_providers::ProviderError;
use paylink_shared::AppError;

/// Result alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Wrapper rendering an `AppError` as the JSON failure envelope.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (
            status,
            Json(json!({
                "success": false,
                "message": self.0.to_string(),
                "errorCode": self.0.error_code(),
            })),
        )
            .into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self(AppError::Database(err.to_string()))
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        Self(AppError::Provider(err.to_string()))
    }
}

impl From<UnknownProvider> for ApiError {
    fn from(err: UnknownProvider) -> Self {
        Self(AppError::InvalidInput(err.to_string()))
    }
}

impl From<UnknownStatus> for ApiError {
    fn from(err: UnknownStatus) -> Self {
        Self(AppError::InvalidInput(err.to_string()))
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::InvoiceClosed(_) => Self(AppError::Conflict(err.to_string())),
            CheckoutError::InvalidAmount { .. } => Self(AppError::InvalidInput(err.to_string())),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self(AppError::InvalidInput(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_errors_map_to_documented_codes() {
        let closed: ApiError = CheckoutError::InvoiceClosed(paylink_core::InvoiceStatus::Paid).into();
        assert_eq!(closed.0.error_code(), "CONFLICT");

        let amount: ApiError = CheckoutError::InvalidAmount {
            requested: rust_decimal::Decimal::ONE,
            balance_due: rust_decimal::Decimal::ZERO,
        }
        .into();
        assert_eq!(amount.0.error_code(), "INVALID_INPUT");
    }
}
