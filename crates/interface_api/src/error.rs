//! API error handling
//!
//! Domain errors map onto HTTP statuses here. Unexpected failures are
//! logged and answered with an opaque 500 body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use domain_billing::BillingError;
use domain_claims::ClaimError;
use domain_telehealth::SessionError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request or an operation the current status does not allow
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized".to_string()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg),
            ApiError::Internal(msg) => {
                error!(error = %msg, "Unexpected error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            BillingError::InvalidState(msg) => ApiError::BadRequest(msg),
            BillingError::Validation(msg) => ApiError::Validation(msg),
            BillingError::Conflict(msg) => ApiError::Conflict(msg),
            BillingError::Money(e) => ApiError::Validation(e.to_string()),
            BillingError::Port(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ClaimError> for ApiError {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            ClaimError::InvalidState(msg) => ApiError::BadRequest(msg),
            ClaimError::InvalidTransition { .. } => ApiError::BadRequest(err.to_string()),
            ClaimError::Validation(msg) => ApiError::Validation(msg),
            ClaimError::Conflict(msg) => ApiError::Conflict(msg),
            ClaimError::Billing(e) => e.into(),
            ClaimError::Money(e) => ApiError::Validation(e.to_string()),
            ClaimError::Port(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            SessionError::InvalidState(msg) => ApiError::BadRequest(msg),
            SessionError::InvalidTransition { .. } => ApiError::BadRequest(err.to_string()),
            SessionError::Validation(msg) => ApiError::Validation(msg),
            SessionError::Conflict(msg) => ApiError::Conflict(msg),
            SessionError::Port(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::PortError;
    use domain_claims::{ClaimEvent, ClaimStatus};

    #[test]
    fn test_domain_errors_map_to_statuses() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (BillingError::invoice_not_found(3).into(), StatusCode::NOT_FOUND),
            (BillingError::InvalidState("cancelled".into()).into(), StatusCode::BAD_REQUEST),
            (BillingError::Conflict("stale".into()).into(), StatusCode::CONFLICT),
            (ClaimError::Validation("amount".into()).into(), StatusCode::UNPROCESSABLE_ENTITY),
            (
                ClaimError::InvalidTransition {
                    from: ClaimStatus::Paid,
                    event: ClaimEvent::Submit,
                }
                .into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ClaimError::Billing(BillingError::invoice_not_found(9)).into(),
                StatusCode::NOT_FOUND,
            ),
            (SessionError::InvalidState("done".into()).into(), StatusCode::BAD_REQUEST),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_port_failures_are_opaque() {
        let err: ApiError = BillingError::Port(PortError::connection("pool timed out")).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
