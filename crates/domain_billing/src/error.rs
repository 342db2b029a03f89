//! Billing domain errors

use core_kernel::{MoneyError, PortError};
use thiserror::Error;

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// Invoice or payment not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The operation is not allowed in the current status
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The request is malformed or violates a business rule
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The request conflicts with stored data
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error(transparent)]
    Port(PortError),
}

impl BillingError {
    pub fn invoice_not_found(id: impl std::fmt::Display) -> Self {
        BillingError::NotFound {
            entity: "Invoice".to_string(),
            id: id.to_string(),
        }
    }
}

impl From<PortError> for BillingError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { entity_type, id } => BillingError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Conflict { message } => BillingError::Conflict(message),
            PortError::Validation { message, .. } => BillingError::Validation(message),
            other => BillingError::Port(other),
        }
    }
}
