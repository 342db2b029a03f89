//! Claims domain errors

use core_kernel::{MoneyError, PortError};
use domain_billing::BillingError;
use thiserror::Error;

use crate::claim::ClaimStatus;
use crate::transition::ClaimEvent;

/// Errors that can occur in the claims domain
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The operation is not allowed in the claim's current status
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid status transition: {event} is not allowed from {from}")]
    InvalidTransition { from: ClaimStatus, event: ClaimEvent },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Raised by an invoice or payment effect of a transition
    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error(transparent)]
    Port(PortError),
}

impl ClaimError {
    pub fn claim_not_found(id: impl std::fmt::Display) -> Self {
        ClaimError::NotFound {
            entity: "InsuranceClaim".to_string(),
            id: id.to_string(),
        }
    }
}

impl From<PortError> for ClaimError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { entity_type, id } => ClaimError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Conflict { message } => ClaimError::Conflict(message),
            PortError::Validation { message, .. } => ClaimError::Validation(message),
            other => ClaimError::Port(other),
        }
    }
}
