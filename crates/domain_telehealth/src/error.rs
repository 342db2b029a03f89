//! Telehealth domain errors

use core_kernel::PortError;
use thiserror::Error;

use crate::session::{SessionEvent, SessionStatus};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid session transition: {event} is not allowed from {from}")]
    InvalidTransition { from: SessionStatus, event: SessionEvent },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Port(PortError),
}

impl From<PortError> for SessionError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { entity_type, id } => SessionError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Conflict { message } => SessionError::Conflict(message),
            PortError::Validation { message, .. } => SessionError::Validation(message),
            other => SessionError::Port(other),
        }
    }
}
