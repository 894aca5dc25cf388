use thiserror::Error;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewardsError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Not eligible: {reason}")]
    NotEligible { reason: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Internal error")]
    Internal,
}

impl RewardsError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_eligible(reason: impl Into<String>) -> Self {
        Self::NotEligible {
            reason: reason.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self::Internal
    }
}

impl From<crate::domain::error::DomainError> for RewardsError {
    fn from(domain_error: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        match domain_error {
            UserNotFound { id } => Self::not_found(format!("user progress {id}")),
            RewardNotFound { id } => Self::not_found(format!("reward {id}")),
            Validation { field, message } => Self::validation(format!("{field}: {message}")),
            NotEligible { reason } => Self::not_eligible(reason),
            PickupConflict { pickup_id } => {
                Self::conflict(format!("pickup '{pickup_id}' belongs to another user"))
            }
            Database { .. } => Self::internal(),
        }
    }
}
