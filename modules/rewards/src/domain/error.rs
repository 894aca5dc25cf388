use thiserror::Error;
use uuid::Uuid;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("User progress not found: {id}")]
    UserNotFound { id: Uuid },

    #[error("Reward not found: {id}")]
    RewardNotFound { id: Uuid },

    #[error("Not eligible: {reason}")]
    NotEligible { reason: String },

    #[error("Pickup '{pickup_id}' is already credited to another user")]
    PickupConflict { pickup_id: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn user_not_found(id: Uuid) -> Self {
        Self::UserNotFound { id }
    }

    pub fn reward_not_found(id: Uuid) -> Self {
        Self::RewardNotFound { id }
    }

    pub fn not_eligible(reason: impl Into<String>) -> Self {
        Self::NotEligible {
            reason: reason.into(),
        }
    }

    pub fn pickup_conflict(pickup_id: impl Into<String>) -> Self {
        Self::PickupConflict {
            pickup_id: pickup_id.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for DomainError {
    fn from(e: anyhow::Error) -> Self {
        // `{:#}` keeps the context chain in one line
        Self::database(format!("{e:#}"))
    }
}
