use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::model::{Prize, RewardKind};

/// Transport-agnostic domain event, published after the owning transaction commits.
#[derive(Debug, Clone, PartialEq)]
pub enum RewardsDomainEvent {
    SubmissionApplied {
        user_id: Uuid,
        pickup_id: String,
        points: i64,
        total_points: i64,
        at: DateTime<Utc>,
    },
    LevelUp {
        user_id: Uuid,
        from: u8,
        to: u8,
        at: DateTime<Utc>,
    },
    RewardIssued {
        user_id: Uuid,
        reward_id: Uuid,
        kind: RewardKind,
        at: DateTime<Utc>,
    },
    SpinClaimed {
        user_id: Uuid,
        prize: Prize,
        at: DateTime<Utc>,
    },
    RewardRedeemed {
        user_id: Uuid,
        reward_id: Uuid,
        at: DateTime<Utc>,
    },
}

impl RewardsDomainEvent {
    pub fn user_id(&self) -> Uuid {
        match self {
            Self::SubmissionApplied { user_id, .. }
            | Self::LevelUp { user_id, .. }
            | Self::RewardIssued { user_id, .. }
            | Self::SpinClaimed { user_id, .. }
            | Self::RewardRedeemed { user_id, .. } => *user_id,
        }
    }
}
