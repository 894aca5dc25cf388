use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::{
    error::RewardsError,
    model::{
        PointsQuote, Prize, ProgressSnapshot, Reward, RewardPage, RewardStats,
        RewardStatusFilter, SpinOutcome, Submission, SubmissionOutcome, WasteRole,
    },
};

/// Public API trait for the rewards module that other modules can use
#[async_trait]
pub trait RewardsApi: Send + Sync {
    /// Create the zero-valued progress row for a new account (idempotent)
    async fn enroll_user(&self, user_id: Uuid) -> Result<ProgressSnapshot, RewardsError>;

    /// Credit a completed pickup; replays of the same pickup are no-ops
    async fn apply_submission(
        &self,
        user_id: Uuid,
        submission: Submission,
    ) -> Result<SubmissionOutcome, RewardsError>;

    /// Current progress of a user
    async fn get_snapshot(&self, user_id: Uuid) -> Result<ProgressSnapshot, RewardsError>;

    /// Claim the spin of the current cycle
    async fn claim_spin(
        &self,
        user_id: Uuid,
        declared: Option<Prize>,
    ) -> Result<SpinOutcome, RewardsError>;

    /// Preview points/earnings without touching state
    fn quote(&self, category: Option<&str>, weight_kg: f64, role: WasteRole) -> PointsQuote;

    async fn list_rewards(
        &self,
        user_id: Uuid,
        status: RewardStatusFilter,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<RewardPage, RewardsError>;

    async fn reward_stats(&self, user_id: Uuid) -> Result<RewardStats, RewardsError>;

    async fn redeem_reward(&self, user_id: Uuid, reward_id: Uuid) -> Result<Reward, RewardsError>;
}
