use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::contract::{
    client::RewardsApi,
    error::RewardsError,
    model::{
        PointsQuote, Prize, ProgressSnapshot, Reward, RewardPage, RewardStats,
        RewardStatusFilter, SpinOutcome, Submission, SubmissionOutcome, WasteRole,
    },
};
use crate::domain::service::Service;

/// Local implementation of the RewardsApi trait that delegates to the domain service
pub struct RewardsLocalClient {
    service: Arc<Service>,
}

impl RewardsLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl RewardsApi for RewardsLocalClient {
    async fn enroll_user(&self, user_id: Uuid) -> Result<ProgressSnapshot, RewardsError> {
        self.service.enroll_user(user_id).await.map_err(Into::into)
    }

    async fn apply_submission(
        &self,
        user_id: Uuid,
        submission: Submission,
    ) -> Result<SubmissionOutcome, RewardsError> {
        self.service
            .apply_submission(user_id, submission)
            .await
            .map_err(Into::into)
    }

    async fn get_snapshot(&self, user_id: Uuid) -> Result<ProgressSnapshot, RewardsError> {
        self.service.get_snapshot(user_id).await.map_err(Into::into)
    }

    async fn claim_spin(
        &self,
        user_id: Uuid,
        declared: Option<Prize>,
    ) -> Result<SpinOutcome, RewardsError> {
        self.service
            .claim_spin(user_id, declared)
            .await
            .map_err(Into::into)
    }

    fn quote(&self, category: Option<&str>, weight_kg: f64, role: WasteRole) -> PointsQuote {
        self.service.quote(category, weight_kg, role)
    }

    async fn list_rewards(
        &self,
        user_id: Uuid,
        status: RewardStatusFilter,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<RewardPage, RewardsError> {
        self.service
            .list_rewards(user_id, status, page, limit)
            .await
            .map_err(Into::into)
    }

    async fn reward_stats(&self, user_id: Uuid) -> Result<RewardStats, RewardsError> {
        self.service.reward_stats(user_id).await.map_err(Into::into)
    }

    async fn redeem_reward(&self, user_id: Uuid, reward_id: Uuid) -> Result<Reward, RewardsError> {
        self.service
            .redeem_reward(user_id, reward_id)
            .await
            .map_err(Into::into)
    }
}
