use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::model::{Reward, RewardStatusFilter, WasteTypeTotal};

/// Per-user progress aggregate as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub user_id: Uuid,
    pub total_points: i64,
    pub current_level: u8,
    pub cycle_progress: f64,
    pub wheel_spun_this_cycle: bool,
    pub first_pickup_coupon_used: bool,
    pub submission_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    pub fn enrolled(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            total_points: 0,
            current_level: 1,
            cycle_progress: 0.0,
            wheel_spun_this_cycle: false,
            first_pickup_coupon_used: false,
            submission_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_spin(&self) -> bool {
        !self.wheel_spun_this_cycle && self.submission_count > 0
    }
}

/// One credited pickup. Append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pickup_id: String,
    pub points_awarded: i64,
    pub category: String,
    pub weight_kg: f64,
    pub created_at: DateTime<Utc>,
}

/// Result of an insert guarded by a unique key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// Port for the domain layer: reads and single-statement writes outside a unit of work.
/// Object-safe and async-friendly via `async_trait`.
#[async_trait]
pub trait RewardsStore: Send + Sync {
    /// Open a unit of work. Dropping it without `commit` rolls back.
    async fn begin(&self) -> anyhow::Result<Box<dyn RewardsUnitOfWork>>;

    async fn find_progress(&self, user_id: Uuid) -> anyhow::Result<Option<ProgressRecord>>;
    /// Insert unless a row for the user already exists.
    async fn insert_progress(&self, record: &ProgressRecord) -> anyhow::Result<InsertOutcome>;
    /// Weight per category, heaviest first.
    async fn waste_breakdown(&self, user_id: Uuid) -> anyhow::Result<Vec<WasteTypeTotal>>;

    async fn find_reward(&self, reward_id: Uuid) -> anyhow::Result<Option<Reward>>;
    /// The first-submission reward of a user, if one was issued.
    async fn first_submission_reward(&self, user_id: Uuid) -> anyhow::Result<Option<Reward>>;
    /// Newest first. Returns the requested slice and the total matching count.
    async fn list_rewards(
        &self,
        user_id: Uuid,
        filter: RewardStatusFilter,
        now: DateTime<Utc>,
        offset: u64,
        limit: u64,
    ) -> anyhow::Result<(Vec<Reward>, u64)>;
    async fn all_rewards(&self, user_id: Uuid) -> anyhow::Result<Vec<Reward>>;
    /// Record a redemption; `Duplicate` when the reward was already redeemed.
    async fn insert_redemption(
        &self,
        reward_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> anyhow::Result<InsertOutcome>;
}

/// One database transaction. All reads go through the same connection.
#[async_trait]
pub trait RewardsUnitOfWork: Send + Sync {
    /// Load the user's progress, locking the row where the backend supports it.
    async fn lock_progress(&self, user_id: Uuid) -> anyhow::Result<Option<ProgressRecord>>;
    async fn find_transaction(&self, pickup_id: &str)
        -> anyhow::Result<Option<TransactionRecord>>;
    /// `Duplicate` when the pickup id is already taken; the transaction stays usable.
    async fn insert_transaction(&self, record: &TransactionRecord)
        -> anyhow::Result<InsertOutcome>;
    async fn total_waste(&self, user_id: Uuid) -> anyhow::Result<f64>;
    async fn save_progress(&self, record: &ProgressRecord) -> anyhow::Result<()>;
    async fn coupon_code_exists(&self, code: &str) -> anyhow::Result<bool>;
    async fn insert_reward(&self, reward: &Reward) -> anyhow::Result<()>;
    /// Compare-and-swap: mark the cycle as spun and reset its progress only if
    /// the user is currently allowed to spin. Returns whether a row changed.
    async fn claim_spin(&self, user_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<bool>;
    async fn commit(self: Box<Self>) -> anyhow::Result<()>;
}
