//! SeaORM-backed implementation of the rewards store port.
//!
//! Reads that do not need isolation go through the shared connection. Every
//! mutating flow runs inside a [`SeaOrmUnitOfWork`] that owns one database
//! transaction; dropping it without `commit` rolls back.
//!
//! SQLite cannot upgrade a deferred read transaction to a writer while another
//! connection writes, and fails such upgrades without honouring the busy
//! timeout. On SQLite every write therefore passes through one in-process gate.

use anyhow::Context;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict, Query};
use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbBackend, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Select, Set, TransactionTrait,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::contract::model::{Reward, RewardKind, RewardStatusFilter, WasteTypeTotal};
use crate::domain::repo::{
    InsertOutcome, ProgressRecord, RewardsStore, RewardsUnitOfWork, TransactionRecord,
};
use crate::infra::storage::entity::{
    progress_transaction, reward, reward_redemption, user_progress,
};
use crate::infra::storage::mapper::{
    progress_from_entity, progress_to_active, reward_from_entity, reward_to_active,
    transaction_from_entity, transaction_to_active,
};

pub struct SeaOrmRewardsStore {
    db: DatabaseConnection,
    /// Single-writer gate, present only on SQLite.
    write_gate: Option<Arc<Mutex<()>>>,
}

impl SeaOrmRewardsStore {
    pub fn new(db: DatabaseConnection) -> Self {
        let write_gate =
            (db.get_database_backend() == DbBackend::Sqlite).then(|| Arc::new(Mutex::new(())));
        Self { db, write_gate }
    }

    async fn write_permit(&self) -> Option<OwnedMutexGuard<()>> {
        match &self.write_gate {
            Some(gate) => Some(gate.clone().lock_owned().await),
            None => None,
        }
    }
}

#[async_trait::async_trait]
impl RewardsStore for SeaOrmRewardsStore {
    async fn begin(&self) -> anyhow::Result<Box<dyn RewardsUnitOfWork>> {
        // Gate first, then the pooled connection; standalone writes use the same order
        let permit = self.write_permit().await;
        let txn = self.db.begin().await.context("begin transaction failed")?;
        Ok(Box::new(SeaOrmUnitOfWork {
            txn,
            _permit: permit,
        }))
    }

    async fn find_progress(&self, user_id: Uuid) -> anyhow::Result<Option<ProgressRecord>> {
        let found = user_progress::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .context("find_progress failed")?;
        found.map(progress_from_entity).transpose()
    }

    async fn insert_progress(&self, record: &ProgressRecord) -> anyhow::Result<InsertOutcome> {
        let _permit = self.write_permit().await;
        let rows = user_progress::Entity::insert(progress_to_active(record))
            .on_conflict(
                OnConflict::column(user_progress::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .context("insert_progress failed")?;
        Ok(outcome(rows))
    }

    async fn waste_breakdown(&self, user_id: Uuid) -> anyhow::Result<Vec<WasteTypeTotal>> {
        let rows: Vec<(String, Option<f64>)> = progress_transaction::Entity::find()
            .select_only()
            .column(progress_transaction::Column::Category)
            .column_as(
                Expr::col(progress_transaction::Column::WeightKg).sum(),
                "weight_kg",
            )
            .filter(progress_transaction::Column::UserId.eq(user_id))
            .group_by(progress_transaction::Column::Category)
            .into_tuple()
            .all(&self.db)
            .await
            .context("waste_breakdown failed")?;

        let mut totals: Vec<WasteTypeTotal> = rows
            .into_iter()
            .map(|(category, weight)| WasteTypeTotal {
                category,
                weight_kg: weight.unwrap_or(0.0),
            })
            .collect();
        totals.sort_by(|a, b| {
            b.weight_kg
                .total_cmp(&a.weight_kg)
                .then_with(|| a.category.cmp(&b.category))
        });
        Ok(totals)
    }

    async fn find_reward(&self, reward_id: Uuid) -> anyhow::Result<Option<Reward>> {
        let found = reward::Entity::find_by_id(reward_id)
            .find_also_related(reward_redemption::Entity)
            .one(&self.db)
            .await
            .context("find_reward failed")?;
        found
            .map(|(r, redemption)| reward_from_entity(r, redemption))
            .transpose()
    }

    async fn first_submission_reward(&self, user_id: Uuid) -> anyhow::Result<Option<Reward>> {
        let found = reward::Entity::find()
            .filter(reward::Column::UserId.eq(user_id))
            .filter(reward::Column::Kind.eq(RewardKind::FirstSubmission.as_str()))
            .order_by_asc(reward::Column::CreatedAt)
            .find_also_related(reward_redemption::Entity)
            .one(&self.db)
            .await
            .context("first_submission_reward failed")?;
        found
            .map(|(r, redemption)| reward_from_entity(r, redemption))
            .transpose()
    }

    async fn list_rewards(
        &self,
        user_id: Uuid,
        filter: RewardStatusFilter,
        now: DateTime<Utc>,
        offset: u64,
        limit: u64,
    ) -> anyhow::Result<(Vec<Reward>, u64)> {
        let query = filtered_rewards(user_id, filter, now);

        let total = query
            .clone()
            .count(&self.db)
            .await
            .context("list_rewards count failed")?;

        let rows = query
            .order_by_desc(reward::Column::CreatedAt)
            .order_by_desc(reward::Column::Id)
            .offset(offset)
            .limit(limit)
            .find_also_related(reward_redemption::Entity)
            .all(&self.db)
            .await
            .context("list_rewards failed")?;

        let items = rows
            .into_iter()
            .map(|(r, redemption)| reward_from_entity(r, redemption))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok((items, total))
    }

    async fn all_rewards(&self, user_id: Uuid) -> anyhow::Result<Vec<Reward>> {
        let rows = reward::Entity::find()
            .filter(reward::Column::UserId.eq(user_id))
            .order_by_desc(reward::Column::CreatedAt)
            .find_also_related(reward_redemption::Entity)
            .all(&self.db)
            .await
            .context("all_rewards failed")?;
        rows.into_iter()
            .map(|(r, redemption)| reward_from_entity(r, redemption))
            .collect()
    }

    async fn insert_redemption(
        &self,
        reward_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> anyhow::Result<InsertOutcome> {
        let _permit = self.write_permit().await;
        let am = reward_redemption::ActiveModel {
            reward_id: Set(reward_id),
            user_id: Set(user_id),
            redeemed_at: Set(at),
        };
        let rows = reward_redemption::Entity::insert(am)
            .on_conflict(
                OnConflict::column(reward_redemption::Column::RewardId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .context("insert_redemption failed")?;
        Ok(outcome(rows))
    }
}

/// One open database transaction.
pub struct SeaOrmUnitOfWork {
    txn: DatabaseTransaction,
    // Declared after `txn`: released only once the transaction is finished
    _permit: Option<OwnedMutexGuard<()>>,
}

#[async_trait::async_trait]
impl RewardsUnitOfWork for SeaOrmUnitOfWork {
    async fn lock_progress(&self, user_id: Uuid) -> anyhow::Result<Option<ProgressRecord>> {
        // SELECT .. FOR UPDATE on Postgres; SQLite already serializes writers
        let found = user_progress::Entity::find_by_id(user_id)
            .lock_exclusive()
            .one(&self.txn)
            .await
            .context("lock_progress failed")?;
        found.map(progress_from_entity).transpose()
    }

    async fn find_transaction(
        &self,
        pickup_id: &str,
    ) -> anyhow::Result<Option<TransactionRecord>> {
        let found = progress_transaction::Entity::find()
            .filter(progress_transaction::Column::PickupId.eq(pickup_id))
            .one(&self.txn)
            .await
            .context("find_transaction failed")?;
        Ok(found.map(transaction_from_entity))
    }

    async fn insert_transaction(
        &self,
        record: &TransactionRecord,
    ) -> anyhow::Result<InsertOutcome> {
        let rows = progress_transaction::Entity::insert(transaction_to_active(record))
            .on_conflict(
                OnConflict::column(progress_transaction::Column::PickupId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.txn)
            .await
            .context("insert_transaction failed")?;
        Ok(outcome(rows))
    }

    async fn total_waste(&self, user_id: Uuid) -> anyhow::Result<f64> {
        total_waste(&self.txn, user_id).await
    }

    async fn save_progress(&self, record: &ProgressRecord) -> anyhow::Result<()> {
        let _ = progress_to_active(record)
            .update(&self.txn)
            .await
            .context("save_progress failed")?;
        Ok(())
    }

    async fn coupon_code_exists(&self, code: &str) -> anyhow::Result<bool> {
        let count = reward::Entity::find()
            .filter(reward::Column::CouponCode.eq(code))
            .count(&self.txn)
            .await
            .context("coupon_code_exists failed")?;
        Ok(count > 0)
    }

    async fn insert_reward(&self, r: &Reward) -> anyhow::Result<()> {
        reward::Entity::insert(reward_to_active(r))
            .exec_without_returning(&self.txn)
            .await
            .context("insert_reward failed")?;
        Ok(())
    }

    async fn claim_spin(&self, user_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<bool> {
        let res = user_progress::Entity::update_many()
            .col_expr(user_progress::Column::WheelSpunThisCycle, Expr::value(true))
            .col_expr(user_progress::Column::CycleProgress, Expr::value(0.0_f64))
            .col_expr(user_progress::Column::UpdatedAt, Expr::value(at))
            .filter(user_progress::Column::UserId.eq(user_id))
            .filter(user_progress::Column::WheelSpunThisCycle.eq(false))
            .filter(user_progress::Column::SubmissionCount.gt(0))
            .exec(&self.txn)
            .await
            .context("claim_spin failed")?;
        Ok(res.rows_affected == 1)
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        self.txn.commit().await.context("commit failed")
    }
}

fn outcome(rows_affected: u64) -> InsertOutcome {
    if rows_affected == 0 {
        InsertOutcome::Duplicate
    } else {
        InsertOutcome::Inserted
    }
}

async fn total_waste<C>(conn: &C, user_id: Uuid) -> anyhow::Result<f64>
where
    C: ConnectionTrait,
{
    let sum: Option<Option<f64>> = progress_transaction::Entity::find()
        .select_only()
        .column_as(
            Expr::col(progress_transaction::Column::WeightKg).sum(),
            "total",
        )
        .filter(progress_transaction::Column::UserId.eq(user_id))
        .into_tuple()
        .one(conn)
        .await
        .context("total_waste failed")?;
    Ok(sum.flatten().unwrap_or(0.0))
}

/// Rewards of one user narrowed by derived status.
fn filtered_rewards(
    user_id: Uuid,
    filter: RewardStatusFilter,
    now: DateTime<Utc>,
) -> Select<reward::Entity> {
    let redeemed_ids = Query::select()
        .column(reward_redemption::Column::RewardId)
        .from(reward_redemption::Entity)
        .to_owned();

    let status = match filter {
        RewardStatusFilter::All => Condition::all(),
        RewardStatusFilter::Redeemed => {
            Condition::all().add(reward::Column::Id.in_subquery(redeemed_ids))
        }
        RewardStatusFilter::Active => Condition::all()
            .add(reward::Column::Id.not_in_subquery(redeemed_ids))
            .add(reward::Column::ExpiresAt.gt(now)),
        RewardStatusFilter::Expired => Condition::all()
            .add(reward::Column::Id.not_in_subquery(redeemed_ids))
            .add(reward::Column::ExpiresAt.lte(now)),
    };

    reward::Entity::find()
        .filter(reward::Column::UserId.eq(user_id))
        .filter(status)
}
