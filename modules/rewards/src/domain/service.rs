use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::{
    PointsQuote, Prize, ProgressSnapshot, Reward, RewardPage, RewardStats, RewardStatus,
    RewardStatusFilter, SpinOutcome, Submission, SubmissionOutcome, WasteRole,
};
use crate::domain::coupon::{new_coupon_code, CouponPolicy, RewardDraft};
use crate::domain::error::DomainError;
use crate::domain::events::RewardsDomainEvent;
use crate::domain::level::{level_progress, resolve_level};
use crate::domain::locks::UserLocks;
use crate::domain::points::PointsPolicy;
use crate::domain::ports::EventPublisher;
use crate::domain::repo::{
    InsertOutcome, ProgressRecord, RewardsStore, RewardsUnitOfWork, TransactionRecord,
};
use crate::domain::spin::SpinResolver;
use crate::domain::validation::validate_submission;

/// Domain service: progress ledger, reward issuing, spin wheel and reward catalogue.
/// Depends only on the store and publisher ports, not on infra types.
pub struct Service {
    store: Arc<dyn RewardsStore>,
    events: Arc<dyn EventPublisher<RewardsDomainEvent>>,
    spin: SpinResolver,
    locks: UserLocks,
    config: ServiceConfig,
}

/// Configuration for the domain service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub points: PointsPolicy,
    pub coupons: CouponPolicy,
    pub max_weight_kg: f64,
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// Fresh codes tried before giving up on a coupon.
    pub coupon_code_attempts: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            points: PointsPolicy::default(),
            coupons: CouponPolicy::default(),
            max_weight_kg: 500.0,
            default_page_size: 20,
            max_page_size: 100,
            coupon_code_attempts: 5,
        }
    }
}

impl Service {
    /// Create a service with dependencies.
    pub fn new(
        store: Arc<dyn RewardsStore>,
        events: Arc<dyn EventPublisher<RewardsDomainEvent>>,
        spin: SpinResolver,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            events,
            spin,
            locks: UserLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Users with an in-flight mutating call.
    pub fn locked_users(&self) -> usize {
        self.locks.len()
    }

    /// Pure preview of what a pickup would earn.
    pub fn quote(&self, category: Option<&str>, weight_kg: f64, role: WasteRole) -> PointsQuote {
        self.config.points.compute(category, weight_kg, role)
    }

    #[instrument(name = "rewards.service.enroll_user", skip(self), fields(user_id = %user_id))]
    pub async fn enroll_user(&self, user_id: Uuid) -> Result<ProgressSnapshot, DomainError> {
        let record = ProgressRecord::enrolled(user_id, Utc::now());
        match self.store.insert_progress(&record).await? {
            InsertOutcome::Inserted => info!("Enrolled user"),
            InsertOutcome::Duplicate => debug!("User already enrolled"),
        }
        self.get_snapshot(user_id).await
    }

    #[instrument(name = "rewards.service.get_snapshot", skip(self), fields(user_id = %user_id))]
    pub async fn get_snapshot(&self, user_id: Uuid) -> Result<ProgressSnapshot, DomainError> {
        debug!("Loading progress snapshot");

        let progress = self
            .store
            .find_progress(user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(user_id))?;
        let waste_types = self.store.waste_breakdown(user_id).await?;
        let first_time_coupon = self
            .store
            .first_submission_reward(user_id)
            .await?
            .filter(|r| r.redeemed_at.is_none());

        let total_waste = waste_types.iter().map(|w| w.weight_kg).sum();
        Ok(ProgressSnapshot {
            user_id,
            total_points: progress.total_points,
            current_level: progress.current_level,
            cycle_progress: progress.cycle_progress,
            wheel_spun_this_cycle: progress.wheel_spun_this_cycle,
            can_spin: progress.can_spin(),
            submission_count: progress.submission_count,
            total_waste,
            waste_types,
            level_progress: level_progress(progress.total_points),
            first_time_coupon,
        })
    }

    #[instrument(
        name = "rewards.service.apply_submission",
        skip(self, submission),
        fields(user_id = %user_id, pickup_id = %submission.pickup_id)
    )]
    pub async fn apply_submission(
        &self,
        user_id: Uuid,
        submission: Submission,
    ) -> Result<SubmissionOutcome, DomainError> {
        let submission = validate_submission(submission, self.config.max_weight_kg)?;

        let _guard = self.locks.acquire(user_id).await;
        let uow = self.store.begin().await?;

        let progress = uow
            .lock_progress(user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(user_id))?;

        if let Some(existing) = uow.find_transaction(&submission.pickup_id).await? {
            return self.replay(uow.as_ref(), &progress, &existing).await;
        }

        let now = Utc::now();
        let quote = self.config.points.compute(
            Some(&submission.category),
            submission.weight_kg,
            WasteRole::Submitter,
        );
        let record = TransactionRecord {
            id: Uuid::new_v4(),
            user_id,
            pickup_id: submission.pickup_id.clone(),
            points_awarded: quote.points,
            category: submission.category.clone(),
            weight_kg: submission.weight_kg,
            created_at: now,
        };

        if uow.insert_transaction(&record).await? == InsertOutcome::Duplicate {
            // Lost a race with another writer of the same pickup
            let existing = uow
                .find_transaction(&submission.pickup_id)
                .await?
                .ok_or_else(|| DomainError::database("pickup conflict without a stored row"))?;
            return self.replay(uow.as_ref(), &progress, &existing).await;
        }

        let mut next = progress.clone();
        next.total_points = next
            .total_points
            .checked_add(quote.points)
            .ok_or_else(|| DomainError::database("total_points overflow"))?;
        next.cycle_progress += submission.weight_kg;
        next.submission_count += 1;
        next.wheel_spun_this_cycle = false;
        next.updated_at = now;

        let mut events = vec![RewardsDomainEvent::SubmissionApplied {
            user_id,
            pickup_id: record.pickup_id.clone(),
            points: quote.points,
            total_points: next.total_points,
            at: now,
        }];
        let mut issued = Vec::new();

        let new_level = resolve_level(next.total_points);
        if new_level > progress.current_level {
            next.current_level = new_level;
            // One coupon for the level reached, however many levels were crossed
            let reward = self
                .issue(uow.as_ref(), self.config.coupons.level_up(new_level), user_id, now)
                .await?;
            events.push(RewardsDomainEvent::LevelUp {
                user_id,
                from: progress.current_level,
                to: new_level,
                at: now,
            });
            issued.push(reward);
        }

        if progress.submission_count == 0 && !progress.first_pickup_coupon_used {
            let reward = self
                .issue(uow.as_ref(), self.config.coupons.first_submission(), user_id, now)
                .await?;
            next.first_pickup_coupon_used = true;
            issued.push(reward);
        }

        uow.save_progress(&next).await?;
        let total_waste = uow.total_waste(user_id).await?;
        uow.commit().await?;

        events.extend(issued.iter().map(|r| RewardsDomainEvent::RewardIssued {
            user_id,
            reward_id: r.id,
            kind: r.kind,
            at: now,
        }));
        self.publish_all(&events);

        info!(
            points = quote.points,
            total_points = next.total_points,
            level = next.current_level,
            rewards = issued.len(),
            "Applied submission"
        );

        Ok(SubmissionOutcome {
            total_points: next.total_points,
            current_level: next.current_level,
            cycle_progress: next.cycle_progress,
            wheel_spun_this_cycle: next.wheel_spun_this_cycle,
            can_spin: next.can_spin(),
            earned_points: quote.points,
            total_waste,
            replayed: false,
            issued_rewards: issued,
        })
    }

    /// Answer a repeated pickup from stored state. The unit of work is dropped
    /// by the caller without commit.
    async fn replay(
        &self,
        uow: &dyn RewardsUnitOfWork,
        progress: &ProgressRecord,
        existing: &TransactionRecord,
    ) -> Result<SubmissionOutcome, DomainError> {
        if existing.user_id != progress.user_id {
            warn!(owner = %existing.user_id, "Pickup already credited to another user");
            return Err(DomainError::pickup_conflict(existing.pickup_id.clone()));
        }

        info!(points = existing.points_awarded, "Replayed submission");
        let total_waste = uow.total_waste(progress.user_id).await?;
        Ok(SubmissionOutcome {
            total_points: progress.total_points,
            current_level: progress.current_level,
            cycle_progress: progress.cycle_progress,
            wheel_spun_this_cycle: progress.wheel_spun_this_cycle,
            can_spin: progress.can_spin(),
            earned_points: existing.points_awarded,
            total_waste,
            replayed: true,
            issued_rewards: Vec::new(),
        })
    }

    #[instrument(name = "rewards.service.claim_spin", skip(self), fields(user_id = %user_id))]
    pub async fn claim_spin(
        &self,
        user_id: Uuid,
        declared: Option<Prize>,
    ) -> Result<SpinOutcome, DomainError> {
        if declared.is_some_and(|p| p.value == 0) {
            return Err(DomainError::validation("value", "must be greater than 0"));
        }
        let prize = self.spin.resolve(declared)?;

        let _guard = self.locks.acquire(user_id).await;
        let uow = self.store.begin().await?;
        let now = Utc::now();

        if !uow.claim_spin(user_id, now).await? {
            return match uow.lock_progress(user_id).await? {
                None => Err(DomainError::user_not_found(user_id)),
                Some(p) => {
                    let reason = if p.submission_count == 0 {
                        "no submission yet"
                    } else {
                        "wheel already spun this cycle"
                    };
                    warn!(reason, "Spin rejected");
                    Err(DomainError::not_eligible(reason))
                }
            };
        }

        let reward = self
            .issue(uow.as_ref(), self.config.coupons.spin_prize(prize), user_id, now)
            .await?;
        uow.commit().await?;

        self.publish_all(&[
            RewardsDomainEvent::SpinClaimed {
                user_id,
                prize,
                at: now,
            },
            RewardsDomainEvent::RewardIssued {
                user_id,
                reward_id: reward.id,
                kind: reward.kind,
                at: now,
            },
        ]);

        info!(prize = %prize.prize_type, value = prize.value, "Spin claimed");
        Ok(SpinOutcome { prize, reward })
    }

    #[instrument(
        name = "rewards.service.list_rewards",
        skip(self),
        fields(user_id = %user_id)
    )]
    pub async fn list_rewards(
        &self,
        user_id: Uuid,
        status: RewardStatusFilter,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<RewardPage, DomainError> {
        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(DomainError::validation("page", "must be at least 1"));
        }
        let limit = limit.unwrap_or(self.config.default_page_size);
        if limit == 0 || limit > self.config.max_page_size {
            return Err(DomainError::validation(
                "limit",
                format!("must be between 1 and {}", self.config.max_page_size),
            ));
        }

        let offset = u64::from(page - 1) * u64::from(limit);
        let (items, total) = self
            .store
            .list_rewards(user_id, status, Utc::now(), offset, u64::from(limit))
            .await?;

        debug!("Listed {} of {} rewards", items.len(), total);
        Ok(RewardPage {
            items,
            page,
            limit,
            total,
        })
    }

    #[instrument(name = "rewards.service.reward_stats", skip(self), fields(user_id = %user_id))]
    pub async fn reward_stats(&self, user_id: Uuid) -> Result<RewardStats, DomainError> {
        let rewards = self.store.all_rewards(user_id).await?;
        Ok(summarize(&rewards, Utc::now()))
    }

    #[instrument(
        name = "rewards.service.redeem_reward",
        skip(self),
        fields(user_id = %user_id, reward_id = %reward_id)
    )]
    pub async fn redeem_reward(&self, user_id: Uuid, reward_id: Uuid) -> Result<Reward, DomainError> {
        let reward = self
            .store
            .find_reward(reward_id)
            .await?
            .filter(|r| r.user_id == user_id)
            .ok_or_else(|| DomainError::reward_not_found(reward_id))?;

        let now = Utc::now();
        match reward.status_at(now) {
            RewardStatus::Redeemed => return Err(DomainError::not_eligible("reward already redeemed")),
            RewardStatus::Expired => return Err(DomainError::not_eligible("reward has expired")),
            RewardStatus::Active => {}
        }

        if self.store.insert_redemption(reward_id, user_id, now).await? == InsertOutcome::Duplicate {
            warn!("Concurrent redemption lost");
            return Err(DomainError::not_eligible("reward already redeemed"));
        }

        self.events.publish(&RewardsDomainEvent::RewardRedeemed {
            user_id,
            reward_id,
            at: now,
        });
        info!("Redeemed reward");
        Ok(Reward {
            redeemed_at: Some(now),
            ..reward
        })
    }

    // --- helpers ---

    async fn issue(
        &self,
        uow: &dyn RewardsUnitOfWork,
        draft: RewardDraft,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Reward, DomainError> {
        let code = self.unique_code(uow, &draft).await?;
        let reward = self.config.coupons.finalize(draft, user_id, code, now);
        uow.insert_reward(&reward).await?;
        debug!(kind = %reward.kind, code = %reward.coupon_code, "Issued reward");
        Ok(reward)
    }

    async fn unique_code(
        &self,
        uow: &dyn RewardsUnitOfWork,
        draft: &RewardDraft,
    ) -> Result<String, DomainError> {
        for attempt in 1..=self.config.coupon_code_attempts.max(1) {
            let code = new_coupon_code(draft);
            if !uow.coupon_code_exists(&code).await? {
                return Ok(code);
            }
            warn!(attempt, "Coupon code collision");
        }
        Err(DomainError::database("could not generate a unique coupon code"))
    }

    fn publish_all(&self, events: &[RewardsDomainEvent]) {
        for e in events {
            self.events.publish(e);
        }
    }
}

/// Count rewards per derived status and per kind.
pub fn summarize(rewards: &[Reward], now: DateTime<Utc>) -> RewardStats {
    let mut stats = RewardStats::default();
    for r in rewards {
        stats.total += 1;
        match r.status_at(now) {
            RewardStatus::Active => stats.active += 1,
            RewardStatus::Expired => stats.expired += 1,
            RewardStatus::Redeemed => stats.redeemed += 1,
        }
        *stats.by_kind.entry(r.kind).or_insert(0) += 1;
    }
    stats
}
