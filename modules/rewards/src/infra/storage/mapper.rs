use anyhow::{anyhow, Context};
use sea_orm::Set;

use crate::contract::model::{Prize, PrizeType, Reward, RewardKind};
use crate::domain::repo::{ProgressRecord, TransactionRecord};
use crate::infra::storage::entity::{
    progress_transaction, reward, reward_redemption, user_progress,
};

pub fn progress_from_entity(m: user_progress::Model) -> anyhow::Result<ProgressRecord> {
    let current_level = u8::try_from(m.current_level)
        .with_context(|| format!("stored level {} out of range", m.current_level))?;
    Ok(ProgressRecord {
        user_id: m.user_id,
        total_points: m.total_points,
        current_level,
        cycle_progress: m.cycle_progress,
        wheel_spun_this_cycle: m.wheel_spun_this_cycle,
        first_pickup_coupon_used: m.first_pickup_coupon_used,
        submission_count: m.submission_count,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

pub fn progress_to_active(r: &ProgressRecord) -> user_progress::ActiveModel {
    user_progress::ActiveModel {
        user_id: Set(r.user_id),
        total_points: Set(r.total_points),
        current_level: Set(i32::from(r.current_level)),
        cycle_progress: Set(r.cycle_progress),
        wheel_spun_this_cycle: Set(r.wheel_spun_this_cycle),
        first_pickup_coupon_used: Set(r.first_pickup_coupon_used),
        submission_count: Set(r.submission_count),
        created_at: Set(r.created_at),
        updated_at: Set(r.updated_at),
    }
}

pub fn transaction_from_entity(m: progress_transaction::Model) -> TransactionRecord {
    TransactionRecord {
        id: m.id,
        user_id: m.user_id,
        pickup_id: m.pickup_id,
        points_awarded: m.points_awarded,
        category: m.category,
        weight_kg: m.weight_kg,
        created_at: m.created_at,
    }
}

pub fn transaction_to_active(t: &TransactionRecord) -> progress_transaction::ActiveModel {
    progress_transaction::ActiveModel {
        id: Set(t.id),
        user_id: Set(t.user_id),
        pickup_id: Set(t.pickup_id.clone()),
        points_awarded: Set(t.points_awarded),
        category: Set(t.category.clone()),
        weight_kg: Set(t.weight_kg),
        created_at: Set(t.created_at),
    }
}

/// Join a reward row with its optional redemption row.
pub fn reward_from_entity(
    m: reward::Model,
    redemption: Option<reward_redemption::Model>,
) -> anyhow::Result<Reward> {
    let kind = m.kind.parse::<RewardKind>().map_err(|e| anyhow!(e))?;
    let level = m
        .level
        .map(u8::try_from)
        .transpose()
        .context("stored reward level out of range")?;
    let prize = match (m.prize_type, m.prize_value) {
        (Some(t), Some(v)) => Some(Prize {
            prize_type: t.parse::<PrizeType>().map_err(|e| anyhow!(e))?,
            value: u32::try_from(v).context("stored prize value out of range")?,
        }),
        _ => None,
    };
    Ok(Reward {
        id: m.id,
        user_id: m.user_id,
        kind,
        title: m.title,
        description: m.description,
        coupon_code: m.coupon_code,
        discount: m.discount,
        partner: m.partner,
        level,
        prize,
        created_at: m.created_at,
        expires_at: m.expires_at,
        redeemed_at: redemption.map(|r| r.redeemed_at),
    })
}

pub fn reward_to_active(r: &Reward) -> reward::ActiveModel {
    reward::ActiveModel {
        id: Set(r.id),
        user_id: Set(r.user_id),
        kind: Set(r.kind.as_str().to_string()),
        title: Set(r.title.clone()),
        description: Set(r.description.clone()),
        coupon_code: Set(r.coupon_code.clone()),
        discount: Set(r.discount.clone()),
        partner: Set(r.partner.clone()),
        level: Set(r.level.map(i32::from)),
        prize_type: Set(r.prize.map(|p| p.prize_type.as_str().to_string())),
        prize_value: Set(r.prize.map(|p| i64::from(p.value))),
        created_at: Set(r.created_at),
        expires_at: Set(r.expires_at),
    }
}
