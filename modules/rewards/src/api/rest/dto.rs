use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::contract::model::{
    LevelProgress, PointsQuote, Prize, ProgressSnapshot, Reward, RewardPage, RewardStats,
    SpinOutcome, Submission, SubmissionOutcome,
};
use crate::domain::events::RewardsDomainEvent;

/// Pickup credited to the caller
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPickupReq {
    pub pickup_id: String,
    /// Kilograms; numeric strings are accepted too.
    #[serde(deserialize_with = "number_or_string")]
    #[schema(value_type = f64)]
    pub weight: f64,
    #[serde(default)]
    pub category: Option<String>,
}

impl From<SubmitPickupReq> for Submission {
    fn from(req: SubmitPickupReq) -> Self {
        Self {
            pickup_id: req.pickup_id,
            category: req.category,
            weight_kg: req.weight,
        }
    }
}

/// Optional client-declared wheel result
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WheelRewardReq {
    #[serde(rename = "type", default)]
    pub prize_type: Option<String>,
    #[serde(default)]
    pub value: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct QuoteQuery {
    pub weight: f64,
    pub category: Option<String>,
    /// `submitter` (default) or `collector`
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ListRewardsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// `all`, `active`, `expired` or `redeemed`
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrizeDto {
    #[serde(rename = "type")]
    pub prize_type: String,
    pub value: u32,
}

impl From<Prize> for PrizeDto {
    fn from(p: Prize) -> Self {
        Self {
            prize_type: p.prize_type.as_str().to_string(),
            value: p.value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardDto {
    pub id: Uuid,
    /// `level_up`, `first_submission` or `spin_prize`
    pub kind: String,
    pub title: String,
    pub description: String,
    pub coupon_code: String,
    pub discount: String,
    pub partner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize: Option<PrizeDto>,
    /// `active`, `expired` or `redeemed`
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl RewardDto {
    /// Status is derived against `now`, it is not stored.
    pub fn at(r: Reward, now: DateTime<Utc>) -> Self {
        let status = r.status_at(now).as_str().to_string();
        Self {
            id: r.id,
            kind: r.kind.as_str().to_string(),
            title: r.title,
            description: r.description,
            coupon_code: r.coupon_code,
            discount: r.discount,
            partner: r.partner,
            level: r.level,
            prize: r.prize.map(PrizeDto::from),
            status,
            created_at: r.created_at,
            expires_at: r.expires_at,
            redeemed_at: r.redeemed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResultDto {
    pub total_waste: f64,
    pub total_points: i64,
    pub earned_points: i64,
    pub can_spin: bool,
    pub current_level: u8,
    pub cycle_progress: f64,
    pub wheel_spun_this_cycle: bool,
    /// True when the pickup had already been credited
    pub replayed: bool,
    pub issued_rewards: Vec<RewardDto>,
}

impl SubmissionResultDto {
    pub fn at(o: SubmissionOutcome, now: DateTime<Utc>) -> Self {
        Self {
            total_waste: o.total_waste,
            total_points: o.total_points,
            earned_points: o.earned_points,
            can_spin: o.can_spin,
            current_level: o.current_level,
            cycle_progress: o.cycle_progress,
            wheel_spun_this_cycle: o.wheel_spun_this_cycle,
            replayed: o.replayed,
            issued_rewards: o
                .issued_rewards
                .into_iter()
                .map(|r| RewardDto::at(r, now))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgressDto {
    pub level: u8,
    pub floor: i64,
    pub next_threshold: Option<i64>,
    /// 0.0..=1.0 towards the next threshold
    pub progress: f64,
}

impl From<LevelProgress> for LevelProgressDto {
    fn from(l: LevelProgress) -> Self {
        Self {
            level: l.level,
            floor: l.floor,
            next_threshold: l.next_threshold,
            progress: l.progress,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FirstTimeCouponDto {
    pub reward_id: Uuid,
    pub code: String,
    pub discount: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDto {
    pub total_waste: f64,
    pub total_points: i64,
    pub current_level: u8,
    pub cycle_progress: f64,
    pub wheel_spun_this_cycle: bool,
    pub can_spin: bool,
    pub submission_count: i64,
    /// Category -> kilograms
    pub waste_types: BTreeMap<String, f64>,
    pub level_progress: LevelProgressDto,
    pub first_time_coupon: Option<FirstTimeCouponDto>,
}

impl From<ProgressSnapshot> for ProgressDto {
    fn from(s: ProgressSnapshot) -> Self {
        Self {
            total_waste: s.total_waste,
            total_points: s.total_points,
            current_level: s.current_level,
            cycle_progress: s.cycle_progress,
            wheel_spun_this_cycle: s.wheel_spun_this_cycle,
            can_spin: s.can_spin,
            submission_count: s.submission_count,
            waste_types: s
                .waste_types
                .into_iter()
                .map(|w| (w.category, w.weight_kg))
                .collect(),
            level_progress: s.level_progress.into(),
            first_time_coupon: s.first_time_coupon.map(|r| FirstTimeCouponDto {
                reward_id: r.id,
                code: r.coupon_code,
                discount: r.discount,
                expires_at: r.expires_at,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpinResultDto {
    pub reward: RewardDto,
    pub prize: PrizeDto,
}

impl SpinResultDto {
    pub fn at(o: SpinOutcome, now: DateTime<Utc>) -> Self {
        Self {
            reward: RewardDto::at(o.reward, now),
            prize: o.prize.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuoteDto {
    pub points: i64,
    pub earnings: i64,
}

impl From<PointsQuote> for QuoteDto {
    fn from(q: PointsQuote) -> Self {
        Self {
            points: q.points,
            earnings: q.earnings,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RewardPageDto {
    pub items: Vec<RewardDto>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

impl RewardPageDto {
    pub fn at(p: RewardPage, now: DateTime<Utc>) -> Self {
        Self {
            items: p.items.into_iter().map(|r| RewardDto::at(r, now)).collect(),
            page: p.page,
            limit: p.limit,
            total: p.total,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardStatsDto {
    pub total: u64,
    pub active: u64,
    pub redeemed: u64,
    pub expired: u64,
    pub by_kind: BTreeMap<String, u64>,
}

impl From<RewardStats> for RewardStatsDto {
    fn from(s: RewardStats) -> Self {
        Self {
            total: s.total,
            active: s.active,
            redeemed: s.redeemed,
            expired: s.expired,
            by_kind: s
                .by_kind
                .into_iter()
                .map(|(k, n)| (k.as_str().to_string(), n))
                .collect(),
        }
    }
}

/// Transport-level SSE payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(title = "RewardEvent", description = "Server-sent progress/reward event")]
pub struct RewardEvent {
    /// `submission_applied`, `level_up`, `reward_issued`, `spin_claimed` or `reward_redeemed`
    pub kind: String,
    pub user_id: Uuid,
    #[schema(format = "date-time")]
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_points: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize: Option<PrizeDto>,
}

impl RewardEvent {
    fn bare(kind: &str, user_id: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            kind: kind.to_string(),
            user_id,
            at,
            pickup_id: None,
            points: None,
            total_points: None,
            level: None,
            reward_id: None,
            reward_kind: None,
            prize: None,
        }
    }
}

impl From<&RewardsDomainEvent> for RewardEvent {
    fn from(e: &RewardsDomainEvent) -> Self {
        use RewardsDomainEvent::*;
        match e {
            SubmissionApplied {
                user_id,
                pickup_id,
                points,
                total_points,
                at,
            } => Self {
                pickup_id: Some(pickup_id.clone()),
                points: Some(*points),
                total_points: Some(*total_points),
                ..Self::bare("submission_applied", *user_id, *at)
            },
            LevelUp { user_id, to, at, .. } => Self {
                level: Some(*to),
                ..Self::bare("level_up", *user_id, *at)
            },
            RewardIssued {
                user_id,
                reward_id,
                kind,
                at,
            } => Self {
                reward_id: Some(*reward_id),
                reward_kind: Some(kind.as_str().to_string()),
                ..Self::bare("reward_issued", *user_id, *at)
            },
            SpinClaimed { user_id, prize, at } => Self {
                prize: Some((*prize).into()),
                ..Self::bare("spin_claimed", *user_id, *at)
            },
            RewardRedeemed {
                user_id,
                reward_id,
                at,
            } => Self {
                reward_id: Some(*reward_id),
                ..Self::bare("reward_redeemed", *user_id, *at)
            },
        }
    }
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid weight '{s}'"))),
    }
}
