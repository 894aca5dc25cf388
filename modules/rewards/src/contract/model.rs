use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Who earns from a submission: the user handing in waste or the agent collecting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WasteRole {
    #[default]
    Submitter,
    Collector,
}

impl FromStr for WasteRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "submitter" | "user" => Ok(Self::Submitter),
            "collector" | "agent" => Ok(Self::Collector),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Result of the points calculator. Exactly one of the two is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointsQuote {
    pub points: i64,
    pub earnings: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RewardKind {
    LevelUp,
    FirstSubmission,
    SpinPrize,
}

impl RewardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LevelUp => "level_up",
            Self::FirstSubmission => "first_submission",
            Self::SpinPrize => "spin_prize",
        }
    }
}

impl fmt::Display for RewardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "level_up" => Ok(Self::LevelUp),
            "first_submission" => Ok(Self::FirstSubmission),
            "spin_prize" => Ok(Self::SpinPrize),
            other => Err(format!("unknown reward kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrizeType {
    Plant,
    Seeds,
    Vermicompost,
    Cashback,
    Coupon,
    Gift,
}

impl PrizeType {
    pub const ALL: [PrizeType; 6] = [
        Self::Plant,
        Self::Seeds,
        Self::Vermicompost,
        Self::Cashback,
        Self::Coupon,
        Self::Gift,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plant => "plant",
            Self::Seeds => "seeds",
            Self::Vermicompost => "vermicompost",
            Self::Cashback => "cashback",
            Self::Coupon => "coupon",
            Self::Gift => "gift",
        }
    }
}

impl fmt::Display for PrizeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrizeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| format!("unknown prize type '{s}'"))
    }
}

/// A spin-wheel prize: its type and quantity/amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Prize {
    pub prize_type: PrizeType,
    pub value: u32,
}

/// Derived lifecycle state of an issued reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardStatus {
    Active,
    Expired,
    Redeemed,
}

impl RewardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Redeemed => "redeemed",
        }
    }
}

/// An issued coupon. Immutable once stored; redemption is tracked separately.
#[derive(Debug, Clone, PartialEq)]
pub struct Reward {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: RewardKind,
    pub title: String,
    pub description: String,
    pub coupon_code: String,
    pub discount: String,
    pub partner: String,
    pub level: Option<u8>,
    pub prize: Option<Prize>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl Reward {
    pub fn status_at(&self, now: DateTime<Utc>) -> RewardStatus {
        if self.redeemed_at.is_some() {
            RewardStatus::Redeemed
        } else if self.expires_at <= now {
            RewardStatus::Expired
        } else {
            RewardStatus::Active
        }
    }
}

/// A completed waste pickup to be credited to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub pickup_id: String,
    pub category: Option<String>,
    pub weight_kg: f64,
}

/// Position of a points total on the level ladder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelProgress {
    pub level: u8,
    /// Threshold the current level started from (0 for level 1).
    pub floor: i64,
    /// `None` at the top level.
    pub next_threshold: Option<i64>,
    /// Fraction of the way from `floor` to `next_threshold`, in [0, 1].
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WasteTypeTotal {
    pub category: String,
    pub weight_kg: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub user_id: Uuid,
    pub total_points: i64,
    pub current_level: u8,
    pub cycle_progress: f64,
    pub wheel_spun_this_cycle: bool,
    pub can_spin: bool,
    pub submission_count: i64,
    pub total_waste: f64,
    pub waste_types: Vec<WasteTypeTotal>,
    pub level_progress: LevelProgress,
    /// The first-submission coupon while it is still unredeemed.
    pub first_time_coupon: Option<Reward>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub total_points: i64,
    pub current_level: u8,
    pub cycle_progress: f64,
    pub wheel_spun_this_cycle: bool,
    pub can_spin: bool,
    /// Points credited by this pickup (the original award on replay).
    pub earned_points: i64,
    pub total_waste: f64,
    /// True when the pickup had already been applied and nothing changed.
    pub replayed: bool,
    pub issued_rewards: Vec<Reward>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpinOutcome {
    pub prize: Prize,
    pub reward: Reward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RewardStatusFilter {
    #[default]
    All,
    Active,
    Expired,
    Redeemed,
}

impl FromStr for RewardStatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "redeemed" | "used" => Ok(Self::Redeemed),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RewardPage {
    pub items: Vec<Reward>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RewardStats {
    pub total: u64,
    pub active: u64,
    pub redeemed: u64,
    pub expired: u64,
    pub by_kind: BTreeMap<RewardKind, u64>,
}
