//! Reward templates and coupon code generation.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::contract::model::{Prize, PrizeType, Reward, RewardKind};

/// Crockford base32: no I, L, O, U.
const TOKEN_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
pub const TOKEN_LEN: usize = 10;

/// Wording and lifetime of issued coupons.
#[derive(Debug, Clone)]
pub struct CouponPolicy {
    pub ttl: Duration,
    pub partner: String,
    pub currency: String,
    pub level_discount_per_level: u32,
    pub first_submission_discount: u32,
}

impl Default for CouponPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::days(30),
            partner: "Clean Green App".to_string(),
            currency: "₹".to_string(),
            level_discount_per_level: 10,
            first_submission_discount: 50,
        }
    }
}

/// Everything about a reward except its identity, code and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardDraft {
    pub kind: RewardKind,
    pub title: String,
    pub description: String,
    pub discount: String,
    pub level: Option<u8>,
    pub prize: Option<Prize>,
}

impl CouponPolicy {
    pub fn level_up(&self, level: u8) -> RewardDraft {
        let amount = u32::from(level) * self.level_discount_per_level;
        RewardDraft {
            kind: RewardKind::LevelUp,
            title: format!("Level {level} Achievement"),
            description: format!("Congratulations! You've reached Level {level}!"),
            discount: format!("{}{amount} OFF", self.currency),
            level: Some(level),
            prize: None,
        }
    }

    pub fn first_submission(&self) -> RewardDraft {
        RewardDraft {
            kind: RewardKind::FirstSubmission,
            title: "First-Time Pickup Coupon".to_string(),
            description: "Congratulations on your first waste submission!".to_string(),
            discount: format!("{}{} OFF", self.currency, self.first_submission_discount),
            level: None,
            prize: None,
        }
    }

    pub fn spin_prize(&self, prize: Prize) -> RewardDraft {
        let c = &self.currency;
        let v = prize.value;
        let (label, discount) = match prize.prize_type {
            PrizeType::Plant => ("1 Plant".to_string(), "1 Plant".to_string()),
            PrizeType::Seeds => (format!("{v} Seeds"), format!("{v} Seeds")),
            PrizeType::Vermicompost => (format!("{v} Vermicompost"), format!("{v} Vermicompost")),
            PrizeType::Cashback => (format!("{c}{v} Cashback"), format!("{c}{v} Cashback")),
            PrizeType::Coupon => (format!("{c}{v} Coupon"), format!("{c}{v} OFF")),
            PrizeType::Gift => ("1 Gift".to_string(), "1 Gift".to_string()),
        };
        let title = match prize.prize_type {
            PrizeType::Plant => "Spin Win: Plant".to_string(),
            PrizeType::Seeds => "Spin Win: Seeds".to_string(),
            PrizeType::Vermicompost => "Spin Win: Vermicompost".to_string(),
            PrizeType::Gift => "Spin Win: Gift".to_string(),
            PrizeType::Cashback | PrizeType::Coupon => format!("Spin Win: {label}"),
        };
        RewardDraft {
            kind: RewardKind::SpinPrize,
            title,
            description: format!("You won: {label}"),
            discount,
            level: None,
            prize: Some(prize),
        }
    }

    /// Turn a draft into a reward owned by `user_id`, valid from `now` for `ttl`.
    pub fn finalize(
        &self,
        draft: RewardDraft,
        user_id: Uuid,
        coupon_code: String,
        now: DateTime<Utc>,
    ) -> Reward {
        Reward {
            id: Uuid::new_v4(),
            user_id,
            kind: draft.kind,
            title: draft.title,
            description: draft.description,
            coupon_code,
            discount: draft.discount,
            partner: self.partner.clone(),
            level: draft.level,
            prize: draft.prize,
            created_at: now,
            expires_at: now + self.ttl,
            redeemed_at: None,
        }
    }
}

/// Code prefix identifying the reward kind, e.g. `LVL3`, `FIRST`, `SPIN`.
pub fn code_prefix(draft: &RewardDraft) -> String {
    match (draft.kind, draft.level) {
        (RewardKind::LevelUp, Some(level)) => format!("LVL{level}"),
        (RewardKind::LevelUp, None) => "LVL".to_string(),
        (RewardKind::FirstSubmission, _) => "FIRST".to_string(),
        (RewardKind::SpinPrize, _) => "SPIN".to_string(),
    }
}

pub fn random_token<R: Rng>(rng: &mut R) -> String {
    (0..TOKEN_LEN)
        .map(|_| char::from(TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())]))
        .collect()
}

/// Fresh candidate code. The thread RNG is seeded from the OS.
pub fn new_coupon_code(draft: &RewardDraft) -> String {
    format!("{}-{}", code_prefix(draft), random_token(&mut rand::rng()))
}
