use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::contract::model::PrizeType;
use crate::domain::coupon::CouponPolicy;
use crate::domain::points::{default_rates, PointsPolicy};
use crate::domain::service::ServiceConfig;
use crate::domain::spin::{default_prize_table, PrizeEntry, SpinResolver, SpinSelection};

/// Configuration for the rewards module (`modules.rewards` in the app config)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewardsConfig {
    #[serde(default)]
    pub points: PointsConfig,
    #[serde(default)]
    pub coupons: CouponsConfig,
    #[serde(default)]
    pub spin: SpinConfig,
    #[serde(default = "default_max_weight_kg")]
    pub max_weight_kg: f64,
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    #[serde(default = "default_event_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            points: PointsConfig::default(),
            coupons: CouponsConfig::default(),
            spin: SpinConfig::default(),
            max_weight_kg: default_max_weight_kg(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            event_channel_capacity: default_event_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointsConfig {
    /// Category -> points per kg. Replaces the built-in table when given.
    #[serde(default = "default_rates")]
    pub rates: HashMap<String, f64>,
    #[serde(default = "default_rate")]
    pub default_rate: f64,
    #[serde(default = "default_base_points")]
    pub base_points: i64,
    #[serde(default = "default_max_points")]
    pub max_points: i64,
    #[serde(default = "default_base_earnings")]
    pub base_earnings: i64,
    #[serde(default = "default_earnings_per_kg")]
    pub earnings_per_kg: f64,
    #[serde(default = "default_max_earnings")]
    pub max_earnings: i64,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            rates: default_rates(),
            default_rate: default_rate(),
            base_points: default_base_points(),
            max_points: default_max_points(),
            base_earnings: default_base_earnings(),
            earnings_per_kg: default_earnings_per_kg(),
            max_earnings: default_max_earnings(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CouponsConfig {
    /// Lifetime of issued coupons, e.g. "30days".
    #[serde(default = "default_reward_ttl", with = "humantime_serde")]
    pub reward_ttl: Duration,
    #[serde(default = "default_partner")]
    pub partner: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_level_discount")]
    pub level_discount_per_level: u32,
    #[serde(default = "default_first_discount")]
    pub first_submission_discount: u32,
    #[serde(default = "default_code_attempts")]
    pub code_attempts: u32,
}

impl Default for CouponsConfig {
    fn default() -> Self {
        Self {
            reward_ttl: default_reward_ttl(),
            partner: default_partner(),
            currency: default_currency(),
            level_discount_per_level: default_level_discount(),
            first_submission_discount: default_first_discount(),
            code_attempts: default_code_attempts(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    #[default]
    Server,
    Client,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrizeConfig {
    #[serde(rename = "type")]
    pub prize_type: String,
    pub value: u32,
    #[serde(default = "default_prize_weight")]
    pub weight: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpinConfig {
    #[serde(default)]
    pub selection: SelectionMode,
    /// Fixed RNG seed for reproducible draws (tests, demos).
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_prizes")]
    pub prizes: Vec<PrizeConfig>,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            selection: SelectionMode::default(),
            seed: None,
            prizes: default_prizes(),
        }
    }
}

impl RewardsConfig {
    /// Domain configuration derived from this module config.
    pub fn service_config(&self) -> anyhow::Result<ServiceConfig> {
        if !(self.max_weight_kg.is_finite() && self.max_weight_kg > 0.0) {
            anyhow::bail!("max_weight_kg must be a positive number");
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            anyhow::bail!("default_page_size must be between 1 and max_page_size");
        }
        let ttl = chrono::Duration::from_std(self.coupons.reward_ttl)
            .context("reward_ttl is out of range")?;

        let p = &self.points;
        Ok(ServiceConfig {
            points: PointsPolicy::new(p.rates.clone(), p.default_rate)
                .with_points_bounds(p.base_points, p.max_points)
                .with_earnings(p.base_earnings, p.earnings_per_kg, p.max_earnings),
            coupons: CouponPolicy {
                ttl,
                partner: self.coupons.partner.clone(),
                currency: self.coupons.currency.clone(),
                level_discount_per_level: self.coupons.level_discount_per_level,
                first_submission_discount: self.coupons.first_submission_discount,
            },
            max_weight_kg: self.max_weight_kg,
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
            coupon_code_attempts: self.coupons.code_attempts,
        })
    }

    pub fn spin_resolver(&self) -> anyhow::Result<SpinResolver> {
        let table = self
            .spin
            .prizes
            .iter()
            .map(|p| -> anyhow::Result<PrizeEntry> {
                let prize_type = p
                    .prize_type
                    .parse::<PrizeType>()
                    .map_err(|e| anyhow::anyhow!(e))?;
                Ok(PrizeEntry::new(prize_type, p.value, p.weight))
            })
            .collect::<anyhow::Result<Vec<_>>>()
            .context("invalid spin prize table")?;
        let selection = match self.spin.selection {
            SelectionMode::Server => SpinSelection::Server,
            SelectionMode::Client => SpinSelection::Client,
        };
        SpinResolver::new(table, selection, self.spin.seed)
    }
}

fn default_max_weight_kg() -> f64 {
    500.0
}

fn default_page_size() -> u32 {
    20
}

fn default_max_page_size() -> u32 {
    100
}

fn default_event_capacity() -> usize {
    1024
}

fn default_rate() -> f64 {
    10.0
}

fn default_base_points() -> i64 {
    10
}

fn default_max_points() -> i64 {
    50
}

fn default_base_earnings() -> i64 {
    10
}

fn default_earnings_per_kg() -> f64 {
    5.0
}

fn default_max_earnings() -> i64 {
    40
}

fn default_reward_ttl() -> Duration {
    Duration::from_secs(30 * 24 * 60 * 60)
}

fn default_partner() -> String {
    "Clean Green App".to_string()
}

fn default_currency() -> String {
    "₹".to_string()
}

fn default_level_discount() -> u32 {
    10
}

fn default_first_discount() -> u32 {
    50
}

fn default_code_attempts() -> u32 {
    5
}

fn default_prize_weight() -> u32 {
    1
}

fn default_prizes() -> Vec<PrizeConfig> {
    default_prize_table()
        .into_iter()
        .map(|e| PrizeConfig {
            prize_type: e.prize.prize_type.as_str().to_string(),
            value: e.prize.value,
            weight: e.weight,
        })
        .collect()
}
