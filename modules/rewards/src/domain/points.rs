use std::collections::HashMap;

use crate::contract::model::{PointsQuote, WasteRole};

/// Category used when a submission does not name one.
pub const DEFAULT_CATEGORY: &str = "mixed";

/// Pure points/earnings calculator. Rates are per kilogram.
#[derive(Debug, Clone)]
pub struct PointsPolicy {
    rates: HashMap<String, f64>,
    default_rate: f64,
    base_points: i64,
    max_points: i64,
    base_earnings: i64,
    earnings_per_kg: f64,
    max_earnings: i64,
}

impl Default for PointsPolicy {
    fn default() -> Self {
        Self::new(default_rates(), 10.0)
    }
}

pub fn default_rates() -> HashMap<String, f64> {
    [
        ("bottles", 25.0),
        ("plastic", 20.0),
        ("metal", 20.0),
        ("e-waste", 20.0),
        ("glass", 15.0),
        ("paper", 12.0),
        ("cardboard", 12.0),
        ("organic", 8.0),
        ("mixed", 10.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Lookup key for a category: trimmed and lower-cased.
pub fn normalize_category(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl PointsPolicy {
    pub fn new(rates: HashMap<String, f64>, default_rate: f64) -> Self {
        Self {
            rates: rates
                .into_iter()
                .map(|(k, v)| (normalize_category(&k), v))
                .collect(),
            default_rate,
            base_points: 10,
            max_points: 50,
            base_earnings: 10,
            earnings_per_kg: 5.0,
            max_earnings: 40,
        }
    }

    pub fn with_points_bounds(mut self, base: i64, max: i64) -> Self {
        self.base_points = base;
        self.max_points = max.max(base);
        self
    }

    pub fn with_earnings(mut self, base: i64, per_kg: f64, max: i64) -> Self {
        self.base_earnings = base;
        self.earnings_per_kg = per_kg;
        self.max_earnings = max.max(base);
        self
    }

    pub fn rate(&self, category: Option<&str>) -> f64 {
        let key = normalize_category(category.unwrap_or(DEFAULT_CATEGORY));
        self.rates.get(&key).copied().unwrap_or(self.default_rate)
    }

    /// Points (submitter) or earnings (collector) for one pickup.
    /// Non-positive or non-finite weights yield the base value.
    pub fn compute(&self, category: Option<&str>, weight_kg: f64, role: WasteRole) -> PointsQuote {
        let weight = if weight_kg.is_finite() && weight_kg > 0.0 {
            weight_kg
        } else {
            0.0
        };

        match role {
            WasteRole::Submitter => {
                let raw = self.base_points as f64 + self.rate(category) * weight;
                PointsQuote {
                    points: clamp_floor(raw, self.base_points, self.max_points),
                    earnings: 0,
                }
            }
            WasteRole::Collector => {
                let raw = self.base_earnings as f64 + self.earnings_per_kg * weight;
                PointsQuote {
                    points: 0,
                    earnings: clamp_floor(raw, self.base_earnings, self.max_earnings),
                }
            }
        }
    }
}

fn clamp_floor(raw: f64, min: i64, max: i64) -> i64 {
    // `as` saturates on overflow, which the clamp then bounds
    (raw.floor() as i64).clamp(min, max)
}
