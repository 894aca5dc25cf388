//! Input checks applied before any state is touched.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::contract::model::Submission;
use crate::domain::error::DomainError;
use crate::domain::points::{normalize_category, DEFAULT_CATEGORY};

pub const MAX_PICKUP_ID_LEN: usize = 128;
pub const MAX_CATEGORY_LEN: usize = 64;

/// Pickup ids: alphanumeric plus `_ . : -`, 1..=128 chars.
static PICKUP_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.:\-]{1,128}$").expect("Invalid pickup id regex"));

/// A submission that passed validation, with the category resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSubmission {
    pub pickup_id: String,
    pub category: String,
    pub weight_kg: f64,
}

pub fn validate_pickup_id(pickup_id: &str) -> Result<(), DomainError> {
    if pickup_id.is_empty() {
        return Err(DomainError::validation("pickupId", "must not be empty"));
    }
    if pickup_id.len() > MAX_PICKUP_ID_LEN {
        return Err(DomainError::validation(
            "pickupId",
            format!("too long (max {MAX_PICKUP_ID_LEN})"),
        ));
    }
    if !PICKUP_ID_PATTERN.is_match(pickup_id) {
        return Err(DomainError::validation(
            "pickupId",
            "only letters, digits and _ . : - are allowed",
        ));
    }
    Ok(())
}

pub fn validate_weight(weight_kg: f64, max_weight_kg: f64) -> Result<(), DomainError> {
    if !weight_kg.is_finite() {
        return Err(DomainError::validation("weight", "must be a finite number"));
    }
    if weight_kg <= 0.0 {
        return Err(DomainError::validation("weight", "must be greater than 0"));
    }
    if weight_kg > max_weight_kg {
        return Err(DomainError::validation(
            "weight",
            format!("must not exceed {max_weight_kg} kg"),
        ));
    }
    Ok(())
}

/// Normalized category; a missing one falls back to the default category.
pub fn validate_category(category: Option<&str>) -> Result<String, DomainError> {
    let Some(raw) = category else {
        return Ok(DEFAULT_CATEGORY.to_string());
    };
    let normalized = normalize_category(raw);
    if normalized.is_empty() {
        return Err(DomainError::validation("category", "must not be blank"));
    }
    if normalized.chars().count() > MAX_CATEGORY_LEN {
        return Err(DomainError::validation(
            "category",
            format!("too long (max {MAX_CATEGORY_LEN})"),
        ));
    }
    Ok(normalized)
}

pub fn validate_submission(
    submission: Submission,
    max_weight_kg: f64,
) -> Result<ValidSubmission, DomainError> {
    validate_pickup_id(&submission.pickup_id)?;
    validate_weight(submission.weight_kg, max_weight_kg)?;
    let category = validate_category(submission.category.as_deref())?;
    Ok(ValidSubmission {
        pickup_id: submission.pickup_id,
        category,
        weight_kg: submission.weight_kg,
    })
}
