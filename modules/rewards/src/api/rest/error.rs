use axum::http::StatusCode;

use crate::api::rest::problem::{Problem, ProblemResponse};
use crate::domain::error::DomainError;

/// Helper to create a ProblemResponse with less boilerplate
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> ProblemResponse {
    let problem = Problem::coded(status, code, title, detail).at(instance);

    let problem = if let Some(id) = tracing::Span::current().id() {
        problem.with_trace_id(id.into_u64().to_string())
    } else {
        problem
    };

    ProblemResponse(problem)
}

pub fn bad_request(detail: impl Into<String>, instance: &str) -> ProblemResponse {
    from_parts(
        StatusCode::BAD_REQUEST,
        "REWARDS_VALIDATION",
        "Validation error",
        detail,
        instance,
    )
}

pub fn unauthenticated(detail: impl Into<String>, instance: &str) -> ProblemResponse {
    from_parts(
        StatusCode::UNAUTHORIZED,
        "REWARDS_UNAUTHENTICATED",
        "Unauthenticated",
        detail,
        instance,
    )
}

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    match e {
        DomainError::Validation { .. } => bad_request(e.to_string(), instance),
        DomainError::UserNotFound { id } => from_parts(
            StatusCode::NOT_FOUND,
            "REWARDS_USER_NOT_FOUND",
            "User not found",
            format!("No progress record for user {id}"),
            instance,
        ),
        DomainError::RewardNotFound { id } => from_parts(
            StatusCode::NOT_FOUND,
            "REWARDS_REWARD_NOT_FOUND",
            "Reward not found",
            format!("Reward {id} was not found"),
            instance,
        ),
        DomainError::NotEligible { reason } => from_parts(
            StatusCode::CONFLICT,
            "REWARDS_NOT_ELIGIBLE",
            "Not eligible",
            reason.clone(),
            instance,
        ),
        DomainError::PickupConflict { pickup_id } => from_parts(
            StatusCode::CONFLICT,
            "REWARDS_PICKUP_CONFLICT",
            "Pickup conflict",
            format!("Pickup '{pickup_id}' was already credited to another user"),
            instance,
        ),
        DomainError::Database { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = ?e, "Database error occurred");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "REWARDS_INTERNAL",
                "Internal error",
                "An internal error occurred",
                instance,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (DomainError::validation("weight", "must be greater than 0"), 400, "REWARDS_VALIDATION"),
            (DomainError::user_not_found(Uuid::nil()), 404, "REWARDS_USER_NOT_FOUND"),
            (DomainError::reward_not_found(Uuid::nil()), 404, "REWARDS_REWARD_NOT_FOUND"),
            (DomainError::not_eligible("no submission yet"), 409, "REWARDS_NOT_ELIGIBLE"),
            (DomainError::pickup_conflict("p-1"), 409, "REWARDS_PICKUP_CONFLICT"),
            (DomainError::database("disk full"), 500, "REWARDS_INTERNAL"),
        ];
        for (err, status, code) in cases {
            let p = map_domain_error(&err, "/progress").0;
            assert_eq!(p.status, status, "{err}");
            assert_eq!(p.code, code);
            assert_eq!(p.instance, "/progress");
        }
    }

    #[test]
    fn internal_detail_is_not_leaked() {
        let p = map_domain_error(&DomainError::database("password=hunter2"), "/rewards").0;
        assert!(!p.detail.contains("hunter2"));
    }
}
