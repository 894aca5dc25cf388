use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query,
    },
    http::Uri,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::{error, info};
use uuid::Uuid;

use crate::api::rest::auth::CurrentUser;
use crate::api::rest::dto::{
    ListRewardsQuery, ProgressDto, QuoteDto, QuoteQuery, RewardDto, RewardEvent, RewardPageDto,
    RewardStatsDto, SpinResultDto, SubmissionResultDto, SubmitPickupReq, WheelRewardReq,
};
use crate::api::rest::error::{bad_request, map_domain_error};
use crate::api::rest::problem::{Problem, ProblemResponse};
use crate::api::rest::sse::SseBroadcaster;
use crate::contract::model::{RewardStatusFilter, WasteRole};
use crate::domain::service::Service;
use crate::domain::spin::parse_declared;

/// Credit a pickup to the caller
#[utoipa::path(
    post,
    path = "/progress/update",
    tag = "progress",
    params(("x-user-id" = Uuid, Header, description = "Authenticated user")),
    request_body = SubmitPickupReq,
    responses(
        (status = 200, description = "Progress after the pickup", body = SubmissionResultDto),
        (status = 400, description = "Bad Request", body = Problem, content_type = "application/problem+json"),
        (status = 401, description = "Unauthenticated", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "User not enrolled", body = Problem, content_type = "application/problem+json"),
        (status = 409, description = "Pickup owned by another user", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn submit_pickup(
    Extension(svc): Extension<Arc<Service>>,
    CurrentUser(user_id): CurrentUser,
    uri: Uri,
    body: Bytes,
) -> Result<Json<SubmissionResultDto>, ProblemResponse> {
    let req: SubmitPickupReq = parse_body(&body, uri.path())?;
    info!("Submitting pickup {} for user {}", req.pickup_id, user_id);

    match svc.apply_submission(user_id, req.into()).await {
        Ok(outcome) => Ok(Json(SubmissionResultDto::at(outcome, Utc::now()))),
        Err(e) => {
            error!("Failed to apply submission for {}: {}", user_id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

#[utoipa::path(
    get,
    path = "/progress",
    tag = "progress",
    params(("x-user-id" = Uuid, Header, description = "Authenticated user")),
    responses(
        (status = 200, description = "Progress snapshot", body = ProgressDto),
        (status = 401, description = "Unauthenticated", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "User not enrolled", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn get_progress(
    Extension(svc): Extension<Arc<Service>>,
    CurrentUser(user_id): CurrentUser,
    uri: Uri,
) -> Result<Json<ProgressDto>, ProblemResponse> {
    match svc.get_snapshot(user_id).await {
        Ok(snapshot) => Ok(Json(snapshot.into())),
        Err(e) => {
            error!("Failed to load progress for {}: {}", user_id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Create the caller's progress record (idempotent)
#[utoipa::path(
    put,
    path = "/progress/enrollment",
    tag = "progress",
    params(("x-user-id" = Uuid, Header, description = "Authenticated user")),
    responses(
        (status = 200, description = "Progress snapshot", body = ProgressDto),
        (status = 401, description = "Unauthenticated", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn enroll(
    Extension(svc): Extension<Arc<Service>>,
    CurrentUser(user_id): CurrentUser,
    uri: Uri,
) -> Result<Json<ProgressDto>, ProblemResponse> {
    info!("Enrolling user {}", user_id);

    match svc.enroll_user(user_id).await {
        Ok(snapshot) => Ok(Json(snapshot.into())),
        Err(e) => {
            error!("Failed to enroll {}: {}", user_id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Claim the wheel prize for the current cycle. The body may be empty.
#[utoipa::path(
    post,
    path = "/progress/wheel-reward",
    tag = "progress",
    params(("x-user-id" = Uuid, Header, description = "Authenticated user")),
    request_body(content = WheelRewardReq, description = "Optional client-declared prize, honoured only in client selection mode"),
    responses(
        (status = 200, description = "Prize and issued reward", body = SpinResultDto),
        (status = 400, description = "Bad Request", body = Problem, content_type = "application/problem+json"),
        (status = 401, description = "Unauthenticated", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "User not enrolled", body = Problem, content_type = "application/problem+json"),
        (status = 409, description = "Not eligible to spin", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn claim_wheel_reward(
    Extension(svc): Extension<Arc<Service>>,
    CurrentUser(user_id): CurrentUser,
    uri: Uri,
    body: Bytes,
) -> Result<Json<SpinResultDto>, ProblemResponse> {
    let req: WheelRewardReq = if body.iter().all(u8::is_ascii_whitespace) {
        WheelRewardReq::default()
    } else {
        parse_body(&body, uri.path())?
    };
    let declared = parse_declared(req.prize_type.as_deref(), req.value)
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    info!("Claiming wheel reward for user {}", user_id);

    match svc.claim_spin(user_id, declared).await {
        Ok(outcome) => Ok(Json(SpinResultDto::at(outcome, Utc::now()))),
        Err(e) => {
            error!("Failed to claim spin for {}: {}", user_id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Preview points and earnings for a pickup; no identity needed
#[utoipa::path(
    get,
    path = "/progress/quote",
    tag = "progress",
    params(
        ("weight" = f64, Query, description = "Kilograms"),
        ("category" = Option<String>, Query, description = "Waste category"),
        ("role" = Option<String>, Query, description = "submitter or collector")
    ),
    responses(
        (status = 200, description = "Points and earnings preview", body = QuoteDto),
        (status = 400, description = "Bad Request", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn quote(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
    query: Result<Query<QuoteQuery>, QueryRejection>,
) -> Result<Json<QuoteDto>, ProblemResponse> {
    let Query(q) = query.map_err(|e| bad_request(e.body_text(), uri.path()))?;
    let role = match q.role.as_deref() {
        Some(r) => r
            .parse::<WasteRole>()
            .map_err(|e| bad_request(format!("role: {e}"), uri.path()))?,
        None => WasteRole::default(),
    };
    Ok(Json(svc.quote(q.category.as_deref(), q.weight, role).into()))
}

/// SSE stream of the caller's own progress and reward events
#[utoipa::path(
    get,
    path = "/progress/events",
    tag = "progress",
    params(("x-user-id" = Uuid, Header, description = "Authenticated user")),
    responses(
        (status = 200, description = "SSE stream of RewardEvent", body = RewardEvent, content_type = "text/event-stream"),
        (status = 401, description = "Unauthenticated", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn progress_events(
    Extension(sse): Extension<SseBroadcaster<RewardEvent>>,
    CurrentUser(user_id): CurrentUser,
) -> impl IntoResponse {
    info!("New SSE connection for user {}", user_id);
    sse.sse_response_filtered("rewards_events", move |e: &RewardEvent| e.user_id == user_id)
}

#[utoipa::path(
    get,
    path = "/rewards",
    tag = "rewards",
    params(
        ("x-user-id" = Uuid, Header, description = "Authenticated user"),
        ("page" = Option<u32>, Query, description = "1-based page"),
        ("limit" = Option<u32>, Query, description = "Page size"),
        ("status" = Option<String>, Query, description = "all, active, expired or redeemed")
    ),
    responses(
        (status = 200, description = "Newest rewards first", body = RewardPageDto),
        (status = 400, description = "Bad Request", body = Problem, content_type = "application/problem+json"),
        (status = 401, description = "Unauthenticated", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn list_rewards(
    Extension(svc): Extension<Arc<Service>>,
    CurrentUser(user_id): CurrentUser,
    uri: Uri,
    query: Result<Query<ListRewardsQuery>, QueryRejection>,
) -> Result<Json<RewardPageDto>, ProblemResponse> {
    let Query(q) = query.map_err(|e| bad_request(e.body_text(), uri.path()))?;
    let status = q
        .status
        .as_deref()
        .unwrap_or_default()
        .parse::<RewardStatusFilter>()
        .map_err(|e| bad_request(format!("status: {e}"), uri.path()))?;

    match svc.list_rewards(user_id, status, q.page, q.limit).await {
        Ok(page) => Ok(Json(RewardPageDto::at(page, Utc::now()))),
        Err(e) => {
            error!("Failed to list rewards for {}: {}", user_id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

#[utoipa::path(
    get,
    path = "/rewards/stats",
    tag = "rewards",
    params(("x-user-id" = Uuid, Header, description = "Authenticated user")),
    responses(
        (status = 200, description = "Counts per status and kind", body = RewardStatsDto),
        (status = 401, description = "Unauthenticated", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn reward_stats(
    Extension(svc): Extension<Arc<Service>>,
    CurrentUser(user_id): CurrentUser,
    uri: Uri,
) -> Result<Json<RewardStatsDto>, ProblemResponse> {
    match svc.reward_stats(user_id).await {
        Ok(stats) => Ok(Json(stats.into())),
        Err(e) => {
            error!("Failed to compute reward stats for {}: {}", user_id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

#[utoipa::path(
    put,
    path = "/rewards/{id}/redeem",
    tag = "rewards",
    params(
        ("x-user-id" = Uuid, Header, description = "Authenticated user"),
        ("id" = Uuid, Path, description = "Reward id")
    ),
    responses(
        (status = 200, description = "Redeemed reward", body = RewardDto),
        (status = 401, description = "Unauthenticated", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "Not Found", body = Problem, content_type = "application/problem+json"),
        (status = 409, description = "Expired or already redeemed", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn redeem_reward(
    Extension(svc): Extension<Arc<Service>>,
    CurrentUser(user_id): CurrentUser,
    uri: Uri,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<RewardDto>, ProblemResponse> {
    let Path(reward_id) = path.map_err(|e| bad_request(e.body_text(), uri.path()))?;
    info!("Redeeming reward {} for user {}", reward_id, user_id);

    match svc.redeem_reward(user_id, reward_id).await {
        Ok(reward) => Ok(Json(RewardDto::at(reward, Utc::now()))),
        Err(e) => {
            error!("Failed to redeem reward {}: {}", reward_id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// JSON body parsing with problem+json rejections. Bodies wrapped as
/// `{"post": {...}}` by older mobile clients are unwrapped first.
fn parse_body<T: DeserializeOwned>(body: &[u8], instance: &str) -> Result<T, ProblemResponse> {
    let mut value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| bad_request(format!("invalid JSON body: {e}"), instance))?;
    if let Some(inner) = value.get_mut("post").filter(|v| v.is_object()) {
        value = inner.take();
    }
    serde_json::from_value(value).map_err(|e| bad_request(format!("invalid body: {e}"), instance))
}
