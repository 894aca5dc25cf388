use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Extension, Router,
};

use crate::api::rest::{dto::RewardEvent, handlers, sse::SseBroadcaster};
use crate::domain::service::Service;

/// Mount the progress and reward routes on `router`.
pub fn register_routes(
    router: Router,
    service: Arc<Service>,
    sse: SseBroadcaster<RewardEvent>,
) -> Router {
    let api = Router::new()
        .route("/progress", get(handlers::get_progress))
        .route("/progress/update", post(handlers::submit_pickup))
        .route("/progress/wheel-reward", post(handlers::claim_wheel_reward))
        .route("/progress/enrollment", put(handlers::enroll))
        .route("/progress/quote", get(handlers::quote))
        .route("/rewards", get(handlers::list_rewards))
        .route("/rewards/stats", get(handlers::reward_stats))
        .route("/rewards/{id}/redeem", put(handlers::redeem_reward))
        .layer(Extension(service));

    // The stream route carries its own broadcaster
    let events = Router::new()
        .route("/progress/events", get(handlers::progress_events))
        .layer(Extension(sse));

    router.merge(api).merge(events)
}
