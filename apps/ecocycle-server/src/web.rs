use std::time::Duration;

use axum::{middleware::from_fn, response::Json, routing::get, Router};
use rewards::RewardsModule;
use runtime::ServerConfig;
use serde_json::{json, Value};
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

use crate::request_id;

const BODY_LIMIT_BYTES: usize = 16 * 1024 * 1024;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(RewardsModule::openapi())
}

/// Full HTTP surface: service routes plus the ingress middleware stack.
pub fn build_router(cfg: &ServerConfig, rewards: &RewardsModule) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/openapi.json", get(openapi_json));
    let mut router = rewards.register_rest(router);

    // Layers wrap everything added before them, so the innermost goes first.
    // Resulting order, outermost to innermost:
    // PropagateRequestId -> SetRequestId -> push_req_id_to_extensions -> Trace -> Timeout -> CORS -> BodyLimit
    router = router.layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES));
    if cfg.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }
    if cfg.timeout_sec > 0 {
        router = router.layer(TimeoutLayer::new(Duration::from_secs(cfg.timeout_sec)));
    }
    router = router.layer(request_id::create_trace_layer());
    router = router.layer(from_fn(request_id::push_req_id_to_extensions));

    let x_request_id = request_id::header();
    router = router.layer(SetRequestIdLayer::new(
        x_request_id.clone(),
        request_id::MakeReqId,
    ));
    router.layer(PropagateRequestIdLayer::new(x_request_id))
}
