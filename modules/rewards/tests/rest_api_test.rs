mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::create_test_db;
use rewards::api::rest::auth::USER_ID_HEADER;
use rewards::api::rest::problem::APPLICATION_PROBLEM_JSON;
use rewards::config::RewardsConfig;
use rewards::RewardsModule;

async fn create_test_router() -> Router {
    let db = create_test_db().await;
    let module = RewardsModule::init(&RewardsConfig::default(), db).expect("module init");
    module.register_rest(Router::new())
}

async fn call(
    router: &Router,
    method: Method,
    uri: &str,
    user: Option<Uuid>,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(id) = user {
        req = req.header(USER_ID_HEADER, id.to_string());
    }
    let body = match body {
        Some(v) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = router
        .clone()
        .oneshot(req.body(body).unwrap())
        .await
        .unwrap();

    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json, content_type)
}

#[tokio::test]
async fn submission_flow_over_http() {
    let router = create_test_router().await;
    let user = Uuid::new_v4();

    let (status, body, _) =
        call(&router, Method::PUT, "/progress/enrollment", Some(user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalPoints"], 0);
    assert_eq!(body["currentLevel"], 1);
    assert_eq!(body["canSpin"], false);

    let (status, body, _) = call(
        &router,
        Method::POST,
        "/progress/update",
        Some(user),
        Some(json!({ "pickupId": "pk-http-1", "weight": 3, "category": "bottles" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["earnedPoints"], 50);
    assert_eq!(body["totalPoints"], 50);
    assert_eq!(body["totalWaste"], 3.0);
    assert_eq!(body["canSpin"], true);
    assert_eq!(body["replayed"], false);
    assert_eq!(body["issuedRewards"][0]["kind"], "first_submission");
    assert_eq!(body["issuedRewards"][0]["discount"], "₹50 OFF");
    assert_eq!(body["issuedRewards"][0]["status"], "active");

    // Same pickup again is a 200 replay
    let (status, body, _) = call(
        &router,
        Method::POST,
        "/progress/update",
        Some(user),
        Some(json!({ "pickupId": "pk-http-1", "weight": "3" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["replayed"], true);
    assert_eq!(body["totalPoints"], 50);

    let (status, body, _) = call(&router, Method::GET, "/progress", Some(user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["wasteTypes"]["bottles"], 3.0);
    assert_eq!(body["levelProgress"]["nextThreshold"], 200);
    assert!(body["firstTimeCoupon"]["code"]
        .as_str()
        .unwrap_or_default()
        .starts_with("FIRST-"));
}

#[tokio::test]
async fn legacy_wrapped_body_is_accepted() {
    let router = create_test_router().await;
    let user = Uuid::new_v4();
    call(&router, Method::PUT, "/progress/enrollment", Some(user), None).await;

    let (status, body, _) = call(
        &router,
        Method::POST,
        "/progress/update",
        Some(user),
        Some(json!({ "post": { "pickupId": "wrapped", "weight": 1 } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["earnedPoints"], 20);
}

#[tokio::test]
async fn wheel_reward_then_not_eligible() {
    let router = create_test_router().await;
    let user = Uuid::new_v4();
    call(&router, Method::PUT, "/progress/enrollment", Some(user), None).await;

    let (status, body, ct) =
        call(&router, Method::POST, "/progress/wheel-reward", Some(user), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "REWARDS_NOT_ELIGIBLE");
    assert_eq!(ct.as_deref(), Some(APPLICATION_PROBLEM_JSON));

    call(
        &router,
        Method::POST,
        "/progress/update",
        Some(user),
        Some(json!({ "pickupId": "w1", "weight": 2 })),
    )
    .await;

    let (status, body, _) = call(
        &router,
        Method::POST,
        "/progress/wheel-reward",
        Some(user),
        Some(json!({ "type": "gift", "value": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reward"]["kind"], "spin_prize");
    assert!(body["prize"]["type"].is_string());
    assert!(body["prize"]["value"].as_u64().unwrap_or(0) > 0);

    let (status, _, _) =
        call(&router, Method::POST, "/progress/wheel-reward", Some(user), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn problems_for_bad_requests() {
    let router = create_test_router().await;
    let user = Uuid::new_v4();

    let (status, body, ct) = call(&router, Method::GET, "/progress", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "REWARDS_UNAUTHENTICATED");
    assert_eq!(ct.as_deref(), Some(APPLICATION_PROBLEM_JSON));

    let (status, body, _) = call(&router, Method::GET, "/progress", Some(user), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "REWARDS_USER_NOT_FOUND");
    assert_eq!(body["instance"], "/progress");

    call(&router, Method::PUT, "/progress/enrollment", Some(user), None).await;
    let (status, body, _) = call(
        &router,
        Method::POST,
        "/progress/update",
        Some(user),
        Some(json!({ "pickupId": "neg", "weight": -2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "REWARDS_VALIDATION");

    let (status, body, _) = call(
        &router,
        Method::POST,
        "/progress/update",
        Some(user),
        Some(json!({ "weight": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "REWARDS_VALIDATION");

    let (status, _, _) = call(
        &router,
        Method::PUT,
        "/rewards/not-a-uuid/redeem",
        Some(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body, _) = call(
        &router,
        Method::PUT,
        &format!("/rewards/{}/redeem", Uuid::new_v4()),
        Some(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "REWARDS_REWARD_NOT_FOUND");

    let (status, _, _) =
        call(&router, Method::GET, "/rewards?status=lost", Some(user), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pickup_conflict_is_409() {
    let router = create_test_router().await;
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    for u in [alice, bob] {
        call(&router, Method::PUT, "/progress/enrollment", Some(u), None).await;
    }
    let submit = json!({ "pickupId": "contested", "weight": 1 });
    call(&router, Method::POST, "/progress/update", Some(alice), Some(submit.clone())).await;

    let (status, body, _) =
        call(&router, Method::POST, "/progress/update", Some(bob), Some(submit)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "REWARDS_PICKUP_CONFLICT");
}

#[tokio::test]
async fn quote_needs_no_identity() {
    let router = create_test_router().await;

    let (status, body, _) = call(
        &router,
        Method::GET,
        "/progress/quote?weight=3&category=bottles",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "points": 50, "earnings": 0 }));

    let (status, body, _) = call(
        &router,
        Method::GET,
        "/progress/quote?weight=10&role=collector",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["earnings"], 40);

    let (status, _, _) = call(&router, Method::GET, "/progress/quote", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = call(
        &router,
        Method::GET,
        "/progress/quote?weight=1&role=driver",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rewards_listing_stats_and_redeem() {
    let router = create_test_router().await;
    let user = Uuid::new_v4();
    call(&router, Method::PUT, "/progress/enrollment", Some(user), None).await;
    let (_, body, _) = call(
        &router,
        Method::POST,
        "/progress/update",
        Some(user),
        Some(json!({ "pickupId": "l1", "weight": 1 })),
    )
    .await;
    let reward_id = body["issuedRewards"][0]["id"].as_str().unwrap().to_string();
    call(&router, Method::POST, "/progress/wheel-reward", Some(user), None).await;

    let (status, body, _) =
        call(&router, Method::GET, "/rewards?page=1&limit=10", Some(user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"].as_array().map(Vec::len), Some(2));

    let (status, body, _) = call(
        &router,
        Method::PUT,
        &format!("/rewards/{reward_id}/redeem"),
        Some(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "redeemed");
    assert!(body["redeemedAt"].is_string());

    let (status, body, _) = call(
        &router,
        Method::PUT,
        &format!("/rewards/{reward_id}/redeem"),
        Some(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "REWARDS_NOT_ELIGIBLE");

    let (_, body, _) =
        call(&router, Method::GET, "/rewards?status=used", Some(user), None).await;
    assert_eq!(body["total"], 1);

    let (status, body, _) = call(&router, Method::GET, "/rewards/stats", Some(user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["redeemed"], 1);
    assert_eq!(body["active"], 1);
    assert_eq!(body["byKind"]["spin_prize"], 1);
    assert_eq!(body["byKind"]["first_submission"], 1);
}

#[tokio::test]
async fn events_stream_is_served_as_sse() {
    let router = create_test_router().await;
    let user = Uuid::new_v4();

    let resp = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/progress/events")
                .header(USER_ID_HEADER, user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let ct = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(ct.starts_with("text/event-stream"));
}
