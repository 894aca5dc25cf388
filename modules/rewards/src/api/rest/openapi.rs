use utoipa::OpenApi;

use crate::api::rest::{dto, handlers, problem::Problem};

/// OpenAPI document for the progress and reward routes.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "EcoCycle rewards API",
        description = "Points, levels, spin wheel and coupons for waste pickups"
    ),
    paths(
        handlers::submit_pickup,
        handlers::get_progress,
        handlers::enroll,
        handlers::claim_wheel_reward,
        handlers::quote,
        handlers::progress_events,
        handlers::list_rewards,
        handlers::reward_stats,
        handlers::redeem_reward,
    ),
    components(schemas(
        Problem,
        dto::SubmitPickupReq,
        dto::WheelRewardReq,
        dto::SubmissionResultDto,
        dto::ProgressDto,
        dto::LevelProgressDto,
        dto::FirstTimeCouponDto,
        dto::SpinResultDto,
        dto::PrizeDto,
        dto::RewardDto,
        dto::RewardPageDto,
        dto::RewardStatsDto,
        dto::QuoteDto,
        dto::RewardEvent,
    )),
    tags(
        (name = "progress", description = "Pickup credits, levels and the spin wheel"),
        (name = "rewards", description = "Issued coupons")
    )
)]
pub struct RewardsApiDoc;
