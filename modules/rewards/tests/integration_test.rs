mod common;

use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use uuid::Uuid;

use common::{
    create_test_db, create_test_service, enrolled, pickup, seeded_spin, service_on,
    RecordingPublisher,
};
use rewards::contract::client::RewardsApi;
use rewards::contract::error::RewardsError;
use rewards::contract::model::{
    Prize, PrizeType, RewardKind, RewardStatus, RewardStatusFilter, WasteRole,
};
use rewards::domain::error::DomainError;
use rewards::domain::points::PointsPolicy;
use rewards::domain::service::ServiceConfig;
use rewards::domain::spin::SpinSelection;
use rewards::gateways::local::RewardsLocalClient;
use rewards::infra::storage::entity::{progress_transaction, user_progress};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

#[tokio::test]
async fn first_submission_earns_points_and_welcome_coupon() -> Result<()> {
    let (svc, _) = create_test_service().await;
    let user = enrolled(&svc).await;

    let out = svc
        .apply_submission(user, pickup("pk-1", Some("bottles"), 3.0))
        .await?;

    assert_eq!(out.earned_points, 50);
    assert_eq!(out.total_points, 50);
    assert_eq!(out.current_level, 1);
    assert!(out.can_spin);
    assert!(!out.replayed);
    assert_eq!(out.total_waste, 3.0);
    assert_eq!(out.issued_rewards.len(), 1);

    let coupon = &out.issued_rewards[0];
    assert_eq!(coupon.kind, RewardKind::FirstSubmission);
    assert_eq!(coupon.discount, "₹50 OFF");
    assert_eq!(coupon.partner, "Clean Green App");
    assert!(coupon.coupon_code.starts_with("FIRST-"));
    assert_eq!(coupon.expires_at - coupon.created_at, Duration::days(30));

    let snap = svc.get_snapshot(user).await?;
    assert_eq!(snap.total_points, 50);
    assert_eq!(snap.submission_count, 1);
    assert_eq!(snap.waste_types.len(), 1);
    assert_eq!(snap.waste_types[0].category, "bottles");
    assert_eq!(snap.level_progress.next_threshold, Some(200));
    assert_eq!(
        snap.first_time_coupon.map(|r| r.id),
        Some(coupon.id),
        "unredeemed welcome coupon is surfaced"
    );
    Ok(())
}

#[tokio::test]
async fn crossing_a_threshold_issues_one_level_coupon() -> Result<()> {
    let (svc, _) = create_test_service().await;
    let user = enrolled(&svc).await;

    // 50 + 50 + 50 + 40 = 190
    for (i, (cat, w)) in [("bottles", 3.0), ("bottles", 3.0), ("bottles", 3.0), ("mixed", 3.0)]
        .into_iter()
        .enumerate()
    {
        svc.apply_submission(user, pickup(&format!("warmup-{i}"), Some(cat), w))
            .await?;
    }
    assert_eq!(svc.get_snapshot(user).await?.total_points, 190);

    let out = svc
        .apply_submission(user, pickup("pk-cross", Some("mixed"), 1.0))
        .await?;
    assert_eq!(out.earned_points, 20);
    assert_eq!(out.total_points, 210);
    assert_eq!(out.current_level, 2);
    assert_eq!(out.issued_rewards.len(), 1);
    let reward = &out.issued_rewards[0];
    assert_eq!(reward.kind, RewardKind::LevelUp);
    assert_eq!(reward.title, "Level 2 Achievement");
    assert_eq!(reward.discount, "₹20 OFF");
    assert_eq!(reward.level, Some(2));
    assert!(reward.coupon_code.starts_with("LVL2-"));

    // Staying inside level 2 issues nothing further
    let out = svc
        .apply_submission(user, pickup("pk-after", Some("mixed"), 1.0))
        .await?;
    assert!(out.issued_rewards.is_empty());
    Ok(())
}

#[tokio::test]
async fn multi_level_jump_issues_single_coupon_for_final_level() -> Result<()> {
    let db = create_test_db().await;
    let config = ServiceConfig {
        points: PointsPolicy::default().with_points_bounds(10, 10_000),
        ..ServiceConfig::default()
    };
    let events = Arc::new(RecordingPublisher::default());
    let svc = service_on(db, config, seeded_spin(SpinSelection::Server), events);
    let user = enrolled(&svc).await;

    // 10 + 25 * 20 = 510 points -> level 3
    let out = svc
        .apply_submission(user, pickup("big", Some("bottles"), 20.0))
        .await?;
    assert_eq!(out.total_points, 510);
    assert_eq!(out.current_level, 3);

    let level_coupons: Vec<_> = out
        .issued_rewards
        .iter()
        .filter(|r| r.kind == RewardKind::LevelUp)
        .collect();
    assert_eq!(level_coupons.len(), 1);
    assert_eq!(level_coupons[0].title, "Level 3 Achievement");
    assert_eq!(level_coupons[0].discount, "₹30 OFF");
    Ok(())
}

#[tokio::test]
async fn replayed_pickup_changes_nothing() -> Result<()> {
    let (svc, events) = create_test_service().await;
    let user = enrolled(&svc).await;

    let first = svc
        .apply_submission(user, pickup("dup", Some("plastic"), 1.0))
        .await?;
    let published = events.events.lock().len();

    let again = svc
        .apply_submission(user, pickup("dup", Some("plastic"), 9.0))
        .await?;

    assert!(again.replayed);
    assert_eq!(again.earned_points, first.earned_points);
    assert_eq!(again.total_points, first.total_points);
    assert_eq!(again.total_waste, first.total_waste);
    assert!(again.issued_rewards.is_empty());
    assert_eq!(events.events.lock().len(), published, "replay publishes nothing");

    let stats = svc.reward_stats(user).await?;
    assert_eq!(stats.total, 1);
    Ok(())
}

#[tokio::test]
async fn pickup_owned_by_another_user_conflicts() -> Result<()> {
    let (svc, _) = create_test_service().await;
    let alice = enrolled(&svc).await;
    let bob = enrolled(&svc).await;

    svc.apply_submission(alice, pickup("shared", None, 1.0))
        .await?;
    let err = svc
        .apply_submission(bob, pickup("shared", None, 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PickupConflict { ref pickup_id } if pickup_id == "shared"));
    assert_eq!(svc.get_snapshot(bob).await?.total_points, 0);
    Ok(())
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let (svc, _) = create_test_service().await;
    let stranger = Uuid::new_v4();

    assert!(matches!(
        svc.get_snapshot(stranger).await,
        Err(DomainError::UserNotFound { .. })
    ));
    assert!(matches!(
        svc.apply_submission(stranger, pickup("p", None, 1.0)).await,
        Err(DomainError::UserNotFound { .. })
    ));
    assert!(matches!(
        svc.claim_spin(stranger, None).await,
        Err(DomainError::UserNotFound { .. })
    ));
}

#[tokio::test]
async fn invalid_submission_is_rejected_before_any_write() -> Result<()> {
    let (svc, _) = create_test_service().await;
    let user = enrolled(&svc).await;

    for bad in [
        pickup("", None, 1.0),
        pickup("ok", None, 0.0),
        pickup("ok", None, f64::NAN),
        pickup("ok", None, 501.0),
        pickup("ok", Some("  "), 1.0),
    ] {
        assert!(matches!(
            svc.apply_submission(user, bad).await,
            Err(DomainError::Validation { .. })
        ));
    }
    assert_eq!(svc.get_snapshot(user).await?.submission_count, 0);
    Ok(())
}

#[tokio::test]
async fn total_points_equal_sum_of_awards() -> Result<()> {
    let (svc, _) = create_test_service().await;
    let user = enrolled(&svc).await;

    let batch = [
        ("a", Some("glass"), 0.4),
        ("b", Some("organic"), 12.0),
        ("a", Some("glass"), 0.4),
        ("c", None, 2.25),
        ("d", Some("E-Waste"), 1.5),
        ("c", None, 2.25),
    ];
    let mut awarded = 0;
    for (id, cat, w) in batch {
        let out = svc.apply_submission(user, pickup(id, cat, w)).await?;
        if !out.replayed {
            awarded += out.earned_points;
        }
    }

    let snap = svc.get_snapshot(user).await?;
    assert_eq!(snap.total_points, awarded);
    assert_eq!(snap.submission_count, 4);
    assert!((snap.total_waste - (0.4 + 12.0 + 2.25 + 1.5)).abs() < 1e-9);
    // Heaviest category first
    assert_eq!(snap.waste_types[0].category, "organic");
    Ok(())
}

#[tokio::test]
async fn spin_requires_a_fresh_cycle() -> Result<()> {
    let (svc, events) = create_test_service().await;
    let user = enrolled(&svc).await;

    let err = svc.claim_spin(user, None).await.unwrap_err();
    assert!(matches!(err, DomainError::NotEligible { ref reason } if reason == "no submission yet"));

    svc.apply_submission(user, pickup("s1", Some("paper"), 2.0))
        .await?;
    let spin = svc.claim_spin(user, None).await?;
    assert_eq!(spin.reward.kind, RewardKind::SpinPrize);
    assert_eq!(spin.reward.prize, Some(spin.prize));
    assert!(spin.reward.coupon_code.starts_with("SPIN-"));

    let snap = svc.get_snapshot(user).await?;
    assert!(snap.wheel_spun_this_cycle);
    assert!(!snap.can_spin);
    assert_eq!(snap.cycle_progress, 0.0);

    let err = svc.claim_spin(user, None).await.unwrap_err();
    assert!(
        matches!(err, DomainError::NotEligible { ref reason } if reason == "wheel already spun this cycle")
    );

    // A new submission opens the next cycle
    let out = svc
        .apply_submission(user, pickup("s2", Some("paper"), 1.0))
        .await?;
    assert!(out.can_spin);
    assert_eq!(out.cycle_progress, 1.0);
    svc.claim_spin(user, None).await?;

    assert!(events.kinds().contains(&"spin_claimed"));
    Ok(())
}

#[tokio::test]
async fn client_selection_honours_declared_prize() -> Result<()> {
    let db = create_test_db().await;
    let events = Arc::new(RecordingPublisher::default());
    let svc = service_on(
        db,
        ServiceConfig::default(),
        seeded_spin(SpinSelection::Client),
        events,
    );
    let user = enrolled(&svc).await;
    svc.apply_submission(user, pickup("c1", None, 1.0)).await?;

    let off_table = Prize {
        prize_type: PrizeType::Cashback,
        value: 9999,
    };
    assert!(matches!(
        svc.claim_spin(user, Some(off_table)).await,
        Err(DomainError::Validation { .. })
    ));

    let seeds = Prize {
        prize_type: PrizeType::Seeds,
        value: 5,
    };
    let spin = svc.claim_spin(user, Some(seeds)).await?;
    assert_eq!(spin.prize, seeds);
    assert_eq!(spin.reward.discount, "5 Seeds");
    Ok(())
}

#[tokio::test]
async fn redemption_happens_once() -> Result<()> {
    let (svc, events) = create_test_service().await;
    let user = enrolled(&svc).await;
    let other = enrolled(&svc).await;
    let out = svc.apply_submission(user, pickup("r1", None, 1.0)).await?;
    let reward_id = out.issued_rewards[0].id;

    assert!(matches!(
        svc.redeem_reward(other, reward_id).await,
        Err(DomainError::RewardNotFound { .. })
    ));

    let redeemed = svc.redeem_reward(user, reward_id).await?;
    assert!(redeemed.redeemed_at.is_some());
    assert_eq!(
        redeemed.status_at(chrono::Utc::now()),
        RewardStatus::Redeemed
    );
    assert!(events.kinds().contains(&"reward_redeemed"));

    assert!(matches!(
        svc.redeem_reward(user, reward_id).await,
        Err(DomainError::NotEligible { .. })
    ));
    assert!(matches!(
        svc.redeem_reward(user, Uuid::new_v4()).await,
        Err(DomainError::RewardNotFound { .. })
    ));

    // A redeemed welcome coupon is no longer surfaced
    assert!(svc.get_snapshot(user).await?.first_time_coupon.is_none());
    Ok(())
}

#[tokio::test]
async fn status_filters_partition_rewards() -> Result<()> {
    let db = create_test_db().await;
    let events = Arc::new(RecordingPublisher::default());
    let short_lived = service_on(
        db.clone(),
        ServiceConfig {
            coupons: rewards::domain::coupon::CouponPolicy {
                ttl: Duration::zero(),
                ..Default::default()
            },
            ..ServiceConfig::default()
        },
        seeded_spin(SpinSelection::Server),
        events.clone(),
    );
    let svc = service_on(
        db,
        ServiceConfig::default(),
        seeded_spin(SpinSelection::Server),
        events,
    );
    let user = enrolled(&svc).await;

    // Welcome coupon expires immediately
    let expired = short_lived
        .apply_submission(user, pickup("e1", None, 1.0))
        .await?;
    assert!(matches!(
        svc.redeem_reward(user, expired.issued_rewards[0].id).await,
        Err(DomainError::NotEligible { ref reason }) if reason == "reward has expired"
    ));

    // Two spin prizes that stay valid; one gets redeemed
    let first = svc.claim_spin(user, None).await?;
    svc.apply_submission(user, pickup("e2", None, 1.0)).await?;
    svc.claim_spin(user, None).await?;
    svc.redeem_reward(user, first.reward.id).await?;

    let count = |filter: RewardStatusFilter| {
        let svc = svc.clone();
        async move {
            svc.list_rewards(user, filter, None, None)
                .await
                .map(|p| p.total)
        }
    };
    let all = count(RewardStatusFilter::All).await?;
    let active = count(RewardStatusFilter::Active).await?;
    let expired_n = count(RewardStatusFilter::Expired).await?;
    let redeemed = count(RewardStatusFilter::Redeemed).await?;
    assert_eq!(all, 3);
    assert_eq!((active, expired_n, redeemed), (1, 1, 1));
    assert_eq!(active + expired_n + redeemed, all);

    let stats = svc.reward_stats(user).await?;
    assert_eq!((stats.total, stats.active, stats.expired, stats.redeemed), (3, 1, 1, 1));
    assert_eq!(stats.by_kind.get(&RewardKind::SpinPrize), Some(&2));
    Ok(())
}

#[tokio::test]
async fn reward_pages_are_newest_first() -> Result<()> {
    let (svc, _) = create_test_service().await;
    let user = enrolled(&svc).await;
    for i in 0..3 {
        svc.apply_submission(user, pickup(&format!("p{i}"), None, 1.0))
            .await?;
        svc.claim_spin(user, None).await?;
    }

    let page1 = svc
        .list_rewards(user, RewardStatusFilter::All, Some(1), Some(3))
        .await?;
    let page2 = svc
        .list_rewards(user, RewardStatusFilter::All, Some(2), Some(3))
        .await?;
    assert_eq!(page1.total, 4);
    assert_eq!(page1.items.len(), 3);
    assert_eq!(page2.items.len(), 1);
    assert!(page1.items[0].created_at >= page1.items[2].created_at);
    assert_eq!(page2.items[0].kind, RewardKind::FirstSubmission);

    assert!(matches!(
        svc.list_rewards(user, RewardStatusFilter::All, Some(0), None).await,
        Err(DomainError::Validation { .. })
    ));
    assert!(matches!(
        svc.list_rewards(user, RewardStatusFilter::All, None, Some(101)).await,
        Err(DomainError::Validation { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn enrollment_is_idempotent() -> Result<()> {
    let (svc, _) = create_test_service().await;
    let user = enrolled(&svc).await;
    svc.apply_submission(user, pickup("keep", None, 1.0)).await?;

    let snap = svc.enroll_user(user).await?;
    assert_eq!(snap.total_points, 20, "re-enrolling keeps existing progress");
    Ok(())
}

#[tokio::test]
async fn events_follow_commit_order() -> Result<()> {
    let (svc, events) = create_test_service().await;
    let user = enrolled(&svc).await;
    svc.apply_submission(user, pickup("ev", Some("bottles"), 3.0))
        .await?;

    assert_eq!(events.kinds(), vec!["submission_applied", "reward_issued"]);
    assert!(events.events.lock().iter().all(|e| e.user_id() == user));
    Ok(())
}

#[tokio::test]
async fn local_client_maps_errors_to_contract() -> Result<()> {
    let (svc, _) = create_test_service().await;
    let client: Arc<dyn RewardsApi> = Arc::new(RewardsLocalClient::new(svc));

    let user = Uuid::new_v4();
    assert!(matches!(
        client.get_snapshot(user).await,
        Err(RewardsError::NotFound { .. })
    ));
    client.enroll_user(user).await?;
    assert!(matches!(
        client.claim_spin(user, None).await,
        Err(RewardsError::NotEligible { .. })
    ));
    let out = client
        .apply_submission(user, pickup("lc", Some("metal"), 1.0))
        .await?;
    assert_eq!(out.total_points, 30);

    let q = client.quote(Some("metal"), 1.0, WasteRole::Collector);
    assert_eq!((q.points, q.earnings), (0, 15));
    Ok(())
}

#[tokio::test]
async fn failed_reward_write_rolls_back_the_whole_submission() -> Result<()> {
    let db = create_test_db().await;
    let events = Arc::new(RecordingPublisher::default());
    let svc = service_on(
        db.clone(),
        ServiceConfig::default(),
        seeded_spin(SpinSelection::Server),
        events.clone(),
    );
    let user = enrolled(&svc).await;

    db.execute_unprepared(
        "CREATE TRIGGER block_rewards BEFORE INSERT ON rewards \
         BEGIN SELECT RAISE(ABORT, 'rewards unavailable'); END;",
    )
    .await?;

    // The first submission must issue a coupon, which now fails
    let err = svc
        .apply_submission(user, pickup("pk-atomic", Some("bottles"), 3.0))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Database { .. }), "{err:?}");

    let snap = svc.get_snapshot(user).await?;
    assert_eq!(snap.total_points, 0);
    assert_eq!(snap.submission_count, 0);
    assert_eq!(snap.total_waste, 0.0);
    assert_eq!(progress_transaction::Entity::find().count(&db).await?, 0);
    assert!(events.kinds().is_empty());

    // Retrying the same pickup once rewards work again credits it normally
    db.execute_unprepared("DROP TRIGGER block_rewards").await?;
    let out = svc
        .apply_submission(user, pickup("pk-atomic", Some("bottles"), 3.0))
        .await?;
    assert!(!out.replayed);
    assert_eq!(out.total_points, 50);
    assert_eq!(out.issued_rewards.len(), 1);
    Ok(())
}

#[tokio::test]
async fn points_overflow_is_refused_without_clamping() -> Result<()> {
    let db = create_test_db().await;
    let svc = service_on(
        db.clone(),
        ServiceConfig::default(),
        seeded_spin(SpinSelection::Server),
        Arc::new(RecordingPublisher::default()),
    );
    let user = enrolled(&svc).await;

    let near_max = i64::MAX - 5;
    user_progress::Entity::update_many()
        .col_expr(user_progress::Column::TotalPoints, Expr::value(near_max))
        .filter(user_progress::Column::UserId.eq(user))
        .exec(&db)
        .await?;

    let err = svc
        .apply_submission(user, pickup("pk-overflow", None, 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Database { .. }), "{err:?}");

    let snap = svc.get_snapshot(user).await?;
    assert_eq!(snap.total_points, near_max);
    assert_eq!(snap.submission_count, 0);
    assert_eq!(progress_transaction::Entity::find().count(&db).await?, 0);
    Ok(())
}
