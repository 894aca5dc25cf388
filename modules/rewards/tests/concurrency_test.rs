mod common;

use anyhow::Result;
use futures::future::join_all;

use std::sync::Arc;

use common::{
    create_file_db, create_test_service, enrolled, pickup, seeded_spin, service_on,
    RecordingPublisher,
};
use rewards::domain::service::ServiceConfig;
use rewards::domain::spin::SpinSelection;
use rewards::contract::model::{RewardKind, RewardStatusFilter};
use rewards::domain::error::DomainError;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_spins_issue_exactly_one_prize() -> Result<()> {
    let (svc, _) = create_test_service().await;
    let user = enrolled(&svc).await;
    svc.apply_submission(user, pickup("spin-race", None, 1.0))
        .await?;

    let attempts = (0..8).map(|_| {
        let svc = svc.clone();
        tokio::spawn(async move { svc.claim_spin(user, None).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let won = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(DomainError::NotEligible { .. })))
        .count();
    assert_eq!(won, 1);
    assert_eq!(refused, 7);

    let page = svc
        .list_rewards(user, RewardStatusFilter::All, None, None)
        .await?;
    let spins = page
        .items
        .iter()
        .filter(|r| r.kind == RewardKind::SpinPrize)
        .count();
    assert_eq!(spins, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicates_credit_once() -> Result<()> {
    let (svc, _) = create_test_service().await;
    let user = enrolled(&svc).await;

    let attempts = (0..6).map(|_| {
        let svc = svc.clone();
        tokio::spawn(async move {
            svc.apply_submission(user, pickup("same-pickup", Some("metal"), 2.0))
                .await
        })
    });
    let outcomes = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(outcomes.iter().filter(|o| !o.replayed).count(), 1);
    assert!(outcomes.iter().all(|o| o.earned_points == 50));

    let snap = svc.get_snapshot(user).await?;
    assert_eq!(snap.total_points, 50);
    assert_eq!(snap.submission_count, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_users_progress_independently() -> Result<()> {
    let (svc, _) = create_test_service().await;
    let mut users = Vec::new();
    for _ in 0..4 {
        users.push(enrolled(&svc).await);
    }

    let work = users.iter().copied().enumerate().map(|(i, user)| {
        let svc = svc.clone();
        tokio::spawn(async move {
            for n in 0..3 {
                svc.apply_submission(user, pickup(&format!("u{i}-p{n}"), None, 1.0))
                    .await?;
            }
            Ok::<_, DomainError>(())
        })
    });
    for joined in join_all(work).await {
        joined.expect("task panicked")?;
    }

    for user in users {
        let snap = svc.get_snapshot(user).await?;
        assert_eq!(snap.total_points, 60);
        let stats = svc.reward_stats(user).await?;
        assert_eq!(stats.by_kind.get(&RewardKind::FirstSubmission), Some(&1));
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn different_users_progress_independently_on_pooled_file_database() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = create_file_db(dir.path(), 10).await;
    let svc = service_on(
        db,
        ServiceConfig::default(),
        seeded_spin(SpinSelection::Server),
        Arc::new(RecordingPublisher::default()),
    );

    let mut users = Vec::new();
    for _ in 0..16 {
        users.push(enrolled(&svc).await);
    }

    let work = users.iter().copied().enumerate().map(|(i, user)| {
        let svc = svc.clone();
        tokio::spawn(async move {
            for n in 0..5 {
                svc.apply_submission(user, pickup(&format!("file-u{i}-p{n}"), None, 1.0))
                    .await?;
            }
            // Interleave a spin and a redemption with other users' writes
            let spin = svc.claim_spin(user, None).await?;
            svc.redeem_reward(user, spin.reward.id).await?;
            Ok::<_, DomainError>(())
        })
    });
    for joined in join_all(work).await {
        joined.expect("task panicked")?;
    }

    for user in users {
        let snap = svc.get_snapshot(user).await?;
        assert_eq!(snap.total_points, 100);
        assert_eq!(snap.submission_count, 5);
        assert_eq!(snap.cycle_progress, 0.0);
        let stats = svc.reward_stats(user).await?;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.redeemed, 1);
    }
    assert_eq!(svc.locked_users(), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rejected_calls_for_unknown_users_leave_no_locks_behind() -> Result<()> {
    let (svc, _) = create_test_service().await;

    let attempts = (0..100).map(|i| {
        let svc = svc.clone();
        tokio::spawn(async move {
            let stranger = uuid::Uuid::new_v4();
            if i % 2 == 0 {
                svc.claim_spin(stranger, None).await.map(|_| ())
            } else {
                svc.apply_submission(stranger, pickup(&format!("ghost-{i}"), None, 1.0))
                    .await
                    .map(|_| ())
            }
        })
    });
    for joined in join_all(attempts).await {
        let res = joined.expect("task panicked");
        assert!(matches!(res, Err(DomainError::UserNotFound { .. })));
    }

    assert_eq!(svc.locked_users(), 0);
    Ok(())
}
