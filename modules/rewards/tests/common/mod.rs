#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use std::path::Path;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use rewards::contract::model::Submission;
use rewards::domain::events::RewardsDomainEvent;
use rewards::domain::ports::EventPublisher;
use rewards::domain::service::{Service, ServiceConfig};
use rewards::domain::spin::{default_prize_table, SpinResolver, SpinSelection};
use rewards::infra::storage::{Migrator, SeaOrmRewardsStore};

/// Create a fresh test database for each test
pub async fn create_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

/// Migrated SQLite file under `dir`, behind a pool of several connections.
pub async fn create_file_db(dir: &Path, max_conns: u32) -> DatabaseConnection {
    let path = dir.join("rewards.db");
    let dsn = format!(
        "sqlite://{}?mode=rwc",
        path.to_string_lossy().replace('\\', "/")
    );
    let mut opts = ConnectOptions::new(dsn);
    opts.max_connections(max_conns).sqlx_logging(false);
    let db = Database::connect(opts)
        .await
        .expect("Failed to open file database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

/// Publisher that keeps everything it was given.
#[derive(Default)]
pub struct RecordingPublisher {
    pub events: Mutex<Vec<RewardsDomainEvent>>,
}

impl RecordingPublisher {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .iter()
            .map(|e| match e {
                RewardsDomainEvent::SubmissionApplied { .. } => "submission_applied",
                RewardsDomainEvent::LevelUp { .. } => "level_up",
                RewardsDomainEvent::RewardIssued { .. } => "reward_issued",
                RewardsDomainEvent::SpinClaimed { .. } => "spin_claimed",
                RewardsDomainEvent::RewardRedeemed { .. } => "reward_redeemed",
            })
            .collect()
    }
}

impl EventPublisher<RewardsDomainEvent> for RecordingPublisher {
    fn publish(&self, event: &RewardsDomainEvent) {
        self.events.lock().push(event.clone());
    }
}

pub fn seeded_spin(selection: SpinSelection) -> SpinResolver {
    SpinResolver::new(default_prize_table(), selection, Some(42)).expect("valid prize table")
}

pub fn service_on(
    db: DatabaseConnection,
    config: ServiceConfig,
    spin: SpinResolver,
    events: Arc<RecordingPublisher>,
) -> Arc<Service> {
    Arc::new(Service::new(
        Arc::new(SeaOrmRewardsStore::new(db)),
        events,
        spin,
        config,
    ))
}

/// Service over a fresh database with default settings.
pub async fn create_test_service() -> (Arc<Service>, Arc<RecordingPublisher>) {
    let db = create_test_db().await;
    let events = Arc::new(RecordingPublisher::default());
    let svc = service_on(
        db,
        ServiceConfig::default(),
        seeded_spin(SpinSelection::Server),
        events.clone(),
    );
    (svc, events)
}

pub async fn enrolled(svc: &Service) -> Uuid {
    let user_id = Uuid::new_v4();
    svc.enroll_user(user_id).await.expect("enroll");
    user_id
}

pub fn pickup(id: &str, category: Option<&str>, weight_kg: f64) -> Submission {
    Submission {
        pickup_id: id.to_string(),
        category: category.map(str::to_string),
        weight_kg,
    }
}
