use std::sync::Arc;

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::api::rest::dto::RewardEvent;
use crate::api::rest::openapi::RewardsApiDoc;
use crate::api::rest::routes;
use crate::api::rest::sse::SseBroadcaster;
use crate::api::rest::sse_adapter::SseRewardEventPublisher;
use crate::config::RewardsConfig;
use crate::contract::client::RewardsApi;
use crate::domain::service::Service;
use crate::gateways::local::RewardsLocalClient;
use crate::infra::storage::{Migrator, SeaOrmRewardsStore};

/// Wiring of the rewards module: store, domain service, event stream and REST surface.
#[derive(Clone)]
pub struct RewardsModule {
    service: Arc<Service>,
    events: SseBroadcaster<RewardEvent>,
}

impl RewardsModule {
    /// Build the module on an already migrated database.
    pub fn init(cfg: &RewardsConfig, db: DatabaseConnection) -> anyhow::Result<Self> {
        info!("Initializing rewards module");
        debug!(
            "Loaded rewards config: max_weight_kg={}, default_page_size={}, max_page_size={}, selection={:?}",
            cfg.max_weight_kg, cfg.default_page_size, cfg.max_page_size, cfg.spin.selection
        );

        let service_config = cfg.service_config()?;
        let spin = cfg.spin_resolver()?;

        let events = SseBroadcaster::new(cfg.event_channel_capacity);
        let publisher = Arc::new(SseRewardEventPublisher::new(events.clone()));
        let store = Arc::new(SeaOrmRewardsStore::new(db));

        let service = Service::new(store, publisher, spin, service_config);
        Ok(Self {
            service: Arc::new(service),
            events,
        })
    }

    /// Apply pending schema migrations.
    pub async fn migrate(db: &DatabaseConnection) -> anyhow::Result<()> {
        info!("Running rewards database migrations");
        Migrator::up(db, None).await?;
        info!("Rewards database migrations completed successfully");
        Ok(())
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    /// In-process client for other modules.
    pub fn client(&self) -> Arc<dyn RewardsApi> {
        Arc::new(RewardsLocalClient::new(self.service.clone()))
    }

    pub fn register_rest(&self, router: axum::Router) -> axum::Router {
        info!("Registering rewards REST routes");
        routes::register_routes(router, self.service.clone(), self.events.clone())
    }

    pub fn openapi() -> utoipa::openapi::OpenApi {
        RewardsApiDoc::openapi()
    }
}
