use std::sync::Arc;

use anyhow::Context;
use axum::response::Response;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use bazaar_core::SystemClock;
use bazaar_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};
use bazaar_infra::{
    AppConfig, AssessmentEngine, AssessmentError, TierError, TierRegistry,
    event_store::{EventStore, InMemoryEventStore, PostgresEventStore, StoredEvent},
    projections::CatalogProjection,
};

use crate::app::errors;

/// Store shared by the engine and the tier registry.
pub type SharedStore = Arc<dyn EventStore>;
pub type SharedBus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
pub type SharedTiers = Arc<TierRegistry<SharedStore>>;
pub type Engine = AssessmentEngine<SharedStore, SharedBus, SharedTiers, SystemClock>;

#[derive(Clone)]
pub struct AppServices {
    engine: Arc<Engine>,
    tiers: SharedTiers,
    catalog: Arc<CatalogProjection>,
}

impl AppServices {
    pub fn catalog(&self) -> &CatalogProjection {
        &self.catalog
    }

    /// Run an engine call on the blocking pool.
    ///
    /// The store may bridge into async code with `block_on`, so engine calls
    /// never run on a runtime worker directly.
    pub async fn run_engine<R, F>(&self, f: F) -> Result<R, Response>
    where
        F: FnOnce(&Engine) -> Result<R, AssessmentError> + Send + 'static,
        R: Send + 'static,
    {
        let engine = self.engine.clone();
        match tokio::task::spawn_blocking(move || f(engine.as_ref())).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(errors::assessment_error_to_response(e)),
            Err(e) => Err(errors::task_failed(e)),
        }
    }

    /// Run a tier registry call on the blocking pool.
    pub async fn run_tiers<R, F>(&self, f: F) -> Result<R, Response>
    where
        F: FnOnce(&TierRegistry<SharedStore>) -> Result<R, TierError> + Send + 'static,
        R: Send + 'static,
    {
        let tiers = self.tiers.clone();
        match tokio::task::spawn_blocking(move || f(tiers.as_ref())).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(errors::tier_error_to_response(e)),
            Err(e) => Err(errors::task_failed(e)),
        }
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store: SharedStore = match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url)
                .await
                .context("failed to connect to DATABASE_URL")?;
            let store = PostgresEventStore::new(pool);
            store
                .ensure_schema()
                .await
                .context("failed to create event store schema")?;
            tracing::info!("using Postgres event store");
            Arc::new(store)
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory event store");
            Arc::new(InMemoryEventStore::new())
        }
    };

    let bus: SharedBus = Arc::new(InMemoryEventBus::new());
    let tiers: SharedTiers = Arc::new(TierRegistry::new(store.clone()));
    let engine = Arc::new(
        AssessmentEngine::new(store, bus.clone(), tiers.clone(), SystemClock)
            .with_resubmission_policy(config.resubmission_policy),
    );
    let catalog = Arc::new(CatalogProjection::new());

    // Subscribe before replaying; anything committed meanwhile is redelivered
    // and skipped by the projection's per-stream cursor.
    let subscription = bus.subscribe();
    {
        let engine = engine.clone();
        let catalog = catalog.clone();
        tokio::task::spawn_blocking(move || rebuild_catalog(&engine, &catalog))
            .await
            .context("catalog rebuild task failed")??;
    }
    spawn_catalog_publisher(subscription, catalog.clone())?;

    Ok(AppServices {
        engine,
        tiers,
        catalog,
    })
}

/// Replay every stored listing stream into an empty catalog.
fn rebuild_catalog(engine: &Engine, catalog: &CatalogProjection) -> anyhow::Result<()> {
    let ledger = engine.ledger();
    let mut envelopes = Vec::new();
    for listing_id in ledger.listing_ids()? {
        envelopes.extend(ledger.records(listing_id)?.iter().map(StoredEvent::to_envelope));
    }

    let records = envelopes.len();
    catalog.rebuild_from_scratch(envelopes)?;
    tracing::info!(records, published = catalog.list().len(), "catalog rebuilt");
    Ok(())
}

/// Background subscriber: bus -> catalog.
///
/// Runs on a dedicated thread and stops once the bus is dropped.
fn spawn_catalog_publisher(
    subscription: Subscription<EventEnvelope<JsonValue>>,
    catalog: Arc<CatalogProjection>,
) -> anyhow::Result<()> {
    std::thread::Builder::new()
        .name("catalog-publisher".to_string())
        .spawn(move || {
            while let Ok(env) = subscription.recv() {
                if let Err(e) = catalog.apply_envelope(&env) {
                    tracing::warn!(
                        error = %e,
                        aggregate_id = %env.aggregate_id(),
                        sequence_number = env.sequence_number(),
                        "catalog apply failed"
                    );
                }
            }
            tracing::debug!("catalog publisher stopped");
        })
        .context("failed to start catalog publisher")?;
    Ok(())
}
