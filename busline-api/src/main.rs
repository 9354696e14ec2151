use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use busline_api::{app, worker, AppState, AuthConfig};
use busline_core::events::{EventPublisher, LogPublisher};
use busline_core::{
    LocationTracker, ReservationStore, RouteInterpolationFeed, TripRepository, UserRepository,
};
use busline_store::app_config::Config;
use busline_store::{seed, DbClient, EventProducer, InMemoryStore, RedisClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "busline_api=debug,busline_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Busline API on port {}", config.server.port);

    let (store, users, trips): (
        Arc<dyn ReservationStore>,
        Arc<dyn UserRepository>,
        Arc<dyn TripRepository>,
    ) = match &config.database {
        Some(db) => {
            let client = DbClient::new(&db.url).await.context("Failed to connect to Postgres")?;
            client.migrate().await.context("Failed to run migrations")?;
            let pg = Arc::new(client.store());
            if db.seed_demo_data {
                seed::seed_demo_data(pg.as_ref()).await?;
            }
            let store: Arc<dyn ReservationStore> = pg.clone();
            let users: Arc<dyn UserRepository> = pg.clone();
            let trips: Arc<dyn TripRepository> = pg;
            (store, users, trips)
        }
        None => {
            tracing::warn!("No database configured, using the in-memory store with demo trips");
            let memory = Arc::new(InMemoryStore::new());
            seed::seed_demo_data(memory.as_ref()).await?;
            let store: Arc<dyn ReservationStore> = memory.clone();
            let users: Arc<dyn UserRepository> = memory.clone();
            let trips: Arc<dyn TripRepository> = memory;
            (store, users, trips)
        }
    };

    let publisher: Arc<dyn EventPublisher> = match &config.kafka {
        Some(kafka) => {
            let producer = EventProducer::new(&kafka.brokers).context("Failed to create Kafka producer")?;
            Arc::new(producer) as Arc<dyn EventPublisher>
        }
        None => Arc::new(LogPublisher),
    };

    let auth = AuthConfig {
        secret: config.auth.jwt_secret.clone(),
        expiration: config.auth.jwt_expiration_seconds,
    };
    let mut state = AppState::new(store, users, publisher.clone(), auth, config.business_rules.clone())
        .with_cors_origin(config.cors_origin.clone());

    if let Some(redis) = &config.redis {
        let client = RedisClient::new(&redis.url).await.context("Failed to connect to Redis")?;
        state = state.with_redis(Arc::new(client), redis.rate_limit_per_minute);
    }

    let rules = &config.business_rules;
    tokio::spawn(worker::start_hold_sweeper(
        state.reservations.clone(),
        rules.hold_sweep_interval_seconds,
    ));
    let tracker = LocationTracker::new(trips, Arc::new(RouteInterpolationFeed), publisher)
        .with_live_updates(state.sse_tx.clone());
    tokio::spawn(worker::start_location_tracker(tracker, rules.tracking_interval_seconds));

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
