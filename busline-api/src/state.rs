use std::sync::Arc;

use busline_core::events::EventPublisher;
use busline_core::{ReservationService, ReservationStore, UserRepository};
use busline_shared::models::TripEvent;
use busline_store::app_config::BusinessRules;
use busline_store::RedisClient;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReservationStore>,
    pub users: Arc<dyn UserRepository>,
    pub reservations: Arc<ReservationService>,
    /// Rate limiting is skipped when absent.
    pub redis: Option<Arc<RedisClient>>,
    pub sse_tx: broadcast::Sender<TripEvent>,
    pub auth: AuthConfig,
    pub rate_limit_per_minute: i64,
    pub cors_origin: Option<String>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        users: Arc<dyn UserRepository>,
        publisher: Arc<dyn EventPublisher>,
        auth: AuthConfig,
        business_rules: BusinessRules,
    ) -> Self {
        let (sse_tx, _) = broadcast::channel(100);
        let reservations = ReservationService::new(store.clone(), publisher)
            .with_live_updates(sse_tx.clone())
            .with_max_seats(business_rules.max_seats_per_booking)
            .with_hold_duration(chrono::Duration::seconds(business_rules.seat_hold_seconds as i64))
            .with_max_attempts(business_rules.reservation_attempts);

        Self {
            store,
            users,
            reservations: Arc::new(reservations),
            redis: None,
            sse_tx,
            auth,
            rate_limit_per_minute: 100,
            cors_origin: None,
        }
    }

    pub fn with_redis(mut self, redis: Arc<RedisClient>, limit_per_minute: i64) -> Self {
        self.redis = Some(redis);
        self.rate_limit_per_minute = limit_per_minute;
        self
    }

    pub fn with_cors_origin(mut self, origin: Option<String>) -> Self {
        self.cors_origin = origin;
        self
    }
}
