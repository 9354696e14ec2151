use std::sync::Arc;

use busline_core::{LocationTracker, ReservationService};
use chrono::Utc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

/// Release holds whose expiry has passed, every `every` seconds.
pub async fn start_hold_sweeper(reservations: Arc<ReservationService>, every: u64) {
    let mut ticker = interval(Duration::from_secs(every.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Hold sweeper started, running every {}s", every);

    loop {
        ticker.tick().await;
        if let Err(e) = reservations.sweep_expired_holds(Utc::now()).await {
            error!("Hold sweep failed: {}", e);
        }
    }
}

/// Advance live positions of running trips, every `every` seconds.
pub async fn start_location_tracker(tracker: LocationTracker, every: u64) {
    let mut ticker = interval(Duration::from_secs(every.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Location tracker started, polling every {}s", every);

    loop {
        ticker.tick().await;
        if let Err(e) = tracker.tick(Utc::now()).await {
            error!("Location update failed: {}", e);
        }
    }
}
