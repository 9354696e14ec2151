use std::sync::Arc;

use busline_catalog::TripStatus;
use busline_shared::models::{LocationEvent, TripEvent};
use busline_shared::models::events::TOPIC_TRIP_LOCATION;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::events::EventPublisher;
use crate::feed::LocationFeed;
use crate::repository::{StoreResult, TripRepository};

/// Moves `currentLocation` of every running trip forward.
pub struct LocationTracker {
    trips: Arc<dyn TripRepository>,
    feed: Arc<dyn LocationFeed>,
    publisher: Arc<dyn EventPublisher>,
    live: Option<broadcast::Sender<TripEvent>>,
}

impl LocationTracker {
    pub fn new(
        trips: Arc<dyn TripRepository>,
        feed: Arc<dyn LocationFeed>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self { trips, feed, publisher, live: None }
    }

    pub fn with_live_updates(mut self, tx: broadcast::Sender<TripEvent>) -> Self {
        self.live = Some(tx);
        self
    }

    /// One polling pass; returns how many trips moved.
    pub async fn tick(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let running = self.trips.list_trips_by_status(TripStatus::Onroute).await?;
        let mut moved = 0;

        for trip in running {
            let coords = match self.feed.current_location(&trip, now).await {
                Ok(Some(coords)) => coords,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Location feed failed for trip {}: {}", trip.id, e);
                    continue;
                }
            };
            if trip.current_location == Some(coords) {
                continue;
            }

            if let Err(e) = self.trips.update_location(trip.id, coords).await {
                warn!("Failed to store location for trip {}: {}", trip.id, e);
                continue;
            }
            moved += 1;

            let event = LocationEvent { trip_id: trip.id, coords, timestamp: now.timestamp() };
            if let Ok(payload) = serde_json::to_string(&event) {
                if let Err(e) = self
                    .publisher
                    .publish(TOPIC_TRIP_LOCATION, &trip.id.to_string(), &payload)
                    .await
                {
                    warn!("Failed to publish location for trip {}: {}", trip.id, e);
                }
            }
            if let Some(tx) = &self.live {
                let _ = tx.send(TripEvent::LocationUpdated(event));
            }
        }

        debug!("Location tick moved {} trip(s)", moved);
        Ok(moved)
    }
}
