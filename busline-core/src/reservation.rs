use std::sync::Arc;

use busline_catalog::{CatalogError, SeatStatus, Trip, TripStatus};
use busline_order::{Booking, BookingMode, BookingStatus, ReconcileError, Reconciler};
use busline_shared::models::TripEvent;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::events::{booking_event, topic_for, EventPublisher};
use crate::identity::AuthenticatedUser;
use crate::repository::{ReservationStore, StoreError};

pub const DEFAULT_HOLD_SECONDS: i64 = 600;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ReservationError {
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub type ReservationResult<T> = Result<T, ReservationError>;

/// `POST /api/bookings`
///
/// `seats` takes plain ids or `{seatId, price}` entries; a client price is
/// ignored since seats are charged at the trip fare.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    pub trip_id: Uuid,
    #[serde(alias = "seatIds", deserialize_with = "seat_refs")]
    pub seats: Vec<String>,
    #[serde(default)]
    pub hold: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeatRef {
    Id(String),
    Entry {
        #[serde(rename = "seatId")]
        seat_id: String,
    },
}

fn seat_refs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let refs = Vec::<SeatRef>::deserialize(deserializer)?;
    Ok(refs
        .into_iter()
        .map(|r| match r {
            SeatRef::Id(id) => id,
            SeatRef::Entry { seat_id } => seat_id,
        })
        .collect())
}

/// Operator edit of trip metadata. Seats and location are not touched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripUpdate {
    pub fare: Option<i64>,
    pub status: Option<TripStatus>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl TripUpdate {
    pub fn apply(&self, trip: &Trip) -> Result<Trip, CatalogError> {
        let mut updated = trip.clone();
        if let Some(status) = self.status {
            if !trip.status.can_transition_to(status) {
                return Err(CatalogError::InvalidTransition {
                    from: trip.status.as_str().to_string(),
                    to: status.as_str().to_string(),
                });
            }
            updated.status = status;
        }
        if let Some(fare) = self.fare {
            updated.fare = fare;
        }
        if let Some(start) = self.start_time {
            updated.start_time = start;
        }
        if let Some(end) = self.end_time {
            updated.end_time = end;
        }
        updated.validate()?;
        Ok(updated)
    }
}

/// Runs reconciler operations against the store.
///
/// Every operation is a load, reconcile, commit loop. The commit is
/// version-checked; on `Conflict` the whole loop restarts from a fresh load,
/// up to `max_attempts` times.
pub struct ReservationService {
    store: Arc<dyn ReservationStore>,
    publisher: Arc<dyn EventPublisher>,
    live: Option<broadcast::Sender<TripEvent>>,
    reconciler: Reconciler,
    hold_duration: Duration,
    max_attempts: u32,
}

impl ReservationService {
    pub fn new(store: Arc<dyn ReservationStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            store,
            publisher,
            live: None,
            reconciler: Reconciler::default(),
            hold_duration: Duration::seconds(DEFAULT_HOLD_SECONDS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_live_updates(mut self, tx: broadcast::Sender<TripEvent>) -> Self {
        self.live = Some(tx);
        self
    }

    pub fn with_max_seats(mut self, max_seats: usize) -> Self {
        self.reconciler = Reconciler::new(max_seats);
        self
    }

    pub fn with_hold_duration(mut self, hold: Duration) -> Self {
        self.hold_duration = hold;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn ReservationStore> {
        &self.store
    }

    pub async fn book(&self, user: &AuthenticatedUser, req: &BookRequest) -> ReservationResult<Booking> {
        let mut attempt = 1;
        loop {
            let now = Utc::now();
            let trip = self.store.load_trip(req.trip_id).await?;
            let mode = if req.hold {
                BookingMode::Hold { expires_at: now + self.hold_duration }
            } else {
                BookingMode::Confirmed
            };
            let reservation = self.reconciler.reserve(&trip, &req.seats, user.id, mode, now)?;

            match self.store.commit_reservation(&reservation.trip, &reservation.booking).await {
                Ok(saved) => {
                    info!(
                        "Booking {} ({}) for trip {}: seats {:?}",
                        reservation.booking.id,
                        reservation.booking.status,
                        saved.id,
                        reservation.booking.seat_ids()
                    );
                    self.announce(&reservation.booking, &saved).await;
                    return Ok(reservation.booking);
                }
                Err(StoreError::Conflict(id)) if attempt < self.max_attempts => {
                    debug!("Trip {} changed under booking attempt {}, retrying", id, attempt);
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Cancel one of the caller's bookings. Other users' bookings read as
    /// missing.
    pub async fn cancel(&self, user: &AuthenticatedUser, booking_id: Uuid) -> ReservationResult<Booking> {
        self.release(booking_id, Some(user.id), None).await
    }

    pub async fn confirm(&self, user: &AuthenticatedUser, booking_id: Uuid) -> ReservationResult<Booking> {
        let mut attempt = 1;
        loop {
            let (trip, booking) = self.load_pair(booking_id, Some(user.id)).await?;
            let confirmed = self.reconciler.confirm_hold(&booking, Utc::now())?;

            match self.store.commit_reservation(&trip, &confirmed).await {
                Ok(saved) => {
                    info!("Hold {} confirmed", confirmed.id);
                    self.announce(&confirmed, &saved).await;
                    return Ok(confirmed);
                }
                Err(StoreError::Conflict(id)) if attempt < self.max_attempts => {
                    debug!("Trip {} changed under confirm attempt {}, retrying", id, attempt);
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Release a hold that has run out. Bookings that are no longer expired
    /// holds by the time they are reloaded are left alone.
    pub async fn expire_hold(&self, booking_id: Uuid, now: DateTime<Utc>) -> ReservationResult<Option<Booking>> {
        match self.release(booking_id, None, Some(now)).await {
            Ok(booking) => Ok(Some(booking)),
            Err(ReservationError::Reconcile(ReconcileError::NotHeld(_))) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Expire every hold due at `now`; returns how many were released.
    pub async fn sweep_expired_holds(&self, now: DateTime<Utc>) -> ReservationResult<usize> {
        let due = self.store.expired_holds(now).await?;
        let mut released = 0;
        for booking in due {
            match self.expire_hold(booking.id, now).await {
                Ok(Some(_)) => released += 1,
                Ok(None) => {}
                Err(e) => warn!("Failed to expire hold {}: {}", booking.id, e),
            }
        }
        if released > 0 {
            info!("Released {} expired hold(s)", released);
        }
        Ok(released)
    }

    pub async fn override_seats(
        &self,
        trip_id: Uuid,
        seat_ids: &[String],
        status: SeatStatus,
    ) -> ReservationResult<Trip> {
        let mut attempt = 1;
        loop {
            let trip = self.store.load_trip(trip_id).await?;
            let active = self.store.active_bookings_for_trip(trip_id).await?;
            let updated = self.reconciler.set_seat_status(&trip, seat_ids, status, &active)?;
            match self.store.save_trip(&updated).await {
                Ok(saved) => {
                    info!("Seats {:?} on trip {} set to {:?}", seat_ids, trip_id, status);
                    return Ok(saved);
                }
                Err(StoreError::Conflict(_)) if attempt < self.max_attempts => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn update_trip(&self, trip_id: Uuid, update: &TripUpdate) -> ReservationResult<Trip> {
        let mut attempt = 1;
        loop {
            let trip = self.store.load_trip(trip_id).await?;
            let updated = update.apply(&trip)?;
            match self.store.save_trip(&updated).await {
                Ok(saved) => return Ok(saved),
                Err(StoreError::Conflict(_)) if attempt < self.max_attempts => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn release(
        &self,
        booking_id: Uuid,
        owner: Option<Uuid>,
        expired_at: Option<DateTime<Utc>>,
    ) -> ReservationResult<Booking> {
        let mut attempt = 1;
        loop {
            let (trip, booking) = self.load_pair(booking_id, owner).await?;
            if let Some(now) = expired_at {
                if booking.status != BookingStatus::Hold || !booking.is_hold_expired(now) {
                    return Err(ReconcileError::NotHeld(booking.id).into());
                }
            }
            let active = self.store.active_bookings_for_trip(trip.id).await?;
            let reservation = self.reconciler.release(&trip, &booking, &active)?;

            match self.store.commit_reservation(&reservation.trip, &reservation.booking).await {
                Ok(saved) => {
                    info!(
                        "Booking {} cancelled, trip {} has {} seat(s) open",
                        booking_id, saved.id, saved.seats_available
                    );
                    self.announce(&reservation.booking, &saved).await;
                    return Ok(reservation.booking);
                }
                Err(StoreError::Conflict(id)) if attempt < self.max_attempts => {
                    debug!("Trip {} changed under cancel attempt {}, retrying", id, attempt);
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Trip first, then the booking it carries. Booking status only changes
    /// together with a trip version bump, so a booking read after the trip is
    /// never newer than the version the commit is checked against.
    async fn load_pair(&self, booking_id: Uuid, owner: Option<Uuid>) -> ReservationResult<(Trip, Booking)> {
        let trip_id = self.owned_booking(booking_id, owner).await?.trip_id;
        let trip = self.store.load_trip(trip_id).await?;
        let booking = self.owned_booking(booking_id, owner).await?;
        Ok((trip, booking))
    }

    async fn owned_booking(&self, booking_id: Uuid, owner: Option<Uuid>) -> ReservationResult<Booking> {
        let booking = self.store.load_booking(booking_id).await?;
        match owner {
            Some(user_id) if booking.user_id != user_id => {
                Err(StoreError::booking_not_found(booking_id).into())
            }
            _ => Ok(booking),
        }
    }

    async fn announce(&self, booking: &Booking, trip: &Trip) {
        let event = booking_event(booking, trip.seats_available);
        match serde_json::to_string(&event) {
            Ok(payload) => {
                let key = booking.id.to_string();
                if let Err(e) = self.publisher.publish(topic_for(booking.status), &key, &payload).await {
                    warn!("Failed to publish event for booking {}: {}", booking.id, e);
                }
            }
            Err(e) => warn!("Failed to serialize event for booking {}: {}", booking.id, e),
        }
        if let Some(tx) = &self.live {
            // No subscribers is fine.
            let _ = tx.send(TripEvent::SeatsChanged(event));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use busline_catalog::{Bus, BusType, Location, Route, SeatLayout, SeatType};

    fn trip() -> Trip {
        let start = Utc::now();
        let mut trip = Trip {
            id: Uuid::new_v4(),
            route_id: "R01".into(),
            bus_id: "B01".into(),
            start_time: start,
            end_time: start + Duration::hours(6),
            fare: 750,
            status: TripStatus::Scheduled,
            seats_available: 0,
            route: Route {
                id: "R01".into(),
                origin: Location { name: "Hubli".into(), coords: [15.3592, 75.1240] },
                destination: Location { name: "Bengaluru".into(), coords: [12.9716, 77.5946] },
                stops: vec![],
                distance_km: 411.0,
            },
            bus: Bus {
                id: "B01".into(),
                registration_number: "KA-25-F-1234".into(),
                capacity: 8,
                seat_layout: SeatLayout::generate(2, 5, SeatType::Seater),
                operator: "KSRTC".into(),
                bus_type: BusType::NonAcSeater,
            },
            current_location: None,
            version: 0,
        };
        trip.recount();
        trip
    }

    #[test]
    fn test_update_applies_fields() {
        let t = trip();
        let update = TripUpdate { fare: Some(900), status: Some(TripStatus::Onroute), ..Default::default() };
        let updated = update.apply(&t).unwrap();
        assert_eq!(updated.fare, 900);
        assert_eq!(updated.status, TripStatus::Onroute);
        assert_eq!(updated.seat_layout(), t.seat_layout());
    }

    #[test]
    fn test_update_rejects_invalid_changes() {
        let mut t = trip();
        let update = TripUpdate { fare: Some(-5), ..Default::default() };
        assert_eq!(update.apply(&t).unwrap_err(), CatalogError::NegativeFare(-5));

        t.status = TripStatus::Completed;
        let update = TripUpdate { status: Some(TripStatus::Scheduled), ..Default::default() };
        assert!(matches!(update.apply(&t), Err(CatalogError::InvalidTransition { .. })));
    }

    #[test]
    fn test_book_request_accepts_both_seat_keys() {
        let id = Uuid::new_v4();
        let a: BookRequest =
            serde_json::from_value(serde_json::json!({"tripId": id, "seats": ["A1"]})).unwrap();
        let b: BookRequest =
            serde_json::from_value(serde_json::json!({"tripId": id, "seatIds": ["A1"], "hold": true}))
                .unwrap();
        assert_eq!(a.seats, b.seats);
        assert!(!a.hold);
        assert!(b.hold);
    }

    #[test]
    fn test_book_request_accepts_priced_entries() {
        let req: BookRequest = serde_json::from_value(serde_json::json!({
            "tripId": Uuid::new_v4(),
            "seats": [{"seatId": "A5", "price": 1}, {"seatId": "A6", "price": 1}]
        }))
        .unwrap();
        assert_eq!(req.seats, vec!["A5".to_string(), "A6".to_string()]);
    }
}
