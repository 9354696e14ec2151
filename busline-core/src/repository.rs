use async_trait::async_trait;
use busline_catalog::{Trip, TripStatus};
use busline_order::Booking;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::identity::User;
use crate::search::TripQuery;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Version check failed; reload and try again.
    #[error("Trip {0} was modified concurrently")]
    Conflict(Uuid),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn trip_not_found(id: Uuid) -> Self {
        StoreError::NotFound { entity: "Trip", id: id.to_string() }
    }

    pub fn booking_not_found(id: Uuid) -> Self {
        StoreError::NotFound { entity: "Booking", id: id.to_string() }
    }

    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        StoreError::Backend(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Repository trait for trip data access.
///
/// Seat data is guarded by `Trip::version`: every write that carries seats
/// must present the version it read and fails with `Conflict` otherwise.
/// `current_location` is owned by `update_location` and is never overwritten
/// by the version-checked writes.
#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn insert_trip(&self, trip: &Trip) -> StoreResult<()>;

    async fn load_trip(&self, id: Uuid) -> StoreResult<Trip>;

    /// Version-checked write; returns the trip as stored (version bumped).
    async fn save_trip(&self, trip: &Trip) -> StoreResult<Trip>;

    /// Bookable trips matching the query, earliest departure first.
    async fn search_trips(&self, query: &TripQuery) -> StoreResult<Vec<Trip>>;

    async fn list_trips_by_status(&self, status: TripStatus) -> StoreResult<Vec<Trip>>;

    async fn update_location(&self, id: Uuid, coords: [f64; 2]) -> StoreResult<()>;
}

/// Repository trait for booking data access
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create_booking(&self, booking: &Booking) -> StoreResult<Booking>;

    async fn load_booking(&self, id: Uuid) -> StoreResult<Booking>;

    async fn save_booking(&self, booking: &Booking) -> StoreResult<()>;

    /// Newest first.
    async fn list_user_bookings(&self, user_id: Uuid) -> StoreResult<Vec<Booking>>;

    /// HOLD and CONFIRMED bookings of one trip.
    async fn active_bookings_for_trip(&self, trip_id: Uuid) -> StoreResult<Vec<Booking>>;

    /// HOLD bookings whose expiry is at or before `now`.
    async fn expired_holds(&self, now: DateTime<Utc>) -> StoreResult<Vec<Booking>>;
}

/// Trip and booking writes that must land together.
#[async_trait]
pub trait ReservationStore: TripRepository + BookingRepository {
    /// Version-checked trip write plus booking upsert, atomically. On
    /// `Conflict` neither record changes.
    async fn commit_reservation(&self, trip: &Trip, booking: &Booking) -> StoreResult<Trip>;
}

/// Repository trait for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Duplicate` when the (lower-cased) email is taken.
    async fn create_user(&self, user: &User) -> StoreResult<()>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
}
