use std::collections::HashMap;

use async_trait::async_trait;
use busline_catalog::{Trip, TripStatus};
use busline_core::identity::normalize_email;
use busline_core::repository::{
    BookingRepository, ReservationStore, StoreError, StoreResult, TripRepository, UserRepository,
};
use busline_core::search::TripQuery;
use busline_core::User;
use busline_order::{Booking, BookingStatus};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    trips: HashMap<Uuid, Trip>,
    bookings: HashMap<Uuid, Booking>,
    users: HashMap<Uuid, User>,
}

impl Tables {
    /// Same contract as the Postgres swap: version must match, the stored
    /// location wins.
    fn swap_trip(&mut self, trip: &Trip) -> StoreResult<Trip> {
        let stored = self
            .trips
            .get_mut(&trip.id)
            .ok_or_else(|| StoreError::trip_not_found(trip.id))?;
        if stored.version != trip.version {
            return Err(StoreError::Conflict(trip.id));
        }
        let location = stored.current_location;
        *stored = trip.clone();
        stored.version += 1;
        stored.current_location = location;
        Ok(stored.clone())
    }
}

/// Process-local store used for development runs and tests.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TripRepository for InMemoryStore {
    async fn insert_trip(&self, trip: &Trip) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.trips.contains_key(&trip.id) {
            return Err(StoreError::Duplicate(format!("Trip {}", trip.id)));
        }
        tables.trips.insert(trip.id, trip.clone());
        Ok(())
    }

    async fn load_trip(&self, id: Uuid) -> StoreResult<Trip> {
        self.tables
            .read()
            .await
            .trips
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::trip_not_found(id))
    }

    async fn save_trip(&self, trip: &Trip) -> StoreResult<Trip> {
        self.tables.write().await.swap_trip(trip)
    }

    async fn search_trips(&self, query: &TripQuery) -> StoreResult<Vec<Trip>> {
        let tables = self.tables.read().await;
        let mut trips: Vec<Trip> = tables.trips.values().filter(|t| query.matches(t)).cloned().collect();
        trips.sort_by_key(|t| t.start_time);
        Ok(trips)
    }

    async fn list_trips_by_status(&self, status: TripStatus) -> StoreResult<Vec<Trip>> {
        let tables = self.tables.read().await;
        let mut trips: Vec<Trip> = tables.trips.values().filter(|t| t.status == status).cloned().collect();
        trips.sort_by_key(|t| t.start_time);
        Ok(trips)
    }

    async fn update_location(&self, id: Uuid, coords: [f64; 2]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let trip = tables.trips.get_mut(&id).ok_or_else(|| StoreError::trip_not_found(id))?;
        trip.current_location = Some(coords);
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn create_booking(&self, booking: &Booking) -> StoreResult<Booking> {
        let mut tables = self.tables.write().await;
        if !tables.trips.contains_key(&booking.trip_id) {
            return Err(StoreError::trip_not_found(booking.trip_id));
        }
        if tables.bookings.contains_key(&booking.id) {
            return Err(StoreError::Duplicate(format!("Booking {}", booking.id)));
        }
        tables.bookings.insert(booking.id, booking.clone());
        Ok(booking.clone())
    }

    async fn load_booking(&self, id: Uuid) -> StoreResult<Booking> {
        self.tables
            .read()
            .await
            .bookings
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::booking_not_found(id))
    }

    async fn save_booking(&self, booking: &Booking) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .bookings
            .get_mut(&booking.id)
            .ok_or_else(|| StoreError::booking_not_found(booking.id))?;
        stored.status = booking.status;
        stored.expires_at = booking.expires_at;
        Ok(())
    }

    async fn list_user_bookings(&self, user_id: Uuid) -> StoreResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        let mut bookings: Vec<Booking> =
            tables.bookings.values().filter(|b| b.user_id == user_id).cloned().collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn active_bookings_for_trip(&self, trip_id: Uuid) -> StoreResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .values()
            .filter(|b| b.trip_id == trip_id && b.is_active())
            .cloned()
            .collect())
    }

    async fn expired_holds(&self, now: DateTime<Utc>) -> StoreResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .values()
            .filter(|b| b.status == BookingStatus::Hold && b.is_hold_expired(now))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn commit_reservation(&self, trip: &Trip, booking: &Booking) -> StoreResult<Trip> {
        let mut tables = self.tables.write().await;
        let saved = tables.swap_trip(trip)?;
        match tables.bookings.get_mut(&booking.id) {
            Some(stored) => {
                stored.status = booking.status;
                stored.expires_at = booking.expires_at;
            }
            None => {
                tables.bookings.insert(booking.id, booking.clone());
            }
        }
        Ok(saved)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let email = normalize_email(&user.email);
        if tables.users.values().any(|u| u.email == email) {
            return Err(StoreError::Duplicate("User".to_string()));
        }
        let mut stored = user.clone();
        stored.email = email;
        tables.users.insert(stored.id, stored);
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }
}
