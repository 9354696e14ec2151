//! Seat inventory reconciliation.
//!
//! Every operation works on copies and hands back the new trip and booking
//! records; the caller persists both together or neither. Nothing here
//! retries or talks to storage.

use busline_catalog::{SeatStatus, Trip};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Booking, BookingMode, BookingSeat, BookingStatus};

/// Upper bound on seats per booking unless configured otherwise.
pub const DEFAULT_MAX_SEATS: usize = 6;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ReconcileError {
    #[error("No seats selected")]
    EmptySelection,

    #[error("Seat {0} not found")]
    SeatNotFound(String),

    #[error("Seat {0} is already booked")]
    SeatUnavailable(String),

    #[error("At most {max} seats can be booked at once, {requested} requested")]
    TooManySeats { requested: usize, max: usize },

    #[error("Trip {trip_id} is {status} and no longer accepts bookings")]
    TripNotBookable { trip_id: Uuid, status: String },

    #[error("Booking {0} is already cancelled")]
    AlreadyCancelled(Uuid),

    #[error("Booking {booking_id} does not belong to trip {trip_id}")]
    BookingMismatch { booking_id: Uuid, trip_id: Uuid },

    #[error("Booking {0} is not on hold")]
    NotHeld(Uuid),

    #[error("Hold on booking {0} has expired")]
    HoldExpired(Uuid),

    #[error("Seat status '{0}' cannot be persisted")]
    TransientStatus(String),

    #[error("Seat {seat_id} is held by booking {booking_id}")]
    SeatHeld { seat_id: String, booking_id: Uuid },
}

/// Trip and booking produced by one reconciliation step.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub trip: Trip,
    pub booking: Booking,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    max_seats: usize,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SEATS)
    }
}

impl Reconciler {
    pub fn new(max_seats: usize) -> Self {
        Self { max_seats }
    }

    /// Book `seat_ids` on `trip` for `user_id`.
    ///
    /// Seats are priced at the trip's fare at this moment. Repeated ids count
    /// once.
    pub fn reserve(
        &self,
        trip: &Trip,
        seat_ids: &[String],
        user_id: Uuid,
        mode: BookingMode,
        now: DateTime<Utc>,
    ) -> Result<Reservation, ReconcileError> {
        if seat_ids.is_empty() {
            return Err(ReconcileError::EmptySelection);
        }
        if !trip.status.is_bookable() {
            return Err(ReconcileError::TripNotBookable {
                trip_id: trip.id,
                status: trip.status.as_str().to_string(),
            });
        }

        let requested = dedup(seat_ids);
        if requested.len() > self.max_seats {
            return Err(ReconcileError::TooManySeats {
                requested: requested.len(),
                max: self.max_seats,
            });
        }

        for seat_id in &requested {
            let seat = trip
                .seat_layout()
                .seat(seat_id)
                .ok_or_else(|| ReconcileError::SeatNotFound(seat_id.clone()))?;
            if seat.status == SeatStatus::Booked {
                return Err(ReconcileError::SeatUnavailable(seat_id.clone()));
            }
        }

        let mut updated = trip.clone();
        for seat_id in &requested {
            if let Some(seat) = updated.seat_layout_mut().seat_mut(seat_id) {
                seat.status = SeatStatus::Booked;
            }
        }
        updated.recount();

        let seats = requested
            .into_iter()
            .map(|seat_id| BookingSeat { seat_id, price: trip.fare })
            .collect();
        let booking = Booking::new(trip.id, user_id, seats, mode, now);

        debug!(
            "Reserved {} seat(s) on trip {} for user {} ({} left)",
            booking.seats.len(),
            trip.id,
            user_id,
            updated.seats_available
        );

        Ok(Reservation { trip: updated, booking })
    }

    /// Cancel `booking` and give its seats back to `trip`.
    ///
    /// A seat that some booking in `active` (other than this one) still
    /// claims stays booked.
    pub fn release(
        &self,
        trip: &Trip,
        booking: &Booking,
        active: &[Booking],
    ) -> Result<Reservation, ReconcileError> {
        if booking.status == BookingStatus::Cancelled {
            return Err(ReconcileError::AlreadyCancelled(booking.id));
        }
        if booking.trip_id != trip.id {
            return Err(ReconcileError::BookingMismatch {
                booking_id: booking.id,
                trip_id: trip.id,
            });
        }

        let others: Vec<&Booking> = active
            .iter()
            .filter(|b| b.id != booking.id && b.trip_id == trip.id && b.is_active())
            .collect();

        let mut updated = trip.clone();
        for booked in &booking.seats {
            if others.iter().any(|b| b.holds_seat(&booked.seat_id)) {
                debug!(
                    "Seat {} on trip {} is claimed by another booking, leaving it booked",
                    booked.seat_id, trip.id
                );
                continue;
            }
            if let Some(seat) = updated.seat_layout_mut().seat_mut(&booked.seat_id) {
                seat.status = seat.released_status();
            }
        }
        updated.recount();

        let mut cancelled = booking.clone();
        cancelled.status = BookingStatus::Cancelled;

        Ok(Reservation { trip: updated, booking: cancelled })
    }

    /// Finalize a held booking.
    pub fn confirm_hold(&self, booking: &Booking, now: DateTime<Utc>) -> Result<Booking, ReconcileError> {
        if booking.status != BookingStatus::Hold {
            return Err(ReconcileError::NotHeld(booking.id));
        }
        if booking.is_hold_expired(now) {
            return Err(ReconcileError::HoldExpired(booking.id));
        }

        let mut confirmed = booking.clone();
        confirmed.status = BookingStatus::Confirmed;
        confirmed.expires_at = None;
        Ok(confirmed)
    }

    /// Operator override of persisted seat status.
    ///
    /// A seat claimed by a booking in `active` cannot be opened; cancel the
    /// booking instead.
    pub fn set_seat_status(
        &self,
        trip: &Trip,
        seat_ids: &[String],
        status: SeatStatus,
        active: &[Booking],
    ) -> Result<Trip, ReconcileError> {
        if !status.is_persistable() {
            return Err(ReconcileError::TransientStatus("selected".to_string()));
        }
        if seat_ids.is_empty() {
            return Err(ReconcileError::EmptySelection);
        }

        let mut updated = trip.clone();
        for seat_id in dedup(seat_ids) {
            let seat = updated
                .seat_layout_mut()
                .seat_mut(&seat_id)
                .ok_or_else(|| ReconcileError::SeatNotFound(seat_id.clone()))?;
            if status.is_open() {
                let holder = active
                    .iter()
                    .find(|b| b.trip_id == trip.id && b.is_active() && b.holds_seat(&seat_id));
                if let Some(holder) = holder {
                    return Err(ReconcileError::SeatHeld { seat_id, booking_id: holder.id });
                }
            }
            seat.status = status;
        }
        updated.recount();
        Ok(updated)
    }
}

fn dedup(seat_ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    seat_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}
