use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Hold,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Hold => "HOLD",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HOLD" => Ok(BookingStatus::Hold),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

/// How a new booking should be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingMode {
    Confirmed,
    Hold { expires_at: DateTime<Utc> },
}

/// A seat bought on a booking, with its price locked in at booking time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingSeat {
    pub seat_id: String,
    pub price: i64,
}

/// A user's claim on a set of seats of one trip. The seat list never
/// changes after creation; only the status moves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub user_id: Uuid,
    pub seats: Vec<BookingSeat>,
    pub total_amount: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn new(trip_id: Uuid, user_id: Uuid, seats: Vec<BookingSeat>, mode: BookingMode, now: DateTime<Utc>) -> Self {
        let total_amount = seats.iter().map(|s| s.price).sum();
        let (status, expires_at) = match mode {
            BookingMode::Confirmed => (BookingStatus::Confirmed, None),
            BookingMode::Hold { expires_at } => (BookingStatus::Hold, Some(expires_at)),
        };

        Self {
            id: Uuid::new_v4(),
            trip_id,
            user_id,
            seats,
            total_amount,
            status,
            created_at: now,
            expires_at,
        }
    }

    /// Holds or confirmed bookings still own their seats.
    pub fn is_active(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }

    pub fn holds_seat(&self, seat_id: &str) -> bool {
        self.seats.iter().any(|s| s.seat_id == seat_id)
    }

    pub fn seat_ids(&self) -> Vec<String> {
        self.seats.iter().map(|s| s.seat_id.clone()).collect()
    }

    pub fn seats_total(&self) -> i64 {
        self.seats.iter().map(|s| s.price).sum()
    }

    pub fn is_hold_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Hold && self.expires_at.is_some_and(|at| now >= at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn seats() -> Vec<BookingSeat> {
        vec![
            BookingSeat { seat_id: "A5".into(), price: 750 },
            BookingSeat { seat_id: "A6".into(), price: 750 },
        ]
    }

    #[test]
    fn test_total_is_sum_of_seat_prices() {
        let booking = Booking::new(Uuid::new_v4(), Uuid::new_v4(), seats(), BookingMode::Confirmed, Utc::now());
        assert_eq!(booking.total_amount, 1500);
        assert_eq!(booking.total_amount, booking.seats_total());
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert!(booking.expires_at.is_none());
        assert!(booking.holds_seat("A6"));
        assert!(!booking.holds_seat("A7"));
    }

    #[test]
    fn test_hold_expiry() {
        let now = Utc::now();
        let booking = Booking::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            seats(),
            BookingMode::Hold { expires_at: now + Duration::minutes(10) },
            now,
        );
        assert_eq!(booking.status, BookingStatus::Hold);
        assert!(booking.is_active());
        assert!(!booking.is_hold_expired(now));
        assert!(booking.is_hold_expired(now + Duration::minutes(10)));
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [BookingStatus::Hold, BookingStatus::Confirmed, BookingStatus::Cancelled] {
            assert_eq!(status.as_str().parse::<BookingStatus>(), Ok(status));
        }
        assert!("PENDING".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_wire_format() {
        let booking = Booking::new(Uuid::nil(), Uuid::nil(), seats(), BookingMode::Confirmed, Utc::now());
        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(json["status"], "CONFIRMED");
        assert_eq!(json["totalAmount"], 1500);
        assert_eq!(json["seats"][0]["seatId"], "A5");
        assert!(json.get("expiresAt").is_none());
    }
}
