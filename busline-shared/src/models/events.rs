use uuid::Uuid;

pub const TOPIC_BOOKING_CONFIRMED: &str = "booking.confirmed";
pub const TOPIC_BOOKING_HELD: &str = "booking.held";
pub const TOPIC_BOOKING_CANCELLED: &str = "booking.cancelled";
pub const TOPIC_TRIP_LOCATION: &str = "trip.location";

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingEvent {
    pub booking_id: Uuid,
    pub trip_id: Uuid,
    pub user_id: Uuid,
    pub seat_ids: Vec<String>,
    pub total_amount: i64,
    pub status: String,
    pub seats_available: u32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationEvent {
    pub trip_id: Uuid,
    pub coords: [f64; 2],
    pub timestamp: i64,
}

/// Fan-out payload for live trip subscribers (SSE).
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TripEvent {
    SeatsChanged(BookingEvent),
    LocationUpdated(LocationEvent),
}

impl TripEvent {
    pub fn trip_id(&self) -> Uuid {
        match self {
            TripEvent::SeatsChanged(e) => e.trip_id,
            TripEvent::LocationUpdated(e) => e.trip_id,
        }
    }

    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            TripEvent::SeatsChanged(_) => "seats_changed",
            TripEvent::LocationUpdated(_) => "location_updated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_event_is_tagged() {
        let event = TripEvent::LocationUpdated(LocationEvent {
            trip_id: Uuid::nil(),
            coords: [14.5, 76.0],
            timestamp: 0,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "locationUpdated");
        assert_eq!(json["coords"][0], 14.5);
        assert_eq!(event.name(), "location_updated");
    }
}
