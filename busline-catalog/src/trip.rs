use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::seat::SeatLayout;
use crate::CatalogError;

/// Named point, coords are `[lat, lng]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub name: String,
    pub coords: [f64; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub origin: Location,
    pub destination: Location,
    #[serde(default)]
    pub stops: Vec<Location>,
    pub distance_km: f64,
}

impl Route {
    /// Origin, intermediate stops and destination, in travel order.
    pub fn waypoints(&self) -> Vec<&Location> {
        std::iter::once(&self.origin)
            .chain(self.stops.iter())
            .chain(std::iter::once(&self.destination))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BusType {
    #[serde(rename = "Non-AC Seater")]
    NonAcSeater,
    #[serde(rename = "AC Sleeper")]
    AcSleeper,
    #[serde(rename = "Volvo Multi-Axle")]
    VolvoMultiAxle,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    pub id: String,
    pub registration_number: String,
    pub capacity: u32,
    pub seat_layout: SeatLayout,
    pub operator: String,
    #[serde(rename = "type")]
    pub bus_type: BusType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    #[default]
    Scheduled,
    Onroute,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Scheduled => "scheduled",
            TripStatus::Onroute => "onroute",
            TripStatus::Completed => "completed",
            TripStatus::Cancelled => "cancelled",
        }
    }

    /// Trips that still accept bookings and appear in search.
    pub fn is_bookable(&self) -> bool {
        matches!(self, TripStatus::Scheduled | TripStatus::Onroute)
    }

    /// Completed and cancelled are terminal.
    pub fn can_transition_to(&self, next: TripStatus) -> bool {
        *self == next || self.is_bookable()
    }
}

/// One scheduled journey. The trip owns its bus and seat layout outright.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: Uuid,
    pub route_id: String,
    pub bus_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub fare: i64,
    pub status: TripStatus,
    pub seats_available: u32,
    pub route: Route,
    pub bus: Bus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_location: Option<[f64; 2]>,
    /// Optimistic-concurrency counter, bumped by every seat write.
    #[serde(default)]
    pub version: i64,
}

impl Trip {
    pub fn seat_layout(&self) -> &SeatLayout {
        &self.bus.seat_layout
    }

    pub fn seat_layout_mut(&mut self) -> &mut SeatLayout {
        &mut self.bus.seat_layout
    }

    /// Re-derive `seats_available` from the seat list.
    pub fn recount(&mut self) {
        self.seats_available = self.bus.seat_layout.open_count();
    }

    pub fn is_consistent(&self) -> bool {
        self.seats_available == self.bus.seat_layout.open_count()
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.fare < 0 {
            return Err(CatalogError::NegativeFare(self.fare));
        }
        if self.end_time <= self.start_time {
            return Err(CatalogError::InvalidSchedule);
        }
        self.bus.seat_layout.validate()
    }
}

/// Trip as submitted by an operator; the server assigns id, count and version.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDraft {
    pub route_id: String,
    pub bus_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub fare: i64,
    #[serde(default)]
    pub status: TripStatus,
    pub route: Route,
    pub bus: Bus,
    #[serde(default)]
    pub current_location: Option<[f64; 2]>,
}

impl TripDraft {
    pub fn into_trip(self, id: Uuid) -> Result<Trip, CatalogError> {
        let mut trip = Trip {
            id,
            route_id: self.route_id,
            bus_id: self.bus_id,
            start_time: self.start_time,
            end_time: self.end_time,
            fare: self.fare,
            status: self.status,
            seats_available: 0,
            route: self.route,
            bus: self.bus,
            current_location: self.current_location,
            version: 0,
        };
        trip.validate()?;
        trip.recount();
        Ok(trip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seat::{SeatStatus, SeatType};
    use chrono::Duration;

    fn draft() -> TripDraft {
        let start = Utc::now();
        TripDraft {
            route_id: "R01".into(),
            bus_id: "B01".into(),
            start_time: start,
            end_time: start + Duration::hours(8),
            fare: 750,
            status: TripStatus::Scheduled,
            route: Route {
                id: "R01".into(),
                origin: Location { name: "Hubli".into(), coords: [15.3592, 75.1240] },
                destination: Location { name: "Bengaluru".into(), coords: [12.9716, 77.5946] },
                stops: vec![Location { name: "Davanagere".into(), coords: [14.4645, 75.9218] }],
                distance_km: 411.0,
            },
            bus: Bus {
                id: "B01".into(),
                registration_number: "KA-19-F-3456".into(),
                capacity: 8,
                seat_layout: SeatLayout::generate(2, 5, SeatType::Seater),
                operator: "KSRTC".into(),
                bus_type: BusType::VolvoMultiAxle,
            },
            current_location: None,
        }
    }

    #[test]
    fn test_draft_derives_seat_count() {
        let mut d = draft();
        d.bus.seat_layout.seats[0].status = SeatStatus::Booked;
        let trip = d.into_trip(Uuid::new_v4()).unwrap();
        assert_eq!(trip.seats_available, 7);
        assert!(trip.is_consistent());
        assert_eq!(trip.version, 0);
    }

    #[test]
    fn test_draft_rejects_bad_input() {
        let mut d = draft();
        d.fare = -1;
        assert_eq!(d.into_trip(Uuid::new_v4()).unwrap_err(), CatalogError::NegativeFare(-1));

        let mut d = draft();
        d.end_time = d.start_time;
        assert_eq!(d.into_trip(Uuid::new_v4()).unwrap_err(), CatalogError::InvalidSchedule);

        let mut d = draft();
        d.bus.seat_layout.seats[2].status = SeatStatus::Selected;
        assert!(matches!(d.into_trip(Uuid::new_v4()), Err(CatalogError::TransientSeatStatus(_))));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(TripStatus::Scheduled.can_transition_to(TripStatus::Onroute));
        assert!(TripStatus::Onroute.can_transition_to(TripStatus::Completed));
        assert!(TripStatus::Scheduled.can_transition_to(TripStatus::Cancelled));
        assert!(!TripStatus::Completed.can_transition_to(TripStatus::Onroute));
        assert!(!TripStatus::Cancelled.can_transition_to(TripStatus::Scheduled));
    }

    #[test]
    fn test_waypoints_in_travel_order() {
        let trip = draft().into_trip(Uuid::new_v4()).unwrap();
        let names: Vec<&str> = trip.route.waypoints().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Hubli", "Davanagere", "Bengaluru"]);
    }

    #[test]
    fn test_trip_wire_format() {
        let trip = draft().into_trip(Uuid::nil()).unwrap();
        let json = serde_json::to_value(&trip).unwrap();
        assert_eq!(json["seatsAvailable"], 8);
        assert_eq!(json["status"], "scheduled");
        assert_eq!(json["bus"]["type"], "Volvo Multi-Axle");
        assert_eq!(json["bus"]["seatLayout"]["cols"], 5);
        assert!(json.get("currentLocation").is_none());
    }
}
