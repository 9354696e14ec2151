pub mod events;

pub use events::{BookingEvent, LocationEvent, TripEvent};
