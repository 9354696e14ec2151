pub mod seat;
pub mod trip;
pub mod grid;

pub use seat::{Seat, SeatLayout, SeatStatus, SeatType};
pub use trip::{Bus, BusType, Location, Route, Trip, TripDraft, TripStatus};
pub use grid::{render_grid, GridCell};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CatalogError {
    #[error("Fare must be non-negative, got {0}")]
    NegativeFare(i64),

    #[error("Seat {0} carries the client-only status 'selected'")]
    TransientSeatStatus(String),

    #[error("Seat id {0} appears more than once in the layout")]
    DuplicateSeat(String),

    #[error("Trip must end after it starts")]
    InvalidSchedule,

    #[error("Trip cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}
