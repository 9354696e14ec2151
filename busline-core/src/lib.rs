pub mod events;
pub mod search;
pub mod repository;
pub mod identity;
pub mod feed;
pub mod reservation;
pub mod tracking;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

pub use identity::{AuthenticatedUser, User, UserProfile};
pub use repository::{BookingRepository, ReservationStore, StoreError, StoreResult, TripRepository, UserRepository};
pub use reservation::{BookRequest, ReservationError, ReservationService, TripUpdate};
pub use events::{EventPublisher, LogPublisher};
pub use feed::{LocationFeed, RouteInterpolationFeed};
pub use search::TripQuery;
pub use tracking::LocationTracker;
