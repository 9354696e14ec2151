pub mod models;
pub mod reconciler;

pub use models::{Booking, BookingMode, BookingSeat, BookingStatus};
pub use reconciler::{Reconciler, ReconcileError, Reservation, DEFAULT_MAX_SEATS};
