use async_trait::async_trait;
use busline_order::Booking;
use busline_shared::models::events::{
    BookingEvent, TOPIC_BOOKING_CANCELLED, TOPIC_BOOKING_CONFIRMED, TOPIC_BOOKING_HELD,
};
use busline_order::BookingStatus;
use chrono::Utc;

/// Outbound domain events (Kafka in production).
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Publisher used when no broker is configured: events only hit the log.
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::debug!("Event {} [{}]: {}", topic, key, payload);
        Ok(())
    }
}

pub fn topic_for(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Hold => TOPIC_BOOKING_HELD,
        BookingStatus::Confirmed => TOPIC_BOOKING_CONFIRMED,
        BookingStatus::Cancelled => TOPIC_BOOKING_CANCELLED,
    }
}

pub fn booking_event(booking: &Booking, seats_available: u32) -> BookingEvent {
    BookingEvent {
        booking_id: booking.id,
        trip_id: booking.trip_id,
        user_id: booking.user_id,
        seat_ids: booking.seat_ids(),
        total_amount: booking.total_amount,
        status: booking.status.to_string(),
        seats_available,
        timestamp: Utc::now().timestamp(),
    }
}
