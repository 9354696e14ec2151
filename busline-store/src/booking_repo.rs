use async_trait::async_trait;
use busline_catalog::Trip;
use busline_core::repository::{BookingRepository, ReservationStore, StoreError, StoreResult};
use busline_order::{Booking, BookingSeat, BookingStatus};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgExecutor;
use tracing::debug;
use uuid::Uuid;

use crate::database::PgStore;
use crate::trip_repo::compare_and_swap;

const BOOKING_COLUMNS: &str = "id, trip_id, user_id, seats, total_amount, status, created_at, expires_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    trip_id: Uuid,
    user_id: Uuid,
    seats: Json<Vec<BookingSeat>>,
    total_amount: i64,
    status: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status: BookingStatus = row.status.parse().map_err(StoreError::Backend)?;
        Ok(Booking {
            id: row.id,
            trip_id: row.trip_id,
            user_id: row.user_id,
            seats: row.seats.0,
            total_amount: row.total_amount,
            status,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

fn into_bookings(rows: Vec<BookingRow>) -> StoreResult<Vec<Booking>> {
    rows.into_iter().map(Booking::try_from).collect()
}

async fn upsert_booking<'e, E: PgExecutor<'e>>(executor: E, booking: &Booking) -> Result<(), sqlx::Error> {
    // Seats and price are fixed at creation; only status and expiry move.
    sqlx::query(
        r#"
        INSERT INTO bookings (id, trip_id, user_id, seats, total_amount, status, created_at, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status, expires_at = EXCLUDED.expires_at
        "#,
    )
    .bind(booking.id)
    .bind(booking.trip_id)
    .bind(booking.user_id)
    .bind(Json(&booking.seats))
    .bind(booking.total_amount)
    .bind(booking.status.as_str())
    .bind(booking.created_at)
    .bind(booking.expires_at)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl BookingRepository for PgStore {
    async fn create_booking(&self, booking: &Booking) -> StoreResult<Booking> {
        let result = sqlx::query(
            r#"
            INSERT INTO bookings (id, trip_id, user_id, seats, total_amount, status, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(booking.id)
        .bind(booking.trip_id)
        .bind(booking.user_id)
        .bind(Json(&booking.seats))
        .bind(booking.total_amount)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .bind(booking.expires_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(booking.clone()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Duplicate(format!("Booking {}", booking.id)))
            }
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                Err(StoreError::trip_not_found(booking.trip_id))
            }
            Err(e) => Err(StoreError::backend(e)),
        }
    }

    async fn load_booking(&self, id: Uuid) -> StoreResult<Booking> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?
            .ok_or_else(|| StoreError::booking_not_found(id))?;
        row.try_into()
    }

    async fn save_booking(&self, booking: &Booking) -> StoreResult<()> {
        let result = sqlx::query("UPDATE bookings SET status = $2, expires_at = $3 WHERE id = $1")
            .bind(booking.id)
            .bind(booking.status.as_str())
            .bind(booking.expires_at)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::booking_not_found(booking.id));
        }
        Ok(())
    }

    async fn list_user_bookings(&self, user_id: Uuid) -> StoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
            BOOKING_COLUMNS
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        into_bookings(rows)
    }

    async fn active_bookings_for_trip(&self, trip_id: Uuid) -> StoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE trip_id = $1 AND status IN ('HOLD', 'CONFIRMED')",
            BOOKING_COLUMNS
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(trip_id)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        into_bookings(rows)
    }

    async fn expired_holds(&self, now: DateTime<Utc>) -> StoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE status = 'HOLD' AND expires_at <= $1 ORDER BY expires_at ASC",
            BOOKING_COLUMNS
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        into_bookings(rows)
    }
}

#[async_trait]
impl ReservationStore for PgStore {
    async fn commit_reservation(&self, trip: &Trip, booking: &Booking) -> StoreResult<Trip> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        let saved = match compare_and_swap(&mut *tx, trip).await.map_err(StoreError::backend)? {
            Some(row) => row.into_trip(),
            None => {
                tx.rollback().await.map_err(StoreError::backend)?;
                return Err(self.swap_failure(trip.id).await);
            }
        };

        upsert_booking(&mut *tx, booking).await.map_err(StoreError::backend)?;
        tx.commit().await.map_err(StoreError::backend)?;

        debug!(
            "Committed booking {} ({}) with trip {} at version {}",
            booking.id, booking.status, saved.id, saved.version
        );
        Ok(saved)
    }
}
