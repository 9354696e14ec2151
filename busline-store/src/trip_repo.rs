use async_trait::async_trait;
use busline_catalog::{Trip, TripStatus};
use busline_core::repository::{StoreError, StoreResult, TripRepository};
use busline_core::search::TripQuery;
use chrono::{DateTime, Duration, Utc};
use sqlx::types::Json;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::database::PgStore;

const TRIP_COLUMNS: &str = "version, doc, current_lat, current_lng";

#[derive(sqlx::FromRow)]
pub(crate) struct TripRow {
    version: i64,
    doc: Json<Trip>,
    current_lat: Option<f64>,
    current_lng: Option<f64>,
}

impl TripRow {
    pub(crate) fn into_trip(self) -> Trip {
        let mut trip = self.doc.0;
        trip.version = self.version;
        trip.current_location = match (self.current_lat, self.current_lng) {
            (Some(lat), Some(lng)) => Some([lat, lng]),
            _ => None,
        };
        trip
    }
}

/// Version-checked update. `None` means the row is missing or has moved on.
pub(crate) async fn compare_and_swap<'e, E: PgExecutor<'e>>(
    executor: E,
    trip: &Trip,
) -> Result<Option<TripRow>, sqlx::Error> {
    let query = format!(
        r#"
        UPDATE trips
        SET version = version + 1, origin = $3, destination = $4, start_time = $5, status = $6, doc = $7
        WHERE id = $1 AND version = $2
        RETURNING {}
        "#,
        TRIP_COLUMNS
    );
    sqlx::query_as::<_, TripRow>(&query)
        .bind(trip.id)
        .bind(trip.version)
        .bind(&trip.route.origin.name)
        .bind(&trip.route.destination.name)
        .bind(trip.start_time)
        .bind(trip.status.as_str())
        .bind(Json(trip))
        .fetch_optional(executor)
        .await
}

impl PgStore {
    /// Tell a stale version apart from a missing trip after a failed swap.
    pub(crate) async fn swap_failure(&self, id: Uuid) -> StoreError {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM trips WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await;
        match exists {
            Ok(0) => StoreError::trip_not_found(id),
            Ok(_) => StoreError::Conflict(id),
            Err(e) => StoreError::backend(e),
        }
    }
}

fn day_bounds(query: &TripQuery) -> StoreResult<(DateTime<Utc>, DateTime<Utc>)> {
    let start = query
        .date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| StoreError::Backend(format!("invalid date {}", query.date)))?
        .and_utc();
    Ok((start, start + Duration::days(1)))
}

#[async_trait]
impl TripRepository for PgStore {
    async fn insert_trip(&self, trip: &Trip) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO trips (id, version, origin, destination, start_time, status, current_lat, current_lng, doc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(trip.id)
        .bind(trip.version)
        .bind(&trip.route.origin.name)
        .bind(&trip.route.destination.name)
        .bind(trip.start_time)
        .bind(trip.status.as_str())
        .bind(trip.current_location.map(|c| c[0]))
        .bind(trip.current_location.map(|c| c[1]))
        .bind(Json(trip))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Duplicate(format!("Trip {}", trip.id)))
            }
            Err(e) => Err(StoreError::backend(e)),
        }
    }

    async fn load_trip(&self, id: Uuid) -> StoreResult<Trip> {
        let query = format!("SELECT {} FROM trips WHERE id = $1", TRIP_COLUMNS);
        sqlx::query_as::<_, TripRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?
            .map(TripRow::into_trip)
            .ok_or_else(|| StoreError::trip_not_found(id))
    }

    async fn save_trip(&self, trip: &Trip) -> StoreResult<Trip> {
        match compare_and_swap(&self.pool, trip).await.map_err(StoreError::backend)? {
            Some(row) => Ok(row.into_trip()),
            None => Err(self.swap_failure(trip.id).await),
        }
    }

    async fn search_trips(&self, query: &TripQuery) -> StoreResult<Vec<Trip>> {
        let (from, until) = day_bounds(query)?;
        let sql = format!(
            r#"
            SELECT {}
            FROM trips
            WHERE LOWER(origin) = LOWER($1)
              AND LOWER(destination) = LOWER($2)
              AND start_time >= $3 AND start_time < $4
              AND status IN ('scheduled', 'onroute')
            ORDER BY start_time ASC
            "#,
            TRIP_COLUMNS
        );
        let rows = sqlx::query_as::<_, TripRow>(&sql)
            .bind(query.from.trim())
            .bind(query.to.trim())
            .bind(from)
            .bind(until)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(rows.into_iter().map(TripRow::into_trip).collect())
    }

    async fn list_trips_by_status(&self, status: TripStatus) -> StoreResult<Vec<Trip>> {
        let sql = format!(
            "SELECT {} FROM trips WHERE status = $1 ORDER BY start_time ASC",
            TRIP_COLUMNS
        );
        let rows = sqlx::query_as::<_, TripRow>(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(rows.into_iter().map(TripRow::into_trip).collect())
    }

    async fn update_location(&self, id: Uuid, coords: [f64; 2]) -> StoreResult<()> {
        let result = sqlx::query("UPDATE trips SET current_lat = $2, current_lng = $3 WHERE id = $1")
            .bind(id)
            .bind(coords[0])
            .bind(coords[1])
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::trip_not_found(id));
        }
        Ok(())
    }
}
