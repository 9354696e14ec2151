use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, patch, post, put},
    Json, Router,
};
use busline_catalog::grid::aisle_column;
use busline_catalog::{render_grid, SeatStatus, TripDraft};
use busline_core::{TripQuery, TripUpdate};
use busline_shared::models::TripEvent;
use chrono::NaiveDate;
use futures_util::stream::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::middleware::auth::user_auth_middleware;
use crate::{error::AppError, state::AppState};

pub fn routes(state: AppState) -> Router<AppState> {
    let operator = Router::new()
        .route("/", post(create_trip))
        .route("/{id}", put(update_trip))
        .route("/{id}/seats", patch(update_seats))
        .route_layer(middleware::from_fn_with_state(state, user_auth_middleware));

    Router::new()
        .route("/search", get(search_trips))
        .route("/{id}", get(get_trip))
        .route("/{id}/seat-map", get(seat_map))
        .route("/{id}/stream", get(stream_trip))
        .merge(operator)
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    from: Option<String>,
    to: Option<String>,
    date: Option<String>,
}

impl SearchParams {
    fn into_query(self) -> Result<TripQuery, AppError> {
        let (Some(from), Some(to), Some(date)) = (self.from, self.to, self.date) else {
            return Err(AppError::ValidationError("From, to, and date are required".to_string()));
        };
        if from.trim().is_empty() || to.trim().is_empty() {
            return Err(AppError::ValidationError("From, to, and date are required".to_string()));
        }
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::ValidationError("Date must be formatted YYYY-MM-DD".to_string()))?;
        Ok(TripQuery { from, to, date })
    }
}

async fn search_trips(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, AppError> {
    let query = params.into_query()?;
    let trips = state.store.search_trips(&query).await?;
    tracing::debug!("Search {} -> {} on {}: {} trip(s)", query.from, query.to, query.date, trips.len());
    Ok(Json(json!({ "count": trips.len(), "trips": trips })))
}

async fn get_trip(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Value>, AppError> {
    let trip = state.store.load_trip(id).await?;
    Ok(Json(json!({ "trip": trip })))
}

async fn seat_map(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Value>, AppError> {
    let trip = state.store.load_trip(id).await?;
    let layout = trip.seat_layout();
    Ok(Json(json!({
        "tripId": trip.id,
        "rows": layout.rows,
        "cols": layout.cols,
        "aisleColumn": aisle_column(layout.cols),
        "sleeper": layout.is_sleeper(),
        "seatsAvailable": trip.seats_available,
        "grid": render_grid(layout),
    })))
}

/// Seat and location changes of one trip as server-sent events.
async fn stream_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    // 404 before opening the stream.
    state.store.load_trip(id).await?;

    let stream = BroadcastStream::new(state.sse_tx.subscribe()).filter_map(move |msg| async move {
        let event: TripEvent = msg.ok()?;
        if event.trip_id() != id {
            return None;
        }
        Event::default().event(event.name()).json_data(&event).ok().map(Ok::<Event, Infallible>)
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn create_trip(
    State(state): State<AppState>,
    Json(draft): Json<TripDraft>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let trip = draft.into_trip(Uuid::new_v4())?;
    state.store.insert_trip(&trip).await?;
    tracing::info!(
        "Trip {} created: {} -> {} at {}",
        trip.id,
        trip.route.origin.name,
        trip.route.destination.name,
        trip.start_time
    );
    Ok((StatusCode::CREATED, Json(json!({ "trip": trip }))))
}

async fn update_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<TripUpdate>,
) -> Result<Json<Value>, AppError> {
    let trip = state.reservations.update_trip(id, &update).await?;
    Ok(Json(json!({ "trip": trip })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeatUpdate {
    seat_ids: Vec<String>,
    status: SeatStatus,
}

async fn update_seats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<SeatUpdate>,
) -> Result<Json<Value>, AppError> {
    let trip = state.reservations.override_seats(id, &update.seat_ids, update.status).await?;
    Ok(Json(json!({ "trip": trip })))
}
