use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use busline_catalog::Trip;
use busline_core::{AuthenticatedUser, BookRequest, StoreError};
use busline_order::Booking;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::middleware::auth::user_auth_middleware;
use crate::{error::AppError, state::AppState};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking))
        .route("/user", get(user_bookings))
        .route("/{id}", get(get_booking))
        .route("/{id}/cancel", patch(cancel_booking))
        .route("/{id}/confirm", post(confirm_booking))
        .route_layer(middleware::from_fn_with_state(state, user_auth_middleware))
}

/// Booking with its trip attached, the shape the booking pages render.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BookingDetails {
    #[serde(flatten)]
    booking: Booking,
    trip: Option<Trip>,
}

async fn with_trip(state: &AppState, booking: Booking) -> Result<BookingDetails, AppError> {
    let trip = match state.store.load_trip(booking.trip_id).await {
        Ok(trip) => Some(trip),
        Err(StoreError::NotFound { .. }) => None,
        Err(e) => return Err(e.into()),
    };
    Ok(BookingDetails { booking, trip })
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<BookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(req) = payload.map_err(|e| {
        tracing::debug!("Rejected booking payload: {}", e);
        AppError::ValidationError("tripId and seats array are required".to_string())
    })?;

    let booking = state.reservations.book(&user, &req).await?;
    let details = with_trip(&state, booking).await?;
    Ok((StatusCode::CREATED, Json(json!({ "booking": details }))))
}

async fn user_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Value>, AppError> {
    let bookings = state.store.list_user_bookings(user.id).await?;
    let mut details = Vec::with_capacity(bookings.len());
    for booking in bookings {
        details.push(with_trip(&state, booking).await?);
    }
    Ok(Json(json!({ "count": details.len(), "bookings": details })))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = state.store.load_booking(id).await?;
    if booking.user_id != user.id {
        return Err(AppError::NotFoundError("Booking not found".to_string()));
    }
    let details = with_trip(&state, booking).await?;
    Ok(Json(json!({ "booking": details })))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = state.reservations.cancel(&user, id).await?;
    Ok(Json(json!({
        "booking": booking,
        "message": "Booking cancelled successfully",
    })))
}

async fn confirm_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = state.reservations.confirm(&user, id).await?;
    Ok(Json(json!({ "booking": booking })))
}
