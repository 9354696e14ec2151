use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use busline_catalog::CatalogError;
use busline_core::{CoreError, ReservationError, StoreError};
use busline_order::ReconcileError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    ValidationError(String),
    NotFoundError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

const RETRY_MESSAGE: &str = "Seats were updated by someone else, please try again";

fn reconcile_status(err: &ReconcileError) -> StatusCode {
    match err {
        ReconcileError::SeatUnavailable(_) | ReconcileError::SeatHeld { .. } => StatusCode::CONFLICT,
        ReconcileError::HoldExpired(_) => StatusCode::GONE,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn store_status(err: &StoreError) -> (StatusCode, String) {
    match err {
        StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        StoreError::Conflict(_) => (StatusCode::CONFLICT, RETRY_MESSAGE.to_string()),
        StoreError::Duplicate(_) => (StatusCode::CONFLICT, err.to_string()),
        StoreError::Backend(_) => internal(err),
    }
}

fn internal(err: &dyn std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Internal Server Error: {}", err);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
}

/// Status and client message for errors that reached the edge through `?`.
fn classify(err: &anyhow::Error) -> (StatusCode, String) {
    if let Some(e) = err.downcast_ref::<ReservationError>() {
        return match e {
            ReservationError::Reconcile(r) => (reconcile_status(r), r.to_string()),
            ReservationError::Store(s) => store_status(s),
            ReservationError::Catalog(c) => (StatusCode::BAD_REQUEST, c.to_string()),
        };
    }
    if let Some(e) = err.downcast_ref::<ReconcileError>() {
        return (reconcile_status(e), e.to_string());
    }
    if let Some(e) = err.downcast_ref::<StoreError>() {
        return store_status(e);
    }
    if let Some(e) = err.downcast_ref::<CatalogError>() {
        return (StatusCode::BAD_REQUEST, e.to_string());
    }
    if let Some(e) = err.downcast_ref::<CoreError>() {
        return match e {
            CoreError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };
    }
    internal(err)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InternalServerError(msg) => internal(&msg),
            AppError::Anyhow(err) => classify(&err),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn status_of(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_domain_errors_map_to_statuses() {
        let id = Uuid::new_v4();
        assert_eq!(
            status_of(ReservationError::Reconcile(ReconcileError::SeatUnavailable("A1".into()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ReservationError::Reconcile(ReconcileError::SeatHeld {
                seat_id: "A2".into(),
                booking_id: id,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ReservationError::Reconcile(ReconcileError::EmptySelection)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ReservationError::Reconcile(ReconcileError::HoldExpired(id))),
            StatusCode::GONE
        );
        assert_eq!(status_of(ReservationError::Store(StoreError::Conflict(id))), StatusCode::CONFLICT);
        assert_eq!(status_of(StoreError::booking_not_found(id)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(StoreError::Backend("connection reset".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(CoreError::ValidationError("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(AppError::AuthenticationError("no".into())), StatusCode::UNAUTHORIZED);
    }
}
