use axum::{http::HeaderValue, http::Method, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod bookings;
pub mod error;
pub mod middleware;
pub mod state;
pub mod trips;
pub mod worker;

pub use state::{AppState, AuthConfig};

pub fn app(state: AppState) -> Router {
    let origin = match state.cors_origin.as_deref().map(str::parse::<HeaderValue>) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        _ => AllowOrigin::any(),
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let api = Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::routes(state.clone()))
        .nest("/trips", trips::routes(state.clone()))
        .nest("/bookings", bookings::routes(state.clone()));

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "message": "Busline API is running",
        "timestamp": chrono::Utc::now(),
    }))
}
