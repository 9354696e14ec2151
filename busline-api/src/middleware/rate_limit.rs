use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::state::AppState;

/// Per-IP fixed window of one minute. Redis failures let the request
/// through.
pub async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let (Some(redis), Some(ConnectInfo(addr))) =
        (state.redis.as_ref(), req.extensions().get::<ConnectInfo<SocketAddr>>().copied())
    else {
        return next.run(req).await;
    };

    let key = format!("ratelimit:{}", addr.ip());
    match redis.check_rate_limit(&key, state.rate_limit_per_minute, 60).await {
        Ok(false) => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response(),
        Ok(true) => next.run(req).await,
        Err(e) => {
            tracing::warn!("Rate limiter unavailable, allowing request: {}", e);
            next.run(req).await
        }
    }
}
