use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserClaims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub exp: usize,
}

pub fn decode_token(secret: &str, token: &str) -> Result<UserClaims, AppError> {
    decode::<UserClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::AuthenticationError("Token expired".to_string()),
            _ => AppError::AuthenticationError("Invalid token".to_string()),
        })
}

/// Resolve the bearer token to a stored user and hand the handlers an
/// `AuthenticatedUser`.
pub async fn user_auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.ok_or_else(|| AppError::AuthenticationError("No token provided".to_string()))?;

    let claims = decode_token(&state.auth.secret, bearer.token())?;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::AuthenticationError("Invalid token".to_string()))?;

    // Accounts can disappear after a token was issued.
    let user = state
        .users
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::AuthenticationError("User not found".to_string()))?;

    req.extensions_mut().insert(user.identity());
    Ok(next.run(req).await)
}
