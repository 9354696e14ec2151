use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use busline_core::identity::validate_registration;
use busline_core::{AuthenticatedUser, StoreError, User, UserProfile};
use busline_shared::Masked;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::middleware::auth::{user_auth_middleware, UserClaims};
use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    user: UserProfile,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/profile", get(profile))
        .route_layer(middleware::from_fn_with_state(state, user_auth_middleware));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

pub fn issue_token(state: &AppState, user: &User) -> Result<String, AppError> {
    let claims = UserClaims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        name: user.name.clone(),
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(state.auth.secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    validate_registration(&req.name, &req.email, &req.password)?;

    if state.users.find_user_by_email(&req.email).await?.is_some() {
        return Err(AppError::ValidationError("User already exists with this email".to_string()));
    }

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await?
        .map_err(|e| AppError::InternalServerError(format!("Password hashing failed: {}", e)))?;

    let user = User::new(&req.name, &req.email, password_hash);
    match state.users.create_user(&user).await {
        Ok(()) => {}
        Err(StoreError::Duplicate(_)) => {
            return Err(AppError::ValidationError("User already exists with this email".to_string()))
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!("Registered user {} ({})", user.id, Masked(&user.email));
    let token = issue_token(&state, &user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user: user.profile() })))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::ValidationError("Email and password are required".to_string()));
    }

    let invalid = || AppError::AuthenticationError("Invalid email or password".to_string());
    let user = state.users.find_user_by_email(&req.email).await?.ok_or_else(invalid)?;

    let password = req.password;
    let hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?;
    if !valid {
        tracing::debug!("Failed login for {}", Masked(&user.email));
        return Err(invalid());
    }

    let token = issue_token(&state, &user)?;
    Ok(Json(AuthResponse { token, user: user.profile() }))
}

async fn profile(
    State(state): State<AppState>,
    Extension(current): Extension<AuthenticatedUser>,
) -> Result<Json<Value>, AppError> {
    let user = state
        .users
        .find_user_by_id(current.id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("User not found".to_string()))?;

    Ok(Json(json!({ "user": user.profile() })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret1", &hash));
        assert!(!verify_password("secret2", &hash));
        assert!(!verify_password("secret1", "not-a-phc-string"));
    }
}
