use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;
use crate::users::UserResponse;

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    user: UserResponse,
}

/// Public routes: the login endpoint sits outside the auth middleware
pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/auth/login", post(login))
}

/// Routes behind the auth middleware
pub fn session_routes() -> Router<AppState> {
    Router::new().route("/v1/auth/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state
        .users
        .find_by_username(&req.username)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::AuthenticationError("Invalid username or password".to_string()))?;

    // A disabled account fails the same way as a bad password
    if !user.is_active || !user.verify_password(&req.password) {
        return Err(AppError::AuthenticationError(
            "Invalid username or password".to_string(),
        ));
    }

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        roles: user.roles.clone(),
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.auth.secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))?;

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

async fn me(Extension(claims): Extension<Claims>) -> Json<Claims> {
    Json(claims)
}
