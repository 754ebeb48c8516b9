use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;
use ortis_core::identity::{password_digest, NewUser, User, UserUpdate, ROLE_ADMIN};

const REQUIRED_ROLES: &[&str] = &[ROLE_ADMIN];

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub phone: String,
    pub department: String,
    pub is_active: bool,
    pub roles: Vec<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            phone: user.phone,
            department: user.department,
            is_active: user.is_active,
            roles: user.roles,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/users", get(list_users).post(create_user))
        .route("/v1/users/{id}", get(get_user).put(update_user))
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    claims.authorize(REQUIRED_ROLES)?;

    let users = state.users.list_users().await.map_err(AppError::internal)?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    claims.authorize(REQUIRED_ROLES)?;

    let user = state
        .users
        .get_user(id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFoundError(format!("User {} not found", id)))?;

    Ok(Json(UserResponse::from(user)))
}

async fn create_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<NewUser>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    claims.authorize(REQUIRED_ROLES)?;
    draft
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    if state
        .users
        .find_by_username(&draft.username)
        .await
        .map_err(AppError::internal)?
        .is_some()
    {
        return Err(AppError::ConflictError(format!(
            "Username {} is already taken",
            draft.username
        )));
    }

    let salt = Uuid::new_v4().simple().to_string();
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        username: draft.username.clone(),
        password_digest: password_digest(&salt, &draft.password),
        password_salt: salt,
        full_name: draft.full_name.clone(),
        phone: draft.phone.clone(),
        department: draft.department.clone(),
        is_active: true,
        roles: draft.roles.clone(),
        created_at: now,
        updated_at: now,
    };

    state
        .users
        .create_user(&user)
        .await
        .map_err(AppError::internal)?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UserResponse>, AppError> {
    claims.authorize(REQUIRED_ROLES)?;
    update
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let user = state
        .users
        .update_user(id, &update)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFoundError(format!("User {} not found", id)))?;

    Ok(Json(UserResponse::from(user)))
}
