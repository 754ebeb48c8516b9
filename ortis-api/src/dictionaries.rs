use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;
use ortis_catalog::{DictEntry, DictKind, NewDictEntry};
use ortis_core::identity::ROLE_ADMIN;

// Reads are open to any authenticated user; writes are ADMIN-only.
const WRITE_ROLES: &[&str] = &[ROLE_ADMIN];

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/dictionaries/{kind}",
            get(list_entries).post(create_entry),
        )
        .route(
            "/v1/dictionaries/{kind}/{id}",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
}

fn parse_kind(kind: &str) -> Result<DictKind, AppError> {
    DictKind::parse(kind)
        .ok_or_else(|| AppError::NotFoundError(format!("Unknown dictionary: {}", kind)))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1/dictionaries/{kind}
async fn list_entries(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<DictEntry>>, AppError> {
    claims.authorize(&[])?;
    let kind = parse_kind(&kind)?;

    let entries = state
        .dictionaries
        .list_entries(kind)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(entries))
}

/// GET /v1/dictionaries/{kind}/{id}
async fn get_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<Json<DictEntry>, AppError> {
    claims.authorize(&[])?;
    let kind = parse_kind(&kind)?;

    let entry = state
        .dictionaries
        .get_entry(kind, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFoundError(format!("Dictionary entry {} not found", id)))?;

    Ok(Json(entry))
}

/// POST /v1/dictionaries/{kind}
async fn create_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(kind): Path<String>,
    Json(draft): Json<NewDictEntry>,
) -> Result<(StatusCode, Json<DictEntry>), AppError> {
    claims.authorize(WRITE_ROLES)?;
    let kind = parse_kind(&kind)?;
    draft
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let entry = state
        .dictionaries
        .create_entry(kind, &draft)
        .await
        .map_err(AppError::internal)?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// PUT /v1/dictionaries/{kind}/{id}
async fn update_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(draft): Json<NewDictEntry>,
) -> Result<Json<DictEntry>, AppError> {
    claims.authorize(WRITE_ROLES)?;
    let kind = parse_kind(&kind)?;
    draft
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let entry = state
        .dictionaries
        .update_entry(kind, id, &draft)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFoundError(format!("Dictionary entry {} not found", id)))?;

    Ok(Json(entry))
}

/// DELETE /v1/dictionaries/{kind}/{id}
async fn delete_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<StatusCode, AppError> {
    claims.authorize(WRITE_ROLES)?;
    let kind = parse_kind(&kind)?;

    let deleted = state
        .dictionaries
        .delete_entry(kind, id)
        .await
        .map_err(AppError::internal)?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFoundError(format!(
            "Dictionary entry {} not found",
            id
        )))
    }
}
