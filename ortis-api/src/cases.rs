use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;
use ortis_case::{CaseFile, CaseFilter, CaseStatistics, DisabilityGroup, NewCaseFile, Sex};
use ortis_core::identity::ROLE_REGISTRY;
use ortis_shared::Masked;

const REQUIRED_ROLES: &[&str] = &[ROLE_REGISTRY];

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CaseResponse {
    pub id: Uuid,
    pub number: String,
    pub pin: Masked<String>,
    pub last_name: String,
    pub first_name: String,
    pub middle_name: String,
    pub full_name: String,
    pub sex: Sex,
    pub birth_date: NaiveDate,
    pub age: i32,
    pub address_registration: String,
    pub address_actual: String,
    pub phone: String,
    pub email: String,
    pub disability_group: DisabilityGroup,
    pub msek_number: String,
    pub msek_date: Option<NaiveDate>,
    pub ipra_number: String,
    pub ipra_date: Option<NaiveDate>,
    pub ipra_valid_to: Option<NaiveDate>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CaseFile> for CaseResponse {
    fn from(case: CaseFile) -> Self {
        let full_name = case.full_name();
        let age = case.age();
        Self {
            id: case.id,
            number: case.number,
            pin: Masked(case.pin),
            last_name: case.last_name,
            first_name: case.first_name,
            middle_name: case.middle_name,
            full_name,
            sex: case.sex,
            birth_date: case.birth_date,
            age,
            address_registration: case.address_registration,
            address_actual: case.address_actual,
            phone: case.phone,
            email: case.email,
            disability_group: case.disability_group,
            msek_number: case.msek_number,
            msek_date: case.msek_date,
            ipra_number: case.ipra_number,
            ipra_date: case.ipra_date,
            ipra_valid_to: case.ipra_valid_to,
            notes: case.notes,
            created_at: case.created_at,
            updated_at: case.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListCasesQuery {
    pub disability_group: Option<String>,
    pub search: Option<String>,
}

impl ListCasesQuery {
    fn into_filter(self) -> Result<CaseFilter, AppError> {
        let disability_group = match self.disability_group.as_deref() {
            Some(code) => Some(DisabilityGroup::parse(code).ok_or_else(|| {
                AppError::ValidationError(format!("Unknown disability group: {}", code))
            })?),
            None => None,
        };
        Ok(CaseFilter {
            disability_group,
            search: self.search,
        })
    }
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/cases", get(list_cases).post(create_case))
        .route("/v1/cases/statistics", get(case_statistics))
        .route("/v1/cases/{id}", get(get_case).put(update_case))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1/cases
async fn list_cases(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListCasesQuery>,
) -> Result<Json<Vec<CaseResponse>>, AppError> {
    claims.authorize(REQUIRED_ROLES)?;
    let filter = query.into_filter()?;

    let cases = state
        .cases
        .list_cases(&filter)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(cases.into_iter().map(CaseResponse::from).collect()))
}

/// GET /v1/cases/statistics
async fn case_statistics(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<CaseStatistics>, AppError> {
    claims.authorize(REQUIRED_ROLES)?;

    let stats = state
        .cases
        .case_statistics()
        .await
        .map_err(AppError::internal)?;

    Ok(Json(stats))
}

/// GET /v1/cases/{id}
async fn get_case(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<CaseResponse>, AppError> {
    claims.authorize(REQUIRED_ROLES)?;

    let case = state
        .cases
        .get_case(id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFoundError(format!("Case {} not found", id)))?;

    Ok(Json(CaseResponse::from(case)))
}

/// POST /v1/cases
async fn create_case(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<NewCaseFile>,
) -> Result<(StatusCode, Json<CaseResponse>), AppError> {
    claims.authorize(REQUIRED_ROLES)?;
    draft
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let case = state
        .cases
        .create_case(&draft)
        .await
        .map_err(AppError::internal)?;

    Ok((StatusCode::CREATED, Json(CaseResponse::from(case))))
}

/// PUT /v1/cases/{id}
async fn update_case(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(draft): Json<NewCaseFile>,
) -> Result<Json<CaseResponse>, AppError> {
    claims.authorize(REQUIRED_ROLES)?;
    draft
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let case = state
        .cases
        .update_case(id, &draft)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFoundError(format!("Case {} not found", id)))?;

    Ok(Json(CaseResponse::from(case)))
}
