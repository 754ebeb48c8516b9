use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;
use ortis_core::identity::ROLE_WAREHOUSE;
use ortis_order::{transition, WorkflowEvent};
use ortis_shared::Masked;
use ortis_warehouse::{
    issue_entry, EntryFilter, Issue, NewIssue, NewWarehouseEntry, StockStatus, WarehouseEntry,
    WarehouseEntryUpdate,
};

const REQUIRED_ROLES: &[&str] = &[ROLE_WAREHOUSE];

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub order_id: Uuid,
    pub invoice_number: String,
    pub order_number: String,
    pub patient_name: String,
    pub patient_pin: Masked<String>,
    pub product_name: String,
    pub serial_number: String,
    pub status: StockStatus,
    pub arrived_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct IssueResponse {
    pub id: Uuid,
    pub warehouse_entry_id: Uuid,
    pub product_name: String,
    pub invoice_number: String,
    pub order_number: String,
    pub patient_name: String,
    pub patient_pin: Masked<String>,
    pub receiver_name: String,
    pub document_ref: String,
    pub comment: String,
    pub issued_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ListEntriesQuery {
    pub order_id: Option<Uuid>,
    pub invoice_id: Option<Uuid>,
    pub status: Option<String>,
}

impl ListEntriesQuery {
    fn into_filter(self) -> Result<EntryFilter, AppError> {
        let status = match self.status.as_deref() {
            Some(code) => Some(
                StockStatus::parse(code)
                    .ok_or_else(|| AppError::ValidationError(format!("Unknown status: {}", code)))?,
            ),
            None => None,
        };
        Ok(EntryFilter {
            order_id: self.order_id,
            invoice_id: self.invoice_id,
            status,
        })
    }
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/warehouse/entries",
            get(list_entries).post(create_entry),
        )
        .route(
            "/v1/warehouse/entries/{id}",
            get(get_entry).put(update_entry),
        )
        .route("/v1/warehouse/issues", get(list_issues).post(create_issue))
        .route("/v1/warehouse/issues/{id}", get(get_issue))
}

// ============================================================================
// Handlers
// ============================================================================

/// Invoice/order numbers and patient fields are dereferenced through the
/// linked records on every read.
async fn entry_context(
    state: &AppState,
    entry: &WarehouseEntry,
) -> Result<(String, String, String, String), AppError> {
    let invoice = state
        .invoices
        .get_invoice(entry.invoice_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| {
            AppError::InternalServerError(format!(
                "Invoice {} missing for entry {}",
                entry.invoice_id, entry.id
            ))
        })?;
    let order = state
        .orders
        .get_order(entry.order_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| {
            AppError::InternalServerError(format!(
                "Order {} missing for entry {}",
                entry.order_id, entry.id
            ))
        })?;
    let case = state
        .cases
        .get_case(order.case_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| {
            AppError::InternalServerError(format!(
                "Case {} missing for order {}",
                order.case_id, order.id
            ))
        })?;

    Ok((
        invoice.invoice_number,
        order.order_number,
        case.full_name(),
        case.pin,
    ))
}

async fn entry_response(state: &AppState, entry: WarehouseEntry) -> Result<EntryResponse, AppError> {
    let (invoice_number, order_number, patient_name, patient_pin) =
        entry_context(state, &entry).await?;

    Ok(EntryResponse {
        id: entry.id,
        invoice_id: entry.invoice_id,
        order_id: entry.order_id,
        invoice_number,
        order_number,
        patient_name,
        patient_pin: Masked(patient_pin),
        product_name: entry.product_name,
        serial_number: entry.serial_number,
        status: entry.status,
        arrived_at: entry.arrived_at,
        created_at: entry.created_at,
        updated_at: entry.updated_at,
    })
}

async fn issue_response(state: &AppState, issue: Issue) -> Result<IssueResponse, AppError> {
    let entry = state
        .warehouse
        .get_entry(issue.warehouse_entry_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| {
            AppError::InternalServerError(format!(
                "Entry {} missing for issue {}",
                issue.warehouse_entry_id, issue.id
            ))
        })?;
    let (invoice_number, order_number, patient_name, patient_pin) =
        entry_context(state, &entry).await?;

    Ok(IssueResponse {
        id: issue.id,
        warehouse_entry_id: issue.warehouse_entry_id,
        product_name: entry.product_name,
        invoice_number,
        order_number,
        patient_name,
        patient_pin: Masked(patient_pin),
        receiver_name: issue.receiver_name,
        document_ref: issue.document_ref,
        comment: issue.comment,
        issued_at: issue.issued_at,
        created_at: issue.created_at,
        updated_at: issue.updated_at,
    })
}

/// GET /v1/warehouse/entries
async fn list_entries(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListEntriesQuery>,
) -> Result<Json<Vec<EntryResponse>>, AppError> {
    claims.authorize(REQUIRED_ROLES)?;
    let filter = query.into_filter()?;

    let entries = state
        .warehouse
        .list_entries(&filter)
        .await
        .map_err(AppError::internal)?;

    let mut responses = Vec::with_capacity(entries.len());
    for entry in entries {
        responses.push(entry_response(&state, entry).await?);
    }
    Ok(Json(responses))
}

/// GET /v1/warehouse/entries/{id}
async fn get_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<EntryResponse>, AppError> {
    claims.authorize(REQUIRED_ROLES)?;

    let entry = state
        .warehouse
        .get_entry(id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFoundError(format!("Warehouse entry {} not found", id)))?;

    Ok(Json(entry_response(&state, entry).await?))
}

/// POST /v1/warehouse/entries
async fn create_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<NewWarehouseEntry>,
) -> Result<(StatusCode, Json<EntryResponse>), AppError> {
    claims.authorize(REQUIRED_ROLES)?;

    if draft.product_name.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Missing required field: product_name".to_string(),
        ));
    }
    state
        .invoices
        .get_invoice(draft.invoice_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| {
            AppError::ValidationError(format!("Unknown invoice: {}", draft.invoice_id))
        })?;
    state
        .orders
        .get_order(draft.order_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::ValidationError(format!("Unknown order: {}", draft.order_id)))?;

    let entry = state
        .warehouse
        .create_entry(&draft)
        .await
        .map_err(AppError::internal)?;

    let response = entry_response(&state, entry).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// PUT /v1/warehouse/entries/{id}
async fn update_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(update): Json<WarehouseEntryUpdate>,
) -> Result<Json<EntryResponse>, AppError> {
    claims.authorize(REQUIRED_ROLES)?;

    if update.product_name.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Missing required field: product_name".to_string(),
        ));
    }

    let entry = state
        .warehouse
        .update_entry(id, &update)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFoundError(format!("Warehouse entry {} not found", id)))?;

    Ok(Json(entry_response(&state, entry).await?))
}

/// GET /v1/warehouse/issues
async fn list_issues(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<IssueResponse>>, AppError> {
    claims.authorize(REQUIRED_ROLES)?;

    let issues = state
        .warehouse
        .list_issues()
        .await
        .map_err(AppError::internal)?;

    let mut responses = Vec::with_capacity(issues.len());
    for issue in issues {
        responses.push(issue_response(&state, issue).await?);
    }
    Ok(Json(responses))
}

/// GET /v1/warehouse/issues/{id}
async fn get_issue(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<IssueResponse>, AppError> {
    claims.authorize(REQUIRED_ROLES)?;

    let issue = state
        .warehouse
        .get_issue(id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFoundError(format!("Issue {} not found", id)))?;

    Ok(Json(issue_response(&state, issue).await?))
}

/// POST /v1/warehouse/issues
///
/// Handing an item to its patient marks the stock entry ISSUED and the
/// order ISSUED. Both status writes commit with the issuance record in
/// one transaction in the store layer.
async fn create_issue(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<NewIssue>,
) -> Result<(StatusCode, Json<IssueResponse>), AppError> {
    claims.authorize(REQUIRED_ROLES)?;

    if draft.receiver_name.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Missing required field: receiver_name".to_string(),
        ));
    }

    let entry = state
        .warehouse
        .get_entry(draft.warehouse_entry_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| {
            AppError::ValidationError(format!(
                "Unknown warehouse entry: {}",
                draft.warehouse_entry_id
            ))
        })?;
    let order = state
        .orders
        .get_order(entry.order_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| {
            AppError::InternalServerError(format!(
                "Order {} missing for entry {}",
                entry.order_id, entry.id
            ))
        })?;

    let entry_status = issue_entry(entry.status, state.policy)
        .map_err(|e| AppError::ConflictError(e.to_string()))?;
    let order_status = transition(order.status, WorkflowEvent::Issue, state.policy)
        .map_err(|e| AppError::ConflictError(e.to_string()))?;

    let issue = state
        .warehouse
        .create_issue(&draft, entry_status, order_status)
        .await
        .map_err(AppError::internal)?;

    let response = issue_response(&state, issue).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
