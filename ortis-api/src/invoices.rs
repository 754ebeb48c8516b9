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
use ortis_core::identity::{ROLE_WAREHOUSE, ROLE_WORKSHOP};
use ortis_order::{transition, WorkflowEvent, WorkshopKind};
use ortis_shared::Masked;
use ortis_warehouse::{Invoice, InvoiceFilter, InvoiceStatus, NewInvoice};

const REQUIRED_ROLES: &[&str] = &[ROLE_WORKSHOP, ROLE_WAREHOUSE];

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub invoice_number: String,
    pub order_number: String,
    pub patient_name: String,
    pub patient_pin: Masked<String>,
    pub date: NaiveDate,
    pub sender_workshop: WorkshopKind,
    pub receiver: String,
    pub status: InvoiceStatus,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    pub order_id: Option<Uuid>,
    pub sender_workshop: Option<String>,
    pub status: Option<String>,
}

impl ListInvoicesQuery {
    fn into_filter(self) -> Result<InvoiceFilter, AppError> {
        let sender_workshop = match self.sender_workshop.as_deref() {
            Some(code) => Some(WorkshopKind::parse(code).ok_or_else(|| {
                AppError::ValidationError(format!("Unknown workshop: {}", code))
            })?),
            None => None,
        };
        let status = match self.status.as_deref() {
            Some(code) => Some(
                InvoiceStatus::parse(code)
                    .ok_or_else(|| AppError::ValidationError(format!("Unknown status: {}", code)))?,
            ),
            None => None,
        };
        Ok(InvoiceFilter {
            order_id: self.order_id,
            sender_workshop,
            status,
        })
    }
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/invoices", get(list_invoices).post(create_invoice))
        .route("/v1/invoices/{id}", get(get_invoice))
}

// ============================================================================
// Handlers
// ============================================================================

async fn with_context(state: &AppState, invoice: Invoice) -> Result<InvoiceResponse, AppError> {
    let order = state
        .orders
        .get_order(invoice.order_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| {
            AppError::InternalServerError(format!(
                "Order {} missing for invoice {}",
                invoice.order_id, invoice.id
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

    Ok(InvoiceResponse {
        id: invoice.id,
        order_id: invoice.order_id,
        invoice_number: invoice.invoice_number,
        order_number: order.order_number,
        patient_name: case.full_name(),
        patient_pin: Masked(case.pin),
        date: invoice.date,
        sender_workshop: invoice.sender_workshop,
        receiver: invoice.receiver,
        status: invoice.status,
        comment: invoice.comment,
        created_at: invoice.created_at,
        updated_at: invoice.updated_at,
    })
}

/// GET /v1/invoices
async fn list_invoices(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<Vec<InvoiceResponse>>, AppError> {
    claims.authorize(REQUIRED_ROLES)?;
    let filter = query.into_filter()?;

    let invoices = state
        .invoices
        .list_invoices(&filter)
        .await
        .map_err(AppError::internal)?;

    let mut responses = Vec::with_capacity(invoices.len());
    for invoice in invoices {
        responses.push(with_context(&state, invoice).await?);
    }
    Ok(Json(responses))
}

/// GET /v1/invoices/{id}
async fn get_invoice(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    claims.authorize(REQUIRED_ROLES)?;

    let invoice = state
        .invoices
        .get_invoice(id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFoundError(format!("Invoice {} not found", id)))?;

    Ok(Json(with_context(&state, invoice).await?))
}

/// POST /v1/invoices
///
/// Recording a transfer moves the referenced order to
/// TRANSFERRED_TO_WAREHOUSE. The status write and the invoice insert
/// commit together in the store layer.
async fn create_invoice(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<NewInvoice>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    claims.authorize(REQUIRED_ROLES)?;

    let order = state
        .orders
        .get_order(draft.order_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::ValidationError(format!("Unknown order: {}", draft.order_id)))?;

    let next = transition(order.status, WorkflowEvent::TransferToWarehouse, state.policy)
        .map_err(|e| AppError::ConflictError(e.to_string()))?;

    let invoice = state
        .invoices
        .create_invoice(&draft, next)
        .await
        .map_err(AppError::internal)?;

    let response = with_context(&state, invoice).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
