use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;
use ortis_case::CaseFile;
use ortis_core::identity::{ROLE_MED, ROLE_WORKSHOP};
use ortis_order::{
    transition, NewOrder, Order, OrderFilter, OrderStatus, OrderType, OrderUpdate, PaymentType,
    Urgency, WorkflowEvent, WorkshopKind,
};
use ortis_shared::Masked;

const REQUIRED_ROLES: &[&str] = &[ROLE_MED, ROLE_WORKSHOP];

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub case_id: Uuid,
    pub order_number: String,
    pub patient_name: String,
    pub patient_pin: Masked<String>,
    pub order_type: OrderType,
    pub primary_flag: bool,
    pub urgency: Urgency,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub workshop: WorkshopKind,
    pub status: OrderStatus,
    pub diagnosis: String,
    pub category: String,
    pub item_name: String,
    pub master_name: String,
    pub planned_manufacture_date: Option<NaiveDate>,
    pub planned_issue_date: Option<NaiveDate>,
    pub fitting1_call: Option<DateTime<Utc>>,
    pub fitting1_visit: Option<DateTime<Utc>>,
    pub fitting2_call: Option<DateTime<Utc>>,
    pub fitting2_visit: Option<DateTime<Utc>>,
    pub fitting3_call: Option<DateTime<Utc>>,
    pub fitting3_visit: Option<DateTime<Utc>>,
    pub spec: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderResponse {
    fn new(order: Order, case: &CaseFile) -> Self {
        Self {
            id: order.id,
            case_id: order.case_id,
            order_number: order.order_number,
            patient_name: case.full_name(),
            patient_pin: Masked(case.pin.clone()),
            order_type: order.order_type,
            primary_flag: order.primary_flag,
            urgency: order.urgency,
            payment_type: order.payment_type,
            amount: order.amount,
            workshop: order.workshop,
            status: order.status,
            diagnosis: order.diagnosis,
            category: order.category,
            item_name: order.item_name,
            master_name: order.master_name,
            planned_manufacture_date: order.planned_manufacture_date,
            planned_issue_date: order.planned_issue_date,
            fitting1_call: order.fitting1_call,
            fitting1_visit: order.fitting1_visit,
            fitting2_call: order.fitting2_call,
            fitting2_visit: order.fitting2_visit,
            fitting3_call: order.fitting3_call,
            fitting3_visit: order.fitting3_visit,
            spec: order.spec,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub case_id: Option<Uuid>,
    pub status: Option<String>,
    pub workshop: Option<String>,
    pub order_type: Option<String>,
}

impl ListOrdersQuery {
    fn into_filter(self) -> Result<OrderFilter, AppError> {
        let status = match self.status.as_deref() {
            Some(code) => Some(
                OrderStatus::parse(code)
                    .ok_or_else(|| AppError::ValidationError(format!("Unknown status: {}", code)))?,
            ),
            None => None,
        };
        let workshop = match self.workshop.as_deref() {
            Some(code) => Some(WorkshopKind::parse(code).ok_or_else(|| {
                AppError::ValidationError(format!("Unknown workshop: {}", code))
            })?),
            None => None,
        };
        let order_type = match self.order_type.as_deref() {
            Some(code) => Some(OrderType::parse(code).ok_or_else(|| {
                AppError::ValidationError(format!("Unknown order type: {}", code))
            })?),
            None => None,
        };
        Ok(OrderFilter {
            case_id: self.case_id,
            status,
            workshop,
            order_type,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub event: WorkflowEvent,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/orders", get(list_orders).post(create_order))
        .route("/v1/orders/{id}", get(get_order).put(update_order))
        .route("/v1/orders/{id}/status", post(change_status))
}

// ============================================================================
// Handlers
// ============================================================================

/// Patient display fields come from the linked case file; orders never
/// store them.
async fn with_patient(state: &AppState, order: Order) -> Result<OrderResponse, AppError> {
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

    Ok(OrderResponse::new(order, &case))
}

/// GET /v1/orders
async fn list_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    claims.authorize(REQUIRED_ROLES)?;
    let filter = query.into_filter()?;

    let orders = state
        .orders
        .list_orders(&filter)
        .await
        .map_err(AppError::internal)?;

    let mut responses = Vec::with_capacity(orders.len());
    for order in orders {
        responses.push(with_patient(&state, order).await?);
    }
    Ok(Json(responses))
}

/// GET /v1/orders/{id}
async fn get_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    claims.authorize(REQUIRED_ROLES)?;

    let order = state
        .orders
        .get_order(id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFoundError(format!("Order {} not found", id)))?;

    Ok(Json(with_patient(&state, order).await?))
}

/// POST /v1/orders
async fn create_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<NewOrder>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    claims.authorize(REQUIRED_ROLES)?;
    draft
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    // The case must exist before a work ticket can reference it
    let case = state
        .cases
        .get_case(draft.case_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| {
            AppError::ValidationError(format!("Unknown case file: {}", draft.case_id))
        })?;

    let order = state
        .orders
        .create_order(&draft)
        .await
        .map_err(AppError::internal)?;

    Ok((StatusCode::CREATED, Json(OrderResponse::new(order, &case))))
}

/// PUT /v1/orders/{id}
async fn update_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(update): Json<OrderUpdate>,
) -> Result<Json<OrderResponse>, AppError> {
    claims.authorize(REQUIRED_ROLES)?;
    update
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let order = state
        .orders
        .update_order(id, &update)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFoundError(format!("Order {} not found", id)))?;

    Ok(Json(with_patient(&state, order).await?))
}

/// POST /v1/orders/{id}/status
///
/// The only way to move an order through its lifecycle by hand. The
/// event is validated against the configured transition policy.
async fn change_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusChangeRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    claims.authorize(REQUIRED_ROLES)?;

    let mut order = state
        .orders
        .get_order(id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFoundError(format!("Order {} not found", id)))?;

    let next = transition(order.status, req.event, state.policy)
        .map_err(|e| AppError::ConflictError(e.to_string()))?;

    state
        .orders
        .set_order_status(id, next)
        .await
        .map_err(AppError::internal)?;

    order.status = next;
    Ok(Json(with_patient(&state, order).await?))
}
