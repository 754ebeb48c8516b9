use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order status in the manufacturing lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Draft,
    InWork,
    WaitingFitting,
    OnRework,
    ReadyForTransfer,
    TransferredToWarehouse,
    Issued,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "DRAFT",
            OrderStatus::InWork => "IN_WORK",
            OrderStatus::WaitingFitting => "WAITING_FITTING",
            OrderStatus::OnRework => "ON_REWORK",
            OrderStatus::ReadyForTransfer => "READY_FOR_TRANSFER",
            OrderStatus::TransferredToWarehouse => "TRANSFERRED_TO_WAREHOUSE",
            OrderStatus::Issued => "ISSUED",
            OrderStatus::Canceled => "CANCELED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(OrderStatus::Draft),
            "IN_WORK" => Some(OrderStatus::InWork),
            "WAITING_FITTING" => Some(OrderStatus::WaitingFitting),
            "ON_REWORK" => Some(OrderStatus::OnRework),
            "READY_FOR_TRANSFER" => Some(OrderStatus::ReadyForTransfer),
            "TRANSFERRED_TO_WAREHOUSE" => Some(OrderStatus::TransferredToWarehouse),
            "ISSUED" => Some(OrderStatus::Issued),
            "CANCELED" => Some(OrderStatus::Canceled),
            _ => None,
        }
    }

    /// Terminal states accept no further workflow events
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Issued | OrderStatus::Canceled)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Prosthesis,
    Shoes,
    Ottobock,
    Repair,
    ReadyTsr,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Prosthesis => "PROSTHESIS",
            OrderType::Shoes => "SHOES",
            OrderType::Ottobock => "OTTOBOCK",
            OrderType::Repair => "REPAIR",
            OrderType::ReadyTsr => "READY_TSR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PROSTHESIS" => Some(OrderType::Prosthesis),
            "SHOES" => Some(OrderType::Shoes),
            "OTTOBOCK" => Some(OrderType::Ottobock),
            "REPAIR" => Some(OrderType::Repair),
            "READY_TSR" => Some(OrderType::ReadyTsr),
            _ => None,
        }
    }
}

/// Production unit responsible for an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkshopKind {
    Prosthesis,
    Shoes,
    Ottobock,
    Repair,
}

impl WorkshopKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkshopKind::Prosthesis => "PROSTHESIS",
            WorkshopKind::Shoes => "SHOES",
            WorkshopKind::Ottobock => "OTTOBOCK",
            WorkshopKind::Repair => "REPAIR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PROSTHESIS" => Some(WorkshopKind::Prosthesis),
            "SHOES" => Some(WorkshopKind::Shoes),
            "OTTOBOCK" => Some(WorkshopKind::Ottobock),
            "REPAIR" => Some(WorkshopKind::Repair),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Normal,
    Urgent,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Normal => "NORMAL",
            Urgency::Urgent => "URGENT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NORMAL" => Some(Urgency::Normal),
            "URGENT" => Some(Urgency::Urgent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Free,
    Partial,
    Paid,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Free => "FREE",
            PaymentType::Partial => "PARTIAL",
            PaymentType::Paid => "PAID",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FREE" => Some(PaymentType::Free),
            "PARTIAL" => Some(PaymentType::Partial),
            "PAID" => Some(PaymentType::Paid),
            _ => None,
        }
    }
}

/// A manufacturing work ticket, linked to a patient case file.
/// `order_number` (`ORD-YYYY-NNNN`) is allocated once at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub case_id: Uuid,
    pub order_number: String,
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

/// Payload for creating an order. Status starts at DRAFT; the number is
/// allocated by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub case_id: Uuid,
    pub order_type: OrderType,
    #[serde(default = "default_true")]
    pub primary_flag: bool,
    #[serde(default = "default_urgency")]
    pub urgency: Urgency,
    #[serde(default = "default_payment_type")]
    pub payment_type: PaymentType,
    #[serde(default)]
    pub amount: Decimal,
    pub workshop: WorkshopKind,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub master_name: String,
    #[serde(default)]
    pub planned_manufacture_date: Option<NaiveDate>,
    #[serde(default)]
    pub planned_issue_date: Option<NaiveDate>,
    #[serde(default = "empty_spec")]
    pub spec: serde_json::Value,
}

fn default_true() -> bool {
    true
}

fn empty_spec() -> serde_json::Value {
    serde_json::json!({})
}

fn default_urgency() -> Urgency {
    Urgency::Normal
}

fn default_payment_type() -> PaymentType {
    PaymentType::Free
}

impl NewOrder {
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.amount < Decimal::ZERO {
            return Err(OrderValidationError::NegativeAmount(self.amount));
        }
        Ok(())
    }
}

/// Editable fields of an existing order. Status is deliberately absent:
/// status changes go through the workflow operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub order_type: OrderType,
    pub primary_flag: bool,
    pub urgency: Urgency,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub workshop: WorkshopKind,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub master_name: String,
    #[serde(default)]
    pub planned_manufacture_date: Option<NaiveDate>,
    #[serde(default)]
    pub planned_issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub fitting1_call: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fitting1_visit: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fitting2_call: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fitting2_visit: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fitting3_call: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fitting3_visit: Option<DateTime<Utc>>,
    #[serde(default = "empty_spec")]
    pub spec: serde_json::Value,
}

impl OrderUpdate {
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.amount < Decimal::ZERO {
            return Err(OrderValidationError::NegativeAmount(self.amount));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderValidationError {
    #[error("Order amount must not be negative (got {0})")]
    NegativeAmount(Decimal),
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub case_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub workshop: Option<WorkshopKind>,
    pub order_type: Option<OrderType>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(case_id) = self.case_id {
            if order.case_id != case_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if order.status != status {
                return false;
            }
        }
        if let Some(workshop) = self.workshop {
            if order.workshop != workshop {
                return false;
            }
        }
        if let Some(order_type) = self.order_type {
            if order.order_type != order_type {
                return false;
            }
        }
        true
    }
}
