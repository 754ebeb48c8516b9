use chrono::{DateTime, NaiveDate, Utc};
use ortis_order::{TransitionPolicy, WorkshopKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Receiver side of a transfer invoice. Finished goods only ever move to
/// the warehouse.
pub const INVOICE_RECEIVER: &str = "WAREHOUSE";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    OnIssue,
    Issued,
    Canceled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::OnIssue => "ON_ISSUE",
            InvoiceStatus::Issued => "ISSUED",
            InvoiceStatus::Canceled => "CANCELED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ON_ISSUE" => Some(InvoiceStatus::OnIssue),
            "ISSUED" => Some(InvoiceStatus::Issued),
            "CANCELED" => Some(InvoiceStatus::Canceled),
            _ => None,
        }
    }
}

/// Transfer document moving finished goods from a workshop to the
/// warehouse. `invoice_number` (`INV-YYYY-NNNN`) is allocated once at
/// creation. Creating an invoice transfers the referenced order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub order_id: Uuid,
    pub invoice_number: String,
    pub date: NaiveDate,
    pub sender_workshop: WorkshopKind,
    pub receiver: String,
    pub status: InvoiceStatus,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoice {
    pub order_id: Uuid,
    pub date: NaiveDate,
    pub sender_workshop: WorkshopKind,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub order_id: Option<Uuid>,
    pub sender_workshop: Option<WorkshopKind>,
    pub status: Option<InvoiceStatus>,
}

impl InvoiceFilter {
    pub fn matches(&self, invoice: &Invoice) -> bool {
        if let Some(order_id) = self.order_id {
            if invoice.order_id != order_id {
                return false;
            }
        }
        if let Some(workshop) = self.sender_workshop {
            if invoice.sender_workshop != workshop {
                return false;
            }
        }
        if let Some(status) = self.status {
            if invoice.status != status {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    OnStock,
    Reserved,
    Issued,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::OnStock => "ON_STOCK",
            StockStatus::Reserved => "RESERVED",
            StockStatus::Issued => "ISSUED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ON_STOCK" => Some(StockStatus::OnStock),
            "RESERVED" => Some(StockStatus::Reserved),
            "ISSUED" => Some(StockStatus::Issued),
            _ => None,
        }
    }
}

/// One manufactured item held at the warehouse. Keeps a direct order
/// reference alongside the invoice, matching how the ledger is queried
/// (by order) even though the order is reachable through the invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseEntry {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub order_id: Uuid,
    pub product_name: String,
    pub serial_number: String,
    pub status: StockStatus,
    pub arrived_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWarehouseEntry {
    pub invoice_id: Uuid,
    pub order_id: Uuid,
    pub product_name: String,
    #[serde(default)]
    pub serial_number: String,
}

/// Editable stock fields. Issuing is not an edit: it goes through issue
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseEntryUpdate {
    pub product_name: String,
    #[serde(default)]
    pub serial_number: String,
    pub status: StockStatus,
}

#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub order_id: Option<Uuid>,
    pub invoice_id: Option<Uuid>,
    pub status: Option<StockStatus>,
}

impl EntryFilter {
    pub fn matches(&self, entry: &WarehouseEntry) -> bool {
        if let Some(order_id) = self.order_id {
            if entry.order_id != order_id {
                return false;
            }
        }
        if let Some(invoice_id) = self.invoice_id {
            if entry.invoice_id != invoice_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if entry.status != status {
                return false;
            }
        }
        true
    }
}

/// The event of handing a warehouse item to its patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: Uuid,
    pub warehouse_entry_id: Uuid,
    pub receiver_name: String,
    pub document_ref: String,
    pub comment: String,
    pub issued_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIssue {
    pub warehouse_entry_id: Uuid,
    pub receiver_name: String,
    #[serde(default)]
    pub document_ref: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StockError {
    #[error("Warehouse entry is {0} and cannot be issued")]
    NotIssuable(&'static str),
}

/// Compute the stock status an entry moves to when issued. Guarded mode
/// requires the item to actually be on hand; permissive mode repeats the
/// historical behavior where double-issue was possible.
pub fn issue_entry(current: StockStatus, policy: TransitionPolicy) -> Result<StockStatus, StockError> {
    match policy {
        TransitionPolicy::Permissive => Ok(StockStatus::Issued),
        TransitionPolicy::Guarded => match current {
            StockStatus::OnStock | StockStatus::Reserved => Ok(StockStatus::Issued),
            StockStatus::Issued => Err(StockError::NotIssuable(current.as_str())),
        },
    }
}
