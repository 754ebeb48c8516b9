use async_trait::async_trait;
use uuid::Uuid;

use crate::identity::{User, UserUpdate};
use ortis_case::{CaseFile, CaseFilter, CaseStatistics, NewCaseFile};
use ortis_catalog::{DictEntry, DictKind, NewDictEntry};
use ortis_order::{NewOrder, Order, OrderFilter, OrderStatus, OrderUpdate};
use ortis_warehouse::{
    EntryFilter, Invoice, InvoiceFilter, Issue, NewInvoice, NewIssue, NewWarehouseEntry,
    StockStatus, WarehouseEntry, WarehouseEntryUpdate,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Repository trait for patient case files
#[async_trait]
pub trait CaseRepository: Send + Sync {
    /// Create a case file, allocating its `YYYY-NNNN` number
    async fn create_case(&self, draft: &NewCaseFile) -> Result<CaseFile, BoxError>;

    async fn get_case(&self, id: Uuid) -> Result<Option<CaseFile>, BoxError>;

    async fn list_cases(&self, filter: &CaseFilter) -> Result<Vec<CaseFile>, BoxError>;

    /// Update every editable field; the number is never touched
    async fn update_case(&self, id: Uuid, draft: &NewCaseFile) -> Result<Option<CaseFile>, BoxError>;

    async fn case_statistics(&self) -> Result<CaseStatistics, BoxError>;
}

/// Repository trait for manufacturing orders
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Create an order in DRAFT, allocating its `ORD-YYYY-NNNN` number
    async fn create_order(&self, draft: &NewOrder) -> Result<Order, BoxError>;

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, BoxError>;

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, BoxError>;

    async fn update_order(&self, id: Uuid, update: &OrderUpdate) -> Result<Option<Order>, BoxError>;

    /// Partial-field status write, used by the workflow operation
    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<(), BoxError>;
}

/// Repository trait for transfer invoices
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Create an invoice and move the referenced order to `order_status`
    /// in the same transaction. Allocates the `INV-YYYY-NNNN` number.
    async fn create_invoice(
        &self,
        draft: &NewInvoice,
        order_status: OrderStatus,
    ) -> Result<Invoice, BoxError>;

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>, BoxError>;

    async fn list_invoices(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, BoxError>;
}

/// Repository trait for warehouse stock and issuance
#[async_trait]
pub trait WarehouseRepository: Send + Sync {
    async fn create_entry(&self, draft: &NewWarehouseEntry) -> Result<WarehouseEntry, BoxError>;

    async fn get_entry(&self, id: Uuid) -> Result<Option<WarehouseEntry>, BoxError>;

    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<WarehouseEntry>, BoxError>;

    async fn update_entry(
        &self,
        id: Uuid,
        update: &WarehouseEntryUpdate,
    ) -> Result<Option<WarehouseEntry>, BoxError>;

    /// Record an issuance and apply both status writes (entry, order) in
    /// the same transaction
    async fn create_issue(
        &self,
        draft: &NewIssue,
        entry_status: StockStatus,
        order_status: OrderStatus,
    ) -> Result<Issue, BoxError>;

    async fn get_issue(&self, id: Uuid) -> Result<Option<Issue>, BoxError>;

    async fn list_issues(&self) -> Result<Vec<Issue>, BoxError>;
}

/// Repository trait for reference dictionaries
#[async_trait]
pub trait DictionaryRepository: Send + Sync {
    async fn list_entries(&self, kind: DictKind) -> Result<Vec<DictEntry>, BoxError>;

    async fn get_entry(&self, kind: DictKind, id: Uuid) -> Result<Option<DictEntry>, BoxError>;

    async fn create_entry(&self, kind: DictKind, draft: &NewDictEntry)
        -> Result<DictEntry, BoxError>;

    async fn update_entry(
        &self,
        kind: DictKind,
        id: Uuid,
        draft: &NewDictEntry,
    ) -> Result<Option<DictEntry>, BoxError>;

    async fn delete_entry(&self, kind: DictKind, id: Uuid) -> Result<bool, BoxError>;
}

/// Repository trait for system users
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<(), BoxError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, BoxError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, BoxError>;

    async fn list_users(&self) -> Result<Vec<User>, BoxError>;

    async fn update_user(&self, id: Uuid, update: &UserUpdate) -> Result<Option<User>, BoxError>;
}
