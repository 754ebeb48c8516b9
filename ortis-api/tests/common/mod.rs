use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use uuid::Uuid;

use ortis_api::state::{AppState, AuthConfig};
use ortis_api::middleware::auth::Claims;
use ortis_case::{CaseFile, CaseFilter, CaseStatistics, NewCaseFile};
use ortis_catalog::{DictEntry, DictKind, NewDictEntry};
use ortis_core::identity::{User, UserUpdate};
use ortis_core::repository::{
    CaseRepository, DictionaryRepository, InvoiceRepository, OrderRepository, UserRepository,
    WarehouseRepository,
};
use ortis_core::sequence::{next_number, SequenceKind};
use ortis_order::{NewOrder, Order, OrderFilter, OrderStatus, TransitionPolicy, OrderUpdate};
use ortis_warehouse::{
    EntryFilter, Invoice, InvoiceFilter, InvoiceStatus, Issue, NewInvoice, NewIssue,
    NewWarehouseEntry, StockStatus, WarehouseEntry, WarehouseEntryUpdate, INVOICE_RECEIVER,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub const TEST_SECRET: &str = "test-secret";

#[derive(Default)]
struct Inner {
    cases: HashMap<Uuid, CaseFile>,
    orders: HashMap<Uuid, Order>,
    invoices: HashMap<Uuid, Invoice>,
    entries: HashMap<Uuid, WarehouseEntry>,
    issues: HashMap<Uuid, Issue>,
    dicts: HashMap<DictKind, HashMap<Uuid, DictEntry>>,
    users: HashMap<Uuid, User>,
}

/// In-memory stand-in for the Postgres store: every repository trait on
/// one shared map set, with the same allocation and side-effect
/// semantics.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Insert a case file with an explicit number, bypassing allocation.
    /// Used to pre-load malformed numbers.
    pub fn seed_case_with_number(&self, number: &str) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let case = CaseFile {
            id,
            number: number.to_string(),
            pin: "00000000000000".to_string(),
            last_name: "Seeded".to_string(),
            first_name: "Case".to_string(),
            middle_name: String::new(),
            sex: ortis_case::Sex::Male,
            birth_date: chrono::NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(),
            address_registration: "-".to_string(),
            address_actual: String::new(),
            phone: String::new(),
            email: String::new(),
            disability_group: ortis_case::DisabilityGroup::NotEstablished,
            msek_number: String::new(),
            msek_date: None,
            ipra_number: String::new(),
            ipra_date: None,
            ipra_valid_to: None,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().cases.insert(id, case);
        id
    }

    pub fn order_status(&self, id: Uuid) -> Option<OrderStatus> {
        self.inner.lock().unwrap().orders.get(&id).map(|o| o.status)
    }

    pub fn entry_status(&self, id: Uuid) -> Option<StockStatus> {
        self.inner.lock().unwrap().entries.get(&id).map(|e| e.status)
    }

    pub fn order_snapshot(&self, id: Uuid) -> Option<Order> {
        self.inner.lock().unwrap().orders.get(&id).cloned()
    }
}

fn allocated(kind: SequenceKind, existing: impl Iterator<Item = String>) -> String {
    let year = Utc::now().year();
    let prefix = kind.year_prefix(year);
    let max = existing.filter(|n| n.starts_with(&prefix)).max();
    next_number(kind, year, max.as_deref())
}

#[async_trait]
impl CaseRepository for MemoryStore {
    async fn create_case(&self, draft: &NewCaseFile) -> Result<CaseFile, BoxError> {
        let mut inner = self.inner.lock().unwrap();
        let number = allocated(
            SequenceKind::Case,
            inner.cases.values().map(|c| c.number.clone()),
        );
        let now = Utc::now();
        let case = CaseFile {
            id: Uuid::new_v4(),
            number,
            pin: draft.pin.clone(),
            last_name: draft.last_name.clone(),
            first_name: draft.first_name.clone(),
            middle_name: draft.middle_name.clone(),
            sex: draft.sex,
            birth_date: draft.birth_date,
            address_registration: draft.address_registration.clone(),
            address_actual: draft.address_actual.clone(),
            phone: draft.phone.clone(),
            email: draft.email.clone(),
            disability_group: draft.disability_group,
            msek_number: draft.msek_number.clone(),
            msek_date: draft.msek_date,
            ipra_number: draft.ipra_number.clone(),
            ipra_date: draft.ipra_date,
            ipra_valid_to: draft.ipra_valid_to,
            notes: draft.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.cases.insert(case.id, case.clone());
        Ok(case)
    }

    async fn get_case(&self, id: Uuid) -> Result<Option<CaseFile>, BoxError> {
        Ok(self.inner.lock().unwrap().cases.get(&id).cloned())
    }

    async fn list_cases(&self, filter: &CaseFilter) -> Result<Vec<CaseFile>, BoxError> {
        let inner = self.inner.lock().unwrap();
        let mut cases: Vec<CaseFile> = inner
            .cases
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        cases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(cases)
    }

    async fn update_case(
        &self,
        id: Uuid,
        draft: &NewCaseFile,
    ) -> Result<Option<CaseFile>, BoxError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(case) = inner.cases.get_mut(&id) else {
            return Ok(None);
        };
        case.pin = draft.pin.clone();
        case.last_name = draft.last_name.clone();
        case.first_name = draft.first_name.clone();
        case.middle_name = draft.middle_name.clone();
        case.sex = draft.sex;
        case.birth_date = draft.birth_date;
        case.address_registration = draft.address_registration.clone();
        case.address_actual = draft.address_actual.clone();
        case.phone = draft.phone.clone();
        case.email = draft.email.clone();
        case.disability_group = draft.disability_group;
        case.msek_number = draft.msek_number.clone();
        case.msek_date = draft.msek_date;
        case.ipra_number = draft.ipra_number.clone();
        case.ipra_date = draft.ipra_date;
        case.ipra_valid_to = draft.ipra_valid_to;
        case.notes = draft.notes.clone();
        case.updated_at = Utc::now();
        Ok(Some(case.clone()))
    }

    async fn case_statistics(&self) -> Result<CaseStatistics, BoxError> {
        let inner = self.inner.lock().unwrap();
        let total = inner.cases.len() as i64;
        let with_disability = inner
            .cases
            .values()
            .filter(|c| c.disability_group.is_established())
            .count() as i64;
        Ok(CaseStatistics {
            total,
            with_disability,
            without_disability: total - with_disability,
        })
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create_order(&self, draft: &NewOrder) -> Result<Order, BoxError> {
        let mut inner = self.inner.lock().unwrap();
        let order_number = allocated(
            SequenceKind::Order,
            inner.orders.values().map(|o| o.order_number.clone()),
        );
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            case_id: draft.case_id,
            order_number,
            order_type: draft.order_type,
            primary_flag: draft.primary_flag,
            urgency: draft.urgency,
            payment_type: draft.payment_type,
            amount: draft.amount,
            workshop: draft.workshop,
            status: OrderStatus::Draft,
            diagnosis: draft.diagnosis.clone(),
            category: draft.category.clone(),
            item_name: draft.item_name.clone(),
            master_name: draft.master_name.clone(),
            planned_manufacture_date: draft.planned_manufacture_date,
            planned_issue_date: draft.planned_issue_date,
            fitting1_call: None,
            fitting1_visit: None,
            fitting2_call: None,
            fitting2_visit: None,
            fitting3_call: None,
            fitting3_visit: None,
            spec: draft.spec.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, BoxError> {
        Ok(self.inner.lock().unwrap().orders.get(&id).cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, BoxError> {
        let inner = self.inner.lock().unwrap();
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn update_order(
        &self,
        id: Uuid,
        update: &OrderUpdate,
    ) -> Result<Option<Order>, BoxError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(order) = inner.orders.get_mut(&id) else {
            return Ok(None);
        };
        order.order_type = update.order_type;
        order.primary_flag = update.primary_flag;
        order.urgency = update.urgency;
        order.payment_type = update.payment_type;
        order.amount = update.amount;
        order.workshop = update.workshop;
        order.diagnosis = update.diagnosis.clone();
        order.category = update.category.clone();
        order.item_name = update.item_name.clone();
        order.master_name = update.master_name.clone();
        order.planned_manufacture_date = update.planned_manufacture_date;
        order.planned_issue_date = update.planned_issue_date;
        order.fitting1_call = update.fitting1_call;
        order.fitting1_visit = update.fitting1_visit;
        order.fitting2_call = update.fitting2_call;
        order.fitting2_visit = update.fitting2_visit;
        order.fitting3_call = update.fitting3_call;
        order.fitting3_visit = update.fitting3_visit;
        order.spec = update.spec.clone();
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<(), BoxError> {
        let mut inner = self.inner.lock().unwrap();
        let order = inner.orders.get_mut(&id).ok_or("order not found")?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl InvoiceRepository for MemoryStore {
    async fn create_invoice(
        &self,
        draft: &NewInvoice,
        order_status: OrderStatus,
    ) -> Result<Invoice, BoxError> {
        let mut inner = self.inner.lock().unwrap();
        let invoice_number = allocated(
            SequenceKind::Invoice,
            inner.invoices.values().map(|i| i.invoice_number.clone()),
        );
        let now = Utc::now();
        let invoice = Invoice {
            id: Uuid::new_v4(),
            order_id: draft.order_id,
            invoice_number,
            date: draft.date,
            sender_workshop: draft.sender_workshop,
            receiver: INVOICE_RECEIVER.to_string(),
            status: InvoiceStatus::OnIssue,
            comment: draft.comment.clone(),
            created_at: now,
            updated_at: now,
        };

        let order = inner
            .orders
            .get_mut(&draft.order_id)
            .ok_or("order not found for invoice")?;
        order.status = order_status;
        order.updated_at = now;

        inner.invoices.insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>, BoxError> {
        Ok(self.inner.lock().unwrap().invoices.get(&id).cloned())
    }

    async fn list_invoices(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, BoxError> {
        let inner = self.inner.lock().unwrap();
        let mut invoices: Vec<Invoice> = inner
            .invoices
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invoices)
    }
}

#[async_trait]
impl WarehouseRepository for MemoryStore {
    async fn create_entry(&self, draft: &NewWarehouseEntry) -> Result<WarehouseEntry, BoxError> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let entry = WarehouseEntry {
            id: Uuid::new_v4(),
            invoice_id: draft.invoice_id,
            order_id: draft.order_id,
            product_name: draft.product_name.clone(),
            serial_number: draft.serial_number.clone(),
            status: StockStatus::OnStock,
            arrived_at: now,
            created_at: now,
            updated_at: now,
        };
        inner.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn get_entry(&self, id: Uuid) -> Result<Option<WarehouseEntry>, BoxError> {
        Ok(self.inner.lock().unwrap().entries.get(&id).cloned())
    }

    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<WarehouseEntry>, BoxError> {
        let inner = self.inner.lock().unwrap();
        let mut entries: Vec<WarehouseEntry> = inner
            .entries
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.arrived_at.cmp(&a.arrived_at));
        Ok(entries)
    }

    async fn update_entry(
        &self,
        id: Uuid,
        update: &WarehouseEntryUpdate,
    ) -> Result<Option<WarehouseEntry>, BoxError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(entry) = inner.entries.get_mut(&id) else {
            return Ok(None);
        };
        entry.product_name = update.product_name.clone();
        entry.serial_number = update.serial_number.clone();
        entry.status = update.status;
        entry.updated_at = Utc::now();
        Ok(Some(entry.clone()))
    }

    async fn create_issue(
        &self,
        draft: &NewIssue,
        entry_status: StockStatus,
        order_status: OrderStatus,
    ) -> Result<Issue, BoxError> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();

        let order_id = {
            let entry = inner
                .entries
                .get_mut(&draft.warehouse_entry_id)
                .ok_or("warehouse entry not found for issue")?;
            entry.status = entry_status;
            entry.updated_at = now;
            entry.order_id
        };
        let order = inner
            .orders
            .get_mut(&order_id)
            .ok_or("order not found for issue")?;
        order.status = order_status;
        order.updated_at = now;

        let issue = Issue {
            id: Uuid::new_v4(),
            warehouse_entry_id: draft.warehouse_entry_id,
            receiver_name: draft.receiver_name.clone(),
            document_ref: draft.document_ref.clone(),
            comment: draft.comment.clone(),
            issued_at: now,
            created_at: now,
            updated_at: now,
        };
        inner.issues.insert(issue.id, issue.clone());
        Ok(issue)
    }

    async fn get_issue(&self, id: Uuid) -> Result<Option<Issue>, BoxError> {
        Ok(self.inner.lock().unwrap().issues.get(&id).cloned())
    }

    async fn list_issues(&self) -> Result<Vec<Issue>, BoxError> {
        let inner = self.inner.lock().unwrap();
        let mut issues: Vec<Issue> = inner.issues.values().cloned().collect();
        issues.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(issues)
    }
}

#[async_trait]
impl DictionaryRepository for MemoryStore {
    async fn list_entries(&self, kind: DictKind) -> Result<Vec<DictEntry>, BoxError> {
        let inner = self.inner.lock().unwrap();
        let mut entries: Vec<DictEntry> = inner
            .dicts
            .get(&kind)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(entries)
    }

    async fn get_entry(&self, kind: DictKind, id: Uuid) -> Result<Option<DictEntry>, BoxError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .dicts
            .get(&kind)
            .and_then(|m| m.get(&id))
            .cloned())
    }

    async fn create_entry(
        &self,
        kind: DictKind,
        draft: &NewDictEntry,
    ) -> Result<DictEntry, BoxError> {
        let mut inner = self.inner.lock().unwrap();
        let dict = inner.dicts.entry(kind).or_default();
        if dict.values().any(|e| e.code == draft.code) {
            return Err("duplicate dictionary code".into());
        }
        let now = Utc::now();
        let entry = DictEntry {
            id: Uuid::new_v4(),
            code: draft.code.clone(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            created_at: now,
            updated_at: now,
        };
        dict.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn update_entry(
        &self,
        kind: DictKind,
        id: Uuid,
        draft: &NewDictEntry,
    ) -> Result<Option<DictEntry>, BoxError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(entry) = inner.dicts.entry(kind).or_default().get_mut(&id) else {
            return Ok(None);
        };
        entry.code = draft.code.clone();
        entry.name = draft.name.clone();
        entry.description = draft.description.clone();
        entry.updated_at = Utc::now();
        Ok(Some(entry.clone()))
    }

    async fn delete_entry(&self, kind: DictKind, id: Uuid) -> Result<bool, BoxError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner
            .dicts
            .get_mut(&kind)
            .map(|m| m.remove(&id).is_some())
            .unwrap_or(false))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<(), BoxError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.values().any(|u| u.username == user.username) {
            return Err("duplicate username".into());
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, BoxError> {
        Ok(self.inner.lock().unwrap().users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, BoxError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, BoxError> {
        let inner = self.inner.lock().unwrap();
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn update_user(&self, id: Uuid, update: &UserUpdate) -> Result<Option<User>, BoxError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        user.full_name = update.full_name.clone();
        user.phone = update.phone.clone();
        user.department = update.department.clone();
        user.is_active = update.is_active;
        user.roles = update.roles.clone();
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }
}

// ============================================================================
// Test app construction
// ============================================================================

pub fn test_state(policy: TransitionPolicy) -> (AppState, MemoryStore) {
    let store = MemoryStore::default();
    let state = AppState {
        cases: Arc::new(store.clone()),
        orders: Arc::new(store.clone()),
        invoices: Arc::new(store.clone()),
        warehouse: Arc::new(store.clone()),
        dictionaries: Arc::new(store.clone()),
        users: Arc::new(store.clone()),
        auth: AuthConfig {
            secret: TEST_SECRET.to_string(),
            expiration: 3600,
        },
        policy,
    };
    (state, store)
}

/// Bearer token carrying the given roles, signed with the test secret
pub fn token_for(roles: &[&str]) -> String {
    let claims = Claims {
        sub: Uuid::new_v4().to_string(),
        username: "tester".to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        exp: (Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}
