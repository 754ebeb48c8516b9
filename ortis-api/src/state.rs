use std::sync::Arc;

use ortis_core::repository::{
    CaseRepository, DictionaryRepository, InvoiceRepository, OrderRepository, UserRepository,
    WarehouseRepository,
};
use ortis_order::TransitionPolicy;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub cases: Arc<dyn CaseRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub warehouse: Arc<dyn WarehouseRepository>,
    pub dictionaries: Arc<dyn DictionaryRepository>,
    pub users: Arc<dyn UserRepository>,
    pub auth: AuthConfig,
    pub policy: TransitionPolicy,
}
