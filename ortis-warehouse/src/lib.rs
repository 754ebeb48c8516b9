pub mod models;

pub use models::{
    issue_entry, EntryFilter, Invoice, InvoiceFilter, InvoiceStatus, Issue, NewInvoice, NewIssue,
    NewWarehouseEntry, StockError, StockStatus, WarehouseEntry, WarehouseEntryUpdate,
    INVOICE_RECEIVER,
};
