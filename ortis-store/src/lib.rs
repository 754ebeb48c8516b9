pub mod app_config;
pub mod case_repo;
pub mod database;
pub mod dictionary_repo;
pub mod invoice_repo;
pub mod order_repo;
pub mod user_repo;
pub mod warehouse_repo;

pub use app_config::Config;
pub use case_repo::StoreCaseRepository;
pub use database::DbClient;
pub use dictionary_repo::StoreDictionaryRepository;
pub use invoice_repo::StoreInvoiceRepository;
pub use order_repo::StoreOrderRepository;
pub use user_repo::StoreUserRepository;
pub use warehouse_repo::StoreWarehouseRepository;

/// Bounded retries for business-number allocation: the max-and-increment
/// query can race a concurrent writer, in which case the unique
/// constraint rejects the insert and the allocation is retried with a
/// fresh maximum.
pub(crate) const MAX_ALLOCATION_ATTEMPTS: u32 = 3;

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

/// Max-and-increment inside the caller's transaction. The LIKE pattern
/// pins the year prefix, so each calendar year restarts at 0001.
pub(crate) async fn allocate_number(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    kind: ortis_core::sequence::SequenceKind,
    table: &str,
    column: &str,
) -> Result<String, sqlx::Error> {
    use chrono::Datelike;

    let year = chrono::Utc::now().year();
    let prefix = kind.year_prefix(year);
    let sql = format!("SELECT max({column}) FROM {table} WHERE {column} LIKE $1");
    let current_max: Option<String> = sqlx::query_scalar(&sql)
        .bind(format!("{prefix}%"))
        .fetch_one(&mut **tx)
        .await?;

    Ok(ortis_core::sequence::next_number(
        kind,
        year,
        current_max.as_deref(),
    ))
}
