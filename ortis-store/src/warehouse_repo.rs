use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use ortis_core::repository::WarehouseRepository;
use ortis_order::OrderStatus;
use ortis_warehouse::{
    EntryFilter, Issue, NewIssue, NewWarehouseEntry, StockStatus, WarehouseEntry,
    WarehouseEntryUpdate,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct StoreWarehouseRepository {
    pool: PgPool,
}

impl StoreWarehouseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct EntryRow {
    id: Uuid,
    invoice_id: Uuid,
    order_id: Uuid,
    product_name: String,
    serial_number: String,
    status: String,
    arrived_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const ENTRY_COLUMNS: &str = "id, invoice_id, order_id, product_name, serial_number, status, \
     arrived_at, created_at, updated_at";

impl EntryRow {
    fn into_domain(self) -> Result<WarehouseEntry, BoxError> {
        Ok(WarehouseEntry {
            id: self.id,
            invoice_id: self.invoice_id,
            order_id: self.order_id,
            product_name: self.product_name,
            serial_number: self.serial_number,
            status: StockStatus::parse(&self.status)
                .ok_or("unknown status in warehouse_entries")?,
            arrived_at: self.arrived_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct IssueRow {
    id: Uuid,
    warehouse_entry_id: Uuid,
    receiver_name: String,
    document_ref: String,
    comment: String,
    issued_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const ISSUE_COLUMNS: &str = "id, warehouse_entry_id, receiver_name, document_ref, comment, \
     issued_at, created_at, updated_at";

impl IssueRow {
    fn into_domain(self) -> Issue {
        Issue {
            id: self.id,
            warehouse_entry_id: self.warehouse_entry_id,
            receiver_name: self.receiver_name,
            document_ref: self.document_ref,
            comment: self.comment,
            issued_at: self.issued_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[async_trait]
impl WarehouseRepository for StoreWarehouseRepository {
    async fn create_entry(&self, draft: &NewWarehouseEntry) -> Result<WarehouseEntry, BoxError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO warehouse_entries (id, invoice_id, order_id, product_name, serial_number,
                status, arrived_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(draft.invoice_id)
        .bind(draft.order_id)
        .bind(&draft.product_name)
        .bind(&draft.serial_number)
        .bind(StockStatus::OnStock.as_str())
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(WarehouseEntry {
            id,
            invoice_id: draft.invoice_id,
            order_id: draft.order_id,
            product_name: draft.product_name.clone(),
            serial_number: draft.serial_number.clone(),
            status: StockStatus::OnStock,
            arrived_at: now,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_entry(&self, id: Uuid) -> Result<Option<WarehouseEntry>, BoxError> {
        let row: Option<EntryRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM warehouse_entries WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EntryRow::into_domain).transpose()
    }

    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<WarehouseEntry>, BoxError> {
        let mut qb = sqlx::QueryBuilder::new(format!(
            "SELECT {ENTRY_COLUMNS} FROM warehouse_entries WHERE 1=1"
        ));

        if let Some(order_id) = filter.order_id {
            qb.push(" AND order_id = ").push_bind(order_id);
        }
        if let Some(invoice_id) = filter.invoice_id {
            qb.push(" AND invoice_id = ").push_bind(invoice_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY arrived_at DESC");

        let rows: Vec<EntryRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(EntryRow::into_domain).collect()
    }

    async fn update_entry(
        &self,
        id: Uuid,
        update: &WarehouseEntryUpdate,
    ) -> Result<Option<WarehouseEntry>, BoxError> {
        let row: Option<EntryRow> = sqlx::query_as(&format!(
            r#"
            UPDATE warehouse_entries SET product_name = $1, serial_number = $2, status = $3,
                updated_at = NOW()
            WHERE id = $4
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(&update.product_name)
        .bind(&update.serial_number)
        .bind(update.status.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EntryRow::into_domain).transpose()
    }

    async fn create_issue(
        &self,
        draft: &NewIssue,
        entry_status: StockStatus,
        order_status: OrderStatus,
    ) -> Result<Issue, BoxError> {
        // One transaction for all three writes: the issuance record, the
        // stock entry status and the order status.
        let mut tx = self.pool.begin().await?;

        let order_id: Option<Uuid> =
            sqlx::query_scalar("SELECT order_id FROM warehouse_entries WHERE id = $1")
                .bind(draft.warehouse_entry_id)
                .fetch_optional(&mut *tx)
                .await?;
        let order_id = order_id.ok_or("warehouse entry not found for issue")?;

        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO issues (id, warehouse_entry_id, receiver_name, document_ref, comment,
                issued_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id)
        .bind(draft.warehouse_entry_id)
        .bind(&draft.receiver_name)
        .bind(&draft.document_ref)
        .bind(&draft.comment)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE warehouse_entries SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(entry_status.as_str())
            .bind(draft.warehouse_entry_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(order_status.as_str())
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Issue {
            id,
            warehouse_entry_id: draft.warehouse_entry_id,
            receiver_name: draft.receiver_name.clone(),
            document_ref: draft.document_ref.clone(),
            comment: draft.comment.clone(),
            issued_at: now,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_issue(&self, id: Uuid) -> Result<Option<Issue>, BoxError> {
        let row: Option<IssueRow> =
            sqlx::query_as(&format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(IssueRow::into_domain))
    }

    async fn list_issues(&self) -> Result<Vec<Issue>, BoxError> {
        let rows: Vec<IssueRow> = sqlx::query_as(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues ORDER BY issued_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(IssueRow::into_domain).collect())
    }
}
