use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use ortis_core::repository::InvoiceRepository;
use ortis_core::sequence::SequenceKind;
use ortis_order::{OrderStatus, WorkshopKind};
use ortis_warehouse::{Invoice, InvoiceFilter, InvoiceStatus, NewInvoice, INVOICE_RECEIVER};

use crate::{allocate_number, is_unique_violation, MAX_ALLOCATION_ATTEMPTS};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct StoreInvoiceRepository {
    pool: PgPool,
}

impl StoreInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct InvoiceRow {
    id: Uuid,
    order_id: Uuid,
    invoice_number: String,
    date: NaiveDate,
    sender_workshop: String,
    receiver: String,
    status: String,
    comment: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const INVOICE_COLUMNS: &str = "id, order_id, invoice_number, date, sender_workshop, receiver, \
     status, comment, created_at, updated_at";

impl InvoiceRow {
    fn into_domain(self) -> Result<Invoice, BoxError> {
        Ok(Invoice {
            id: self.id,
            order_id: self.order_id,
            invoice_number: self.invoice_number,
            date: self.date,
            sender_workshop: WorkshopKind::parse(&self.sender_workshop)
                .ok_or("unknown workshop in invoices")?,
            receiver: self.receiver,
            status: InvoiceStatus::parse(&self.status).ok_or("unknown status in invoices")?,
            comment: self.comment,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl InvoiceRepository for StoreInvoiceRepository {
    async fn create_invoice(
        &self,
        draft: &NewInvoice,
        order_status: OrderStatus,
    ) -> Result<Invoice, BoxError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            // The invoice insert and the order status write commit or
            // fail together; an invoice must never exist without its
            // order reflecting the transfer.
            let mut tx = self.pool.begin().await?;
            let invoice_number =
                allocate_number(&mut tx, SequenceKind::Invoice, "invoices", "invoice_number")
                    .await?;

            let id = Uuid::new_v4();
            let now = Utc::now();

            let result = sqlx::query(
                r#"
                INSERT INTO invoices (id, order_id, invoice_number, date, sender_workshop,
                    receiver, status, comment, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(id)
            .bind(draft.order_id)
            .bind(&invoice_number)
            .bind(draft.date)
            .bind(draft.sender_workshop.as_str())
            .bind(INVOICE_RECEIVER)
            .bind(InvoiceStatus::OnIssue.as_str())
            .bind(&draft.comment)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => {
                    let updated =
                        sqlx::query("UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2")
                            .bind(order_status.as_str())
                            .bind(draft.order_id)
                            .execute(&mut *tx)
                            .await?;
                    if updated.rows_affected() == 0 {
                        return Err("order not found for invoice".into());
                    }

                    tx.commit().await?;
                    return Ok(Invoice {
                        id,
                        order_id: draft.order_id,
                        invoice_number,
                        date: draft.date,
                        sender_workshop: draft.sender_workshop,
                        receiver: INVOICE_RECEIVER.to_string(),
                        status: InvoiceStatus::OnIssue,
                        comment: draft.comment.clone(),
                        created_at: now,
                        updated_at: now,
                    });
                }
                Err(err) if attempt < MAX_ALLOCATION_ATTEMPTS && is_unique_violation(&err) => {
                    tracing::warn!(%invoice_number, attempt, "invoice number taken, reallocating");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>, BoxError> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(InvoiceRow::into_domain).transpose()
    }

    async fn list_invoices(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, BoxError> {
        let mut qb = sqlx::QueryBuilder::new(format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE 1=1"
        ));

        if let Some(order_id) = filter.order_id {
            qb.push(" AND order_id = ").push_bind(order_id);
        }
        if let Some(workshop) = filter.sender_workshop {
            qb.push(" AND sender_workshop = ").push_bind(workshop.as_str());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY created_at DESC");

        let rows: Vec<InvoiceRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(InvoiceRow::into_domain).collect()
    }
}
