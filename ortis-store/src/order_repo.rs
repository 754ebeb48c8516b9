use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use ortis_core::repository::OrderRepository;
use ortis_core::sequence::SequenceKind;
use ortis_order::{
    NewOrder, Order, OrderFilter, OrderStatus, OrderType, OrderUpdate, PaymentType, Urgency,
    WorkshopKind,
};

use crate::{allocate_number, is_unique_violation, MAX_ALLOCATION_ATTEMPTS};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    case_id: Uuid,
    order_number: String,
    order_type: String,
    primary_flag: bool,
    urgency: String,
    payment_type: String,
    amount: Decimal,
    workshop: String,
    status: String,
    diagnosis: String,
    category: String,
    item_name: String,
    master_name: String,
    planned_manufacture_date: Option<NaiveDate>,
    planned_issue_date: Option<NaiveDate>,
    fitting1_call: Option<DateTime<Utc>>,
    fitting1_visit: Option<DateTime<Utc>>,
    fitting2_call: Option<DateTime<Utc>>,
    fitting2_visit: Option<DateTime<Utc>>,
    fitting3_call: Option<DateTime<Utc>>,
    fitting3_visit: Option<DateTime<Utc>>,
    spec: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const ORDER_COLUMNS: &str = "id, case_id, order_number, order_type, primary_flag, urgency, \
     payment_type, amount, workshop, status, diagnosis, category, item_name, master_name, \
     planned_manufacture_date, planned_issue_date, fitting1_call, fitting1_visit, fitting2_call, \
     fitting2_visit, fitting3_call, fitting3_visit, spec, created_at, updated_at";

impl OrderRow {
    fn into_domain(self) -> Result<Order, BoxError> {
        Ok(Order {
            id: self.id,
            case_id: self.case_id,
            order_number: self.order_number,
            order_type: OrderType::parse(&self.order_type).ok_or("unknown order type in orders")?,
            primary_flag: self.primary_flag,
            urgency: Urgency::parse(&self.urgency).ok_or("unknown urgency in orders")?,
            payment_type: PaymentType::parse(&self.payment_type)
                .ok_or("unknown payment type in orders")?,
            amount: self.amount,
            workshop: WorkshopKind::parse(&self.workshop).ok_or("unknown workshop in orders")?,
            status: OrderStatus::parse(&self.status).ok_or("unknown order status in orders")?,
            diagnosis: self.diagnosis,
            category: self.category,
            item_name: self.item_name,
            master_name: self.master_name,
            planned_manufacture_date: self.planned_manufacture_date,
            planned_issue_date: self.planned_issue_date,
            fitting1_call: self.fitting1_call,
            fitting1_visit: self.fitting1_visit,
            fitting2_call: self.fitting2_call,
            fitting2_visit: self.fitting2_visit,
            fitting3_call: self.fitting3_call,
            fitting3_visit: self.fitting3_visit,
            spec: self.spec,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn create_order(&self, draft: &NewOrder) -> Result<Order, BoxError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let mut tx = self.pool.begin().await?;
            let order_number =
                allocate_number(&mut tx, SequenceKind::Order, "orders", "order_number").await?;

            let id = Uuid::new_v4();
            let now = Utc::now();

            let result = sqlx::query(
                r#"
                INSERT INTO orders (id, case_id, order_number, order_type, primary_flag, urgency,
                    payment_type, amount, workshop, status, diagnosis, category, item_name,
                    master_name, planned_manufacture_date, planned_issue_date, spec,
                    created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19)
                "#,
            )
            .bind(id)
            .bind(draft.case_id)
            .bind(&order_number)
            .bind(draft.order_type.as_str())
            .bind(draft.primary_flag)
            .bind(draft.urgency.as_str())
            .bind(draft.payment_type.as_str())
            .bind(draft.amount)
            .bind(draft.workshop.as_str())
            .bind(OrderStatus::Draft.as_str())
            .bind(&draft.diagnosis)
            .bind(&draft.category)
            .bind(&draft.item_name)
            .bind(&draft.master_name)
            .bind(draft.planned_manufacture_date)
            .bind(draft.planned_issue_date)
            .bind(&draft.spec)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => {
                    tx.commit().await?;
                    return Ok(Order {
                        id,
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
                    });
                }
                Err(err) if attempt < MAX_ALLOCATION_ATTEMPTS && is_unique_violation(&err) => {
                    tracing::warn!(%order_number, attempt, "order number taken, reallocating");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, BoxError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(OrderRow::into_domain).transpose()
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, BoxError> {
        let mut qb =
            sqlx::QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1"));

        if let Some(case_id) = filter.case_id {
            qb.push(" AND case_id = ").push_bind(case_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(workshop) = filter.workshop {
            qb.push(" AND workshop = ").push_bind(workshop.as_str());
        }
        if let Some(order_type) = filter.order_type {
            qb.push(" AND order_type = ").push_bind(order_type.as_str());
        }
        qb.push(" ORDER BY created_at DESC");

        let rows: Vec<OrderRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(OrderRow::into_domain).collect()
    }

    async fn update_order(
        &self,
        id: Uuid,
        update: &OrderUpdate,
    ) -> Result<Option<Order>, BoxError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            r#"
            UPDATE orders SET order_type = $1, primary_flag = $2, urgency = $3, payment_type = $4,
                amount = $5, workshop = $6, diagnosis = $7, category = $8, item_name = $9,
                master_name = $10, planned_manufacture_date = $11, planned_issue_date = $12,
                fitting1_call = $13, fitting1_visit = $14, fitting2_call = $15,
                fitting2_visit = $16, fitting3_call = $17, fitting3_visit = $18, spec = $19,
                updated_at = NOW()
            WHERE id = $20
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(update.order_type.as_str())
        .bind(update.primary_flag)
        .bind(update.urgency.as_str())
        .bind(update.payment_type.as_str())
        .bind(update.amount)
        .bind(update.workshop.as_str())
        .bind(&update.diagnosis)
        .bind(&update.category)
        .bind(&update.item_name)
        .bind(&update.master_name)
        .bind(update.planned_manufacture_date)
        .bind(update.planned_issue_date)
        .bind(update.fitting1_call)
        .bind(update.fitting1_visit)
        .bind(update.fitting2_call)
        .bind(update.fitting2_visit)
        .bind(update.fitting3_call)
        .bind(update.fitting3_visit)
        .bind(&update.spec)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(OrderRow::into_domain).transpose()
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<(), BoxError> {
        sqlx::query("UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
