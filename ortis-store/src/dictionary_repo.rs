use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use ortis_catalog::{DictEntry, DictKind, NewDictEntry};
use ortis_core::repository::DictionaryRepository;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct StoreDictionaryRepository {
    pool: PgPool,
}

impl StoreDictionaryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// All three dictionaries share one row shape; the kind picks the table.
#[derive(sqlx::FromRow)]
struct DictRow {
    id: Uuid,
    code: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DictRow {
    fn into_domain(self) -> DictEntry {
        DictEntry {
            id: self.id,
            code: self.code,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[async_trait]
impl DictionaryRepository for StoreDictionaryRepository {
    async fn list_entries(&self, kind: DictKind) -> Result<Vec<DictEntry>, BoxError> {
        let rows: Vec<DictRow> = sqlx::query_as(&format!(
            "SELECT id, code, name, description, created_at, updated_at FROM {} ORDER BY code",
            kind.table()
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DictRow::into_domain).collect())
    }

    async fn get_entry(&self, kind: DictKind, id: Uuid) -> Result<Option<DictEntry>, BoxError> {
        let row: Option<DictRow> = sqlx::query_as(&format!(
            "SELECT id, code, name, description, created_at, updated_at FROM {} WHERE id = $1",
            kind.table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(DictRow::into_domain))
    }

    async fn create_entry(
        &self,
        kind: DictKind,
        draft: &NewDictEntry,
    ) -> Result<DictEntry, BoxError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(&format!(
            "INSERT INTO {} (id, code, name, description, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
            kind.table()
        ))
        .bind(id)
        .bind(&draft.code)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(DictEntry {
            id,
            code: draft.code.clone(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn update_entry(
        &self,
        kind: DictKind,
        id: Uuid,
        draft: &NewDictEntry,
    ) -> Result<Option<DictEntry>, BoxError> {
        let row: Option<DictRow> = sqlx::query_as(&format!(
            "UPDATE {} SET code = $1, name = $2, description = $3, updated_at = NOW() \
             WHERE id = $4 \
             RETURNING id, code, name, description, created_at, updated_at",
            kind.table()
        ))
        .bind(&draft.code)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(DictRow::into_domain))
    }

    async fn delete_entry(&self, kind: DictKind, id: Uuid) -> Result<bool, BoxError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
