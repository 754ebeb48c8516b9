use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use ortis_case::{CaseFile, CaseFilter, CaseStatistics, DisabilityGroup, NewCaseFile, Sex};
use ortis_core::repository::CaseRepository;
use ortis_core::sequence::SequenceKind;

use crate::{allocate_number, is_unique_violation, MAX_ALLOCATION_ATTEMPTS};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct StoreCaseRepository {
    pool: PgPool,
}

impl StoreCaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct CaseRow {
    id: Uuid,
    number: String,
    pin: String,
    last_name: String,
    first_name: String,
    middle_name: String,
    sex: String,
    birth_date: NaiveDate,
    address_registration: String,
    address_actual: String,
    phone: String,
    email: String,
    disability_group: String,
    msek_number: String,
    msek_date: Option<NaiveDate>,
    ipra_number: String,
    ipra_date: Option<NaiveDate>,
    ipra_valid_to: Option<NaiveDate>,
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const CASE_COLUMNS: &str = "id, number, pin, last_name, first_name, middle_name, sex, birth_date, \
     address_registration, address_actual, phone, email, disability_group, msek_number, msek_date, \
     ipra_number, ipra_date, ipra_valid_to, notes, created_at, updated_at";

impl CaseRow {
    fn into_domain(self) -> Result<CaseFile, BoxError> {
        Ok(CaseFile {
            id: self.id,
            number: self.number,
            pin: self.pin,
            last_name: self.last_name,
            first_name: self.first_name,
            middle_name: self.middle_name,
            sex: Sex::parse(&self.sex).ok_or("unknown sex code in case_files")?,
            birth_date: self.birth_date,
            address_registration: self.address_registration,
            address_actual: self.address_actual,
            phone: self.phone,
            email: self.email,
            disability_group: DisabilityGroup::parse(&self.disability_group)
                .ok_or("unknown disability group in case_files")?,
            msek_number: self.msek_number,
            msek_date: self.msek_date,
            ipra_number: self.ipra_number,
            ipra_date: self.ipra_date,
            ipra_valid_to: self.ipra_valid_to,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl CaseRepository for StoreCaseRepository {
    async fn create_case(&self, draft: &NewCaseFile) -> Result<CaseFile, BoxError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let mut tx = self.pool.begin().await?;
            let number = allocate_number(&mut tx, SequenceKind::Case, "case_files", "number").await?;

            let id = Uuid::new_v4();
            let now = Utc::now();

            let result = sqlx::query(
                r#"
                INSERT INTO case_files (id, number, pin, last_name, first_name, middle_name, sex,
                    birth_date, address_registration, address_actual, phone, email,
                    disability_group, msek_number, msek_date, ipra_number, ipra_date,
                    ipra_valid_to, notes, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21)
                "#,
            )
            .bind(id)
            .bind(&number)
            .bind(&draft.pin)
            .bind(&draft.last_name)
            .bind(&draft.first_name)
            .bind(&draft.middle_name)
            .bind(draft.sex.as_str())
            .bind(draft.birth_date)
            .bind(&draft.address_registration)
            .bind(&draft.address_actual)
            .bind(&draft.phone)
            .bind(&draft.email)
            .bind(draft.disability_group.as_str())
            .bind(&draft.msek_number)
            .bind(draft.msek_date)
            .bind(&draft.ipra_number)
            .bind(draft.ipra_date)
            .bind(draft.ipra_valid_to)
            .bind(&draft.notes)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => {
                    tx.commit().await?;
                    return Ok(CaseFile {
                        id,
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
                    });
                }
                Err(err) if attempt < MAX_ALLOCATION_ATTEMPTS && is_unique_violation(&err) => {
                    tracing::warn!(%number, attempt, "case number taken, reallocating");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn get_case(&self, id: Uuid) -> Result<Option<CaseFile>, BoxError> {
        let row: Option<CaseRow> = sqlx::query_as(&format!(
            "SELECT {CASE_COLUMNS} FROM case_files WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CaseRow::into_domain).transpose()
    }

    async fn list_cases(&self, filter: &CaseFilter) -> Result<Vec<CaseFile>, BoxError> {
        let mut qb = sqlx::QueryBuilder::new(format!(
            "SELECT {CASE_COLUMNS} FROM case_files WHERE 1=1"
        ));

        if let Some(group) = filter.disability_group {
            qb.push(" AND disability_group = ").push_bind(group.as_str());
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            qb.push(" AND (pin ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR last_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR middle_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY created_at DESC");

        let rows: Vec<CaseRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(CaseRow::into_domain).collect()
    }

    async fn update_case(
        &self,
        id: Uuid,
        draft: &NewCaseFile,
    ) -> Result<Option<CaseFile>, BoxError> {
        let row: Option<CaseRow> = sqlx::query_as(&format!(
            r#"
            UPDATE case_files SET pin = $1, last_name = $2, first_name = $3, middle_name = $4,
                sex = $5, birth_date = $6, address_registration = $7, address_actual = $8,
                phone = $9, email = $10, disability_group = $11, msek_number = $12,
                msek_date = $13, ipra_number = $14, ipra_date = $15, ipra_valid_to = $16,
                notes = $17, updated_at = NOW()
            WHERE id = $18
            RETURNING {CASE_COLUMNS}
            "#
        ))
        .bind(&draft.pin)
        .bind(&draft.last_name)
        .bind(&draft.first_name)
        .bind(&draft.middle_name)
        .bind(draft.sex.as_str())
        .bind(draft.birth_date)
        .bind(&draft.address_registration)
        .bind(&draft.address_actual)
        .bind(&draft.phone)
        .bind(&draft.email)
        .bind(draft.disability_group.as_str())
        .bind(&draft.msek_number)
        .bind(draft.msek_date)
        .bind(&draft.ipra_number)
        .bind(draft.ipra_date)
        .bind(draft.ipra_valid_to)
        .bind(&draft.notes)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CaseRow::into_domain).transpose()
    }

    async fn case_statistics(&self) -> Result<CaseStatistics, BoxError> {
        #[derive(sqlx::FromRow)]
        struct StatRow {
            total: i64,
            with_disability: i64,
        }

        let stats: StatRow = sqlx::query_as(
            r#"
            SELECT count(*) AS total,
                   count(*) FILTER (WHERE disability_group <> 'NONE') AS with_disability
            FROM case_files
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(CaseStatistics {
            total: stats.total,
            with_disability: stats.with_disability,
            without_disability: stats.total - stats.with_disability,
        })
    }
}
