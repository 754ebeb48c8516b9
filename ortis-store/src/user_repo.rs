use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use ortis_core::identity::{User, UserUpdate};
use ortis_core::repository::UserRepository;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct StoreUserRepository {
    pool: PgPool,
}

impl StoreUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_digest: String,
    password_salt: String,
    full_name: String,
    phone: String,
    department: String,
    is_active: bool,
    roles: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = "id, username, password_digest, password_salt, full_name, phone, \
     department, is_active, roles, created_at, updated_at";

impl UserRow {
    fn into_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            password_digest: self.password_digest,
            password_salt: self.password_salt,
            full_name: self.full_name,
            phone: self.phone,
            department: self.department,
            is_active: self.is_active,
            roles: self.roles,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[async_trait]
impl UserRepository for StoreUserRepository {
    async fn create_user(&self, user: &User) -> Result<(), BoxError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_digest, password_salt, full_name, phone,
                department, is_active, roles, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_digest)
        .bind(&user.password_salt)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.department)
        .bind(user.is_active)
        .bind(&user.roles)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, BoxError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(UserRow::into_domain))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, BoxError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(UserRow::into_domain))
    }

    async fn list_users(&self) -> Result<Vec<User>, BoxError> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY username"))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(UserRow::into_domain).collect())
    }

    async fn update_user(&self, id: Uuid, update: &UserUpdate) -> Result<Option<User>, BoxError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            UPDATE users SET full_name = $1, phone = $2, department = $3, is_active = $4,
                roles = $5, updated_at = NOW()
            WHERE id = $6
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&update.full_name)
        .bind(&update.phone)
        .bind(&update.department)
        .bind(update.is_active)
        .bind(&update.roles)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_domain))
    }
}
