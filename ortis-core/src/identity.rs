use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Capability tags. A user holds a set of these; ADMIN implies all of
/// them.
pub const ROLE_REGISTRY: &str = "REGISTRY";
pub const ROLE_MED: &str = "MED";
pub const ROLE_WORKSHOP: &str = "WORKSHOP";
pub const ROLE_WAREHOUSE: &str = "WAREHOUSE";
pub const ROLE_ADMIN: &str = "ADMIN";

pub const ALL_ROLES: &[&str] = &[
    ROLE_REGISTRY,
    ROLE_MED,
    ROLE_WORKSHOP,
    ROLE_WAREHOUSE,
    ROLE_ADMIN,
];

/// True when the user may act: ADMIN bypasses everything, an empty
/// requirement means any authenticated user, otherwise any overlap with
/// the required set is enough.
pub fn has_capability(user_roles: &[String], required: &[&str]) -> bool {
    if user_roles.iter().any(|r| r == ROLE_ADMIN) {
        return true;
    }
    if required.is_empty() {
        return true;
    }
    required
        .iter()
        .any(|req| user_roles.iter().any(|r| r == req))
}

pub fn is_known_role(code: &str) -> bool {
    ALL_ROLES.contains(&code)
}

/// System user. Password material is a salted SHA-256 digest; the digest
/// and salt never leave the store/auth layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_digest: String,
    #[serde(skip_serializing)]
    pub password_salt: String,
    pub full_name: String,
    pub phone: String,
    pub department: String,
    pub is_active: bool,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_role(&self, code: &str) -> bool {
        has_capability(&self.roles, &[code])
    }

    pub fn verify_password(&self, password: &str) -> bool {
        password_digest(&self.password_salt, password) == self.password_digest
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub department: String,
    pub roles: Vec<String>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), IdentityError> {
        if self.username.trim().is_empty() {
            return Err(IdentityError::MissingField("username"));
        }
        if self.password.len() < 8 {
            return Err(IdentityError::PasswordTooShort);
        }
        for role in &self.roles {
            if !is_known_role(role) {
                return Err(IdentityError::UnknownRole(role.clone()));
            }
        }
        Ok(())
    }
}

/// Editable user fields; password changes are a separate concern and the
/// username is immutable.
#[derive(Debug, Clone, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub department: String,
    pub is_active: bool,
    pub roles: Vec<String>,
}

impl UserUpdate {
    pub fn validate(&self) -> Result<(), IdentityError> {
        for role in &self.roles {
            if !is_known_role(role) {
                return Err(IdentityError::UnknownRole(role.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Password must be at least 8 characters")]
    PasswordTooShort,

    #[error("Unknown role code: {0}")]
    UnknownRole(String),
}

/// Hex-encoded SHA-256 over salt + password
pub fn password_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}
