use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three reference dictionaries: TSR categories, workshops and
/// order-status reference rows. They share one row shape, so a single
/// entry type with a kind discriminator covers all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DictKind {
    Category,
    Workshop,
    OrderStatus,
}

impl DictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DictKind::Category => "category",
            DictKind::Workshop => "workshop",
            DictKind::OrderStatus => "order_status",
        }
    }

    /// Backing table for the dictionary
    pub fn table(&self) -> &'static str {
        match self {
            DictKind::Category => "tsr_categories",
            DictKind::Workshop => "workshops",
            DictKind::OrderStatus => "order_status_refs",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "category" => Some(DictKind::Category),
            "workshop" => Some(DictKind::Workshop),
            "order_status" => Some(DictKind::OrderStatus),
            _ => None,
        }
    }
}

/// One dictionary row. Codes are unique per dictionary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictEntry {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDictEntry {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl NewDictEntry {
    pub fn validate(&self) -> Result<(), DictError> {
        if self.code.trim().is_empty() {
            return Err(DictError::MissingField("code"));
        }
        if self.name.trim().is_empty() {
            return Err(DictError::MissingField("name"));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DictError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}
