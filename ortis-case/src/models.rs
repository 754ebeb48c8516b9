use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Disability group established by the medical commission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisabilityGroup {
    #[serde(rename = "NONE")]
    NotEstablished,
    #[serde(rename = "I")]
    GroupI,
    #[serde(rename = "II")]
    GroupII,
    #[serde(rename = "III")]
    GroupIII,
    #[serde(rename = "CHILD")]
    Child,
}

impl DisabilityGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisabilityGroup::NotEstablished => "NONE",
            DisabilityGroup::GroupI => "I",
            DisabilityGroup::GroupII => "II",
            DisabilityGroup::GroupIII => "III",
            DisabilityGroup::Child => "CHILD",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NONE" => Some(DisabilityGroup::NotEstablished),
            "I" => Some(DisabilityGroup::GroupI),
            "II" => Some(DisabilityGroup::GroupII),
            "III" => Some(DisabilityGroup::GroupIII),
            "CHILD" => Some(DisabilityGroup::Child),
            _ => None,
        }
    }

    /// Groups that count as an active determination for statistics
    pub fn is_established(&self) -> bool {
        !matches!(self, DisabilityGroup::NotEstablished)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "M" => Some(Sex::Male),
            "F" => Some(Sex::Female),
            _ => None,
        }
    }
}

/// A registered patient case file. The `number` is allocated once at
/// creation (`YYYY-NNNN`) and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseFile {
    pub id: Uuid,
    pub number: String,
    pub pin: String,
    pub last_name: String,
    pub first_name: String,
    pub middle_name: String,
    pub sex: Sex,
    pub birth_date: NaiveDate,
    pub address_registration: String,
    pub address_actual: String,
    pub phone: String,
    pub email: String,
    pub disability_group: DisabilityGroup,
    pub msek_number: String,
    pub msek_date: Option<NaiveDate>,
    pub ipra_number: String,
    pub ipra_date: Option<NaiveDate>,
    pub ipra_valid_to: Option<NaiveDate>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CaseFile {
    /// Display name: last + first (+ middle when present)
    pub fn full_name(&self) -> String {
        let mut parts = vec![self.last_name.as_str(), self.first_name.as_str()];
        if !self.middle_name.is_empty() {
            parts.push(self.middle_name.as_str());
        }
        parts.join(" ")
    }

    /// Full years on the given date, counting the birthday itself
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        use chrono::Datelike;
        let mut years = today.year() - self.birth_date.year();
        if (today.month(), today.day()) < (self.birth_date.month(), self.birth_date.day()) {
            years -= 1;
        }
        years
    }

    pub fn age(&self) -> i32 {
        self.age_on(Utc::now().date_naive())
    }
}

/// Payload for creating or updating a case file. The identifier and
/// number are assigned by the registry, never by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCaseFile {
    pub pin: String,
    pub last_name: String,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    pub sex: Sex,
    pub birth_date: NaiveDate,
    pub address_registration: String,
    #[serde(default)]
    pub address_actual: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub disability_group: DisabilityGroup,
    #[serde(default)]
    pub msek_number: String,
    #[serde(default)]
    pub msek_date: Option<NaiveDate>,
    #[serde(default)]
    pub ipra_number: String,
    #[serde(default)]
    pub ipra_date: Option<NaiveDate>,
    #[serde(default)]
    pub ipra_valid_to: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

impl NewCaseFile {
    pub fn validate(&self) -> Result<(), CaseValidationError> {
        if self.pin.trim().is_empty() {
            return Err(CaseValidationError::MissingField("pin"));
        }
        if self.pin.len() > 14 {
            return Err(CaseValidationError::PinTooLong(self.pin.len()));
        }
        if self.last_name.trim().is_empty() {
            return Err(CaseValidationError::MissingField("last_name"));
        }
        if self.first_name.trim().is_empty() {
            return Err(CaseValidationError::MissingField("first_name"));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaseValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("PIN exceeds 14 characters (got {0})")]
    PinTooLong(usize),
}

/// List query: filter by disability group, free-text search over
/// PIN/name fields, newest first unless ordered otherwise.
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub disability_group: Option<DisabilityGroup>,
    pub search: Option<String>,
}

impl CaseFilter {
    /// Case-insensitive match against PIN and name parts
    pub fn matches(&self, case: &CaseFile) -> bool {
        if let Some(group) = self.disability_group {
            if case.disability_group != group {
                return false;
            }
        }
        if let Some(needle) = &self.search {
            let needle = needle.to_lowercase();
            let haystack = format!(
                "{} {} {} {}",
                case.pin, case.last_name, case.first_name, case.middle_name
            )
            .to_lowercase();
            if !haystack.contains(&needle) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseStatistics {
    pub total: i64,
    pub with_disability: i64,
    pub without_disability: i64,
}
