pub mod models;

pub use models::{
    CaseFile, CaseFilter, CaseStatistics, CaseValidationError, DisabilityGroup, NewCaseFile, Sex,
};
