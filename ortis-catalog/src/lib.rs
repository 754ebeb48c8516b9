pub mod models;

pub use models::{DictEntry, DictError, DictKind, NewDictEntry};
