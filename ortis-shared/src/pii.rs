use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wrapper for personal identifiers (PINs, document numbers) that keeps the
/// value out of Debug/Display output. API responses still need the real
/// value, so serialization is transparent; the wrapper exists to prevent
/// accidental leakage through log macros like tracing::info!("{:?}", req).
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Masked<T>(pub T);

impl<T: AsRef<str>> Masked<T> {
    /// Last two characters, the rest replaced with stars. Enough for an
    /// operator to confirm "ends in ...42" over the phone.
    fn preview(&self) -> String {
        let s = self.0.as_ref();
        let len = s.chars().count();
        if len <= 2 {
            return "****".to_string();
        }
        let tail: String = s.chars().skip(len - 2).collect();
        format!("{}{}", "*".repeat(len - 2), tail)
    }
}

impl<T: AsRef<str>> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.preview())
    }
}

impl<T: AsRef<str>> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.preview())
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Masked(value)
    }
}
