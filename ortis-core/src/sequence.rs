//! Year-scoped business identifier allocation.
//!
//! Case files, orders and invoices carry human-readable numbers in the
//! form `{prefix}{year}-{NNNN}`. The next number is derived from the
//! current maximum for the year (max-and-increment); persistence layers
//! are expected to run the max query and the insert inside one
//! transaction and lean on the unique constraint plus a retry for the
//! concurrent-allocation race.

/// Entity classes that carry a sequential business number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    Case,
    Order,
    Invoice,
}

impl SequenceKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            SequenceKind::Case => "",
            SequenceKind::Order => "ORD-",
            SequenceKind::Invoice => "INV-",
        }
    }

    /// `{prefix}{year}-`, the shared prefix of all numbers for a year
    pub fn year_prefix(&self, year: i32) -> String {
        format!("{}{}-", self.prefix(), year)
    }
}

/// Next identifier for the year, given the current maximum (the
/// lexicographically greatest existing number with the year prefix).
///
/// A missing or malformed maximum starts the sequence at 1; the numeric
/// suffix is zero-padded to four digits. Sequences past 9999 keep
/// incrementing without padding loss, they just grow wider.
pub fn next_number(kind: SequenceKind, year: i32, current_max: Option<&str>) -> String {
    let next = current_max
        .and_then(|max| parse_sequence(max))
        .map(|seq| seq + 1)
        .unwrap_or(1);
    format!("{}{}-{:04}", kind.prefix(), year, next)
}

/// Numeric suffix after the final dash, or None when malformed
fn parse_sequence(number: &str) -> Option<u32> {
    number.rsplit('-').next()?.parse().ok()
}
