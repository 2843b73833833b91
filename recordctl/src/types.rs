//! Common type definitions.
//!
//! - [`RecordId`]: identifier of a personal record
//! - [`Operation`]: the read operations the service exposes, used to label failures

use std::fmt;

/// Records are keyed by the table's integer primary key.
pub type RecordId = i64;

/// Read operations over the record table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Paginated listing
    List,
    /// Single-record lookup
    GetById,
    /// Bulk export
    Export,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::List => write!(f, "fetch personal data"),
            Operation::GetById => write!(f, "fetch personal data by ID"),
            Operation::Export => write!(f, "export personal data"),
        }
    }
}
