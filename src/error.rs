use std::fmt;

use crate::page_id::{HeapPageId, RecordId};

/// Error taxonomy for the engine core.
///
/// Variants map to the kinds described by the error handling design: page
/// and slot invariant violations, transaction cancellation, I/O failure,
/// tuple deserialization failure, and construction-time misconfiguration.
#[derive(Debug)]
pub enum DbError {
    /// No free slot was available on the page.
    PageFull(HeapPageId),
    /// A delete was attempted against a record id the page does not own.
    NotFoundOnPage(RecordId),
    /// A tuple's fields do not match the descriptor of the page/table it is
    /// being written into.
    SchemaMismatch(String),
    /// The catalog has no entry for a table id.
    CatalogMiss(i32),
    /// The owning transaction cancelled or conflicted; terminal for the
    /// issuing plan.
    TransactionAborted(String),
    /// Underlying file I/O failed.
    Io(std::io::Error),
    /// A page's bytes could not be decoded into tuples.
    Corrupt(String),
    /// Construction-time misconfiguration, raised immediately.
    IllegalArgument(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::PageFull(pid) => write!(f, "page full: {:?}", pid),
            DbError::NotFoundOnPage(rid) => {
                write!(f, "tuple not found on page: {:?}", rid)
            }
            DbError::SchemaMismatch(msg) => write!(f, "schema mismatch: {}", msg),
            DbError::CatalogMiss(id) => write!(f, "no such table in catalog: {}", id),
            DbError::TransactionAborted(msg) => {
                write!(f, "transaction aborted: {}", msg)
            }
            DbError::Io(e) => write!(f, "io error: {}", e),
            DbError::Corrupt(msg) => write!(f, "corrupt page data: {}", msg),
            DbError::IllegalArgument(msg) => write!(f, "illegal argument: {}", msg),
        }
    }
}

impl std::error::Error for DbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DbError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        DbError::Io(e)
    }
}

pub type DbResult<T> = Result<T, DbError>;
