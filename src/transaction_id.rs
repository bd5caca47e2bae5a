use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// An opaque, monotonically increasing identifier attributing dirty pages
/// to a logical unit of work.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct TransactionId {
    id: u64,
}

impl TransactionId {
    pub fn new() -> Self {
        TransactionId {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}
