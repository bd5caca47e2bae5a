use std::fmt;

/// Identifies a page within a table's heap file.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct HeapPageId {
    pub table_id: i32,
    pub page_number: i32,
}

impl HeapPageId {
    pub fn new(table_id: i32, page_number: i32) -> Self {
        HeapPageId {
            table_id,
            page_number,
        }
    }
}

impl fmt::Display for HeapPageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeapPageId(table={}, page={})", self.table_id, self.page_number)
    }
}

/// Uniquely names a tuple on disk: the page it lives on and its slot index.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct RecordId {
    pub page_id: HeapPageId,
    pub slot_index: i32,
}

impl RecordId {
    pub fn new(page_id: HeapPageId, slot_index: i32) -> Self {
        RecordId {
            page_id,
            slot_index,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({}, slot={})", self.page_id, self.slot_index)
    }
}
