use std::sync::Arc;

use crate::database::Database;
use crate::error::DbResult;
use crate::heap_file::HeapFileIterator;
use crate::op_iterator::{IterState, OpIterator};
use crate::transaction_id::TransactionId;
use crate::tuple::Tuple;
use crate::tuple_desc::TupleDesc;

/// Wraps a heap file's iterator for one table under a transaction.
pub struct SeqScan {
    state: IterState,
    tid: TransactionId,
    table_id: i32,
    iter: Option<HeapFileIterator>,
}

impl SeqScan {
    pub fn new(tid: TransactionId, table_id: i32) -> Self {
        SeqScan {
            state: IterState::default(),
            tid,
            table_id,
            iter: None,
        }
    }

    pub fn table_id(&self) -> i32 {
        self.table_id
    }
}

impl OpIterator for SeqScan {
    fn state(&self) -> &IterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut IterState {
        &mut self.state
    }

    fn do_open(&mut self) -> DbResult<()> {
        let db = Database::global();
        let file = db.catalog().get_file(self.table_id)?;
        let mut iter = crate::heap_file::HeapFile::iter(file, db.buffer_pool(), self.tid);
        iter.rewind()?;
        self.iter = Some(iter);
        Ok(())
    }

    fn fetch_next(&mut self) -> DbResult<Option<Tuple>> {
        match self.iter.as_mut() {
            Some(it) => it.next(),
            None => Ok(None),
        }
    }

    fn do_rewind(&mut self) -> DbResult<()> {
        match self.iter.as_mut() {
            Some(it) => it.rewind(),
            None => self.do_open(),
        }
    }

    fn do_close(&mut self) {
        self.iter = None;
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        Database::global()
            .catalog()
            .tuple_desc(self.table_id)
            .expect("scan's table missing from catalog")
    }

    fn children(&self) -> Vec<&dyn OpIterator> {
        Vec::new()
    }

    fn set_children(&mut self, children: Vec<Box<dyn OpIterator>>) {
        assert!(children.is_empty(), "SeqScan is a leaf and takes no children");
    }
}
