use std::sync::Arc;

use crate::database::Database;
use crate::error::DbResult;
use crate::field::{Field, Type};
use crate::op_iterator::{IterState, OpIterator};
use crate::transaction_id::TransactionId;
use crate::tuple::Tuple;
use crate::tuple_desc::{FieldItem, TupleDesc};

/// Drains `child` on the first pull, deleting each tuple through the
/// buffer pool, and yields a single one-field `INT` tuple with the
/// deleted-row count. Every call after that returns `None`.
pub struct Delete {
    state: IterState,
    tid: TransactionId,
    child: Box<dyn OpIterator>,
    done: bool,
    desc: Arc<TupleDesc>,
}

impl Delete {
    pub fn new(tid: TransactionId, child: Box<dyn OpIterator>) -> Self {
        Delete {
            state: IterState::default(),
            tid,
            child,
            done: false,
            desc: Arc::new(TupleDesc::new(vec![FieldItem::new(Type::Int, Some("count"))]).unwrap()),
        }
    }
}

impl OpIterator for Delete {
    fn state(&self) -> &IterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut IterState {
        &mut self.state
    }

    fn do_open(&mut self) -> DbResult<()> {
        self.child.open()?;
        self.done = false;
        Ok(())
    }

    fn fetch_next(&mut self) -> DbResult<Option<Tuple>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let pool = Database::global().buffer_pool();
        let mut count: i32 = 0;
        while self.child.has_next()? {
            let tuple = self.child.next()?.expect("has_next promised a tuple");
            pool.delete_tuple(self.tid, &tuple)?;
            count += 1;
        }

        Ok(Some(Tuple::from_fields(Arc::clone(&self.desc), vec![Field::Int(count)])?))
    }

    fn do_rewind(&mut self) -> DbResult<()> {
        self.child.rewind()?;
        self.done = false;
        Ok(())
    }

    fn do_close(&mut self) {
        self.child.close();
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        Arc::clone(&self.desc)
    }

    fn children(&self) -> Vec<&dyn OpIterator> {
        vec![self.child.as_ref()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        assert_eq!(children.len(), 1, "Delete takes exactly one child");
        self.child = children.remove(0);
    }
}
