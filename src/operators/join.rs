use std::sync::Arc;

use crate::error::DbResult;
use crate::op_iterator::{IterState, OpIterator};
use crate::predicate::JoinPredicate;
use crate::tuple::Tuple;
use crate::tuple_desc::TupleDesc;

/// Nested-loops join. Output schema is `merge(left.desc, right.desc)`;
/// output tuples are the concatenation of matching left and right fields
/// (duplicate join columns are not removed).
///
/// The inner-empty short-circuit only applies to the first pass over the
/// right child: if the right relation turns out to be empty on the very
/// first scan, iteration ends immediately, but a right relation that is
/// merely exhausted on a later pass still rewinds and continues with the
/// next left tuple.
pub struct Join {
    state: IterState,
    predicate: JoinPredicate,
    left: Box<dyn OpIterator>,
    right: Box<dyn OpIterator>,
    current_left: Option<Tuple>,
    right_was_empty: bool,
    first_pass: bool,
    desc: Arc<TupleDesc>,
}

impl Join {
    pub fn new(predicate: JoinPredicate, left: Box<dyn OpIterator>, right: Box<dyn OpIterator>) -> Self {
        let desc = Arc::new(TupleDesc::merge(&left.tuple_desc(), &right.tuple_desc()));
        Join {
            state: IterState::default(),
            predicate,
            left,
            right,
            current_left: None,
            right_was_empty: false,
            first_pass: true,
            desc,
        }
    }
}

impl OpIterator for Join {
    fn state(&self) -> &IterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut IterState {
        &mut self.state
    }

    fn do_open(&mut self) -> DbResult<()> {
        self.left.open()?;
        self.right.open()?;
        self.current_left = None;
        self.right_was_empty = false;
        self.first_pass = true;
        Ok(())
    }

    fn fetch_next(&mut self) -> DbResult<Option<Tuple>> {
        loop {
            if self.current_left.is_none() {
                if !self.left.has_next()? {
                    return Ok(None);
                }
                self.current_left = self.left.next()?;
                self.right.rewind()?;

                if self.first_pass {
                    self.right_was_empty = !self.right.has_next()?;
                    self.first_pass = false;
                    if self.right_was_empty {
                        return Ok(None);
                    }
                } else if self.right_was_empty {
                    return Ok(None);
                }
            }

            let left = self.current_left.as_ref().unwrap();
            while self.right.has_next()? {
                let right = self.right.next()?.expect("has_next promised a tuple");
                if self.predicate.filter(left, &right) {
                    return Ok(Some(Tuple::concat(left, &right, Arc::clone(&self.desc))));
                }
            }

            // right exhausted for this left tuple; advance left on the
            // next iteration of the loop
            self.current_left = None;
        }
    }

    fn do_rewind(&mut self) -> DbResult<()> {
        self.left.rewind()?;
        self.right.rewind()?;
        self.current_left = None;
        self.first_pass = true;
        self.right_was_empty = false;
        Ok(())
    }

    fn do_close(&mut self) {
        self.left.close();
        self.right.close();
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        Arc::clone(&self.desc)
    }

    fn children(&self) -> Vec<&dyn OpIterator> {
        vec![self.left.as_ref(), self.right.as_ref()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        assert_eq!(children.len(), 2, "Join takes exactly two children");
        self.right = children.remove(1);
        self.left = children.remove(0);
        self.desc = Arc::new(TupleDesc::merge(&self.left.tuple_desc(), &self.right.tuple_desc()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, Type};
    use crate::op::Op;
    use crate::operators::tests_support::VecScan;
    use crate::tuple_desc::FieldItem;

    fn single_int(desc: &Arc<TupleDesc>, n: i32) -> Tuple {
        Tuple::from_fields(Arc::clone(desc), vec![Field::Int(n)]).unwrap()
    }

    fn int_desc() -> Arc<TupleDesc> {
        Arc::new(TupleDesc::new(vec![FieldItem::new(Type::Int, Some("x"))]).unwrap())
    }

    #[test]
    fn nested_loops_equi_join_s5() {
        let d = int_desc();
        let left = VecScan::new(Arc::clone(&d), vec![single_int(&d, 1), single_int(&d, 2), single_int(&d, 3)]);
        let right = VecScan::new(Arc::clone(&d), vec![single_int(&d, 2), single_int(&d, 2), single_int(&d, 4)]);

        let mut join = Join::new(JoinPredicate::new(0, Op::Equals, 0), Box::new(left), Box::new(right));
        join.open().unwrap();
        let mut out = Vec::new();
        while join.has_next().unwrap() {
            out.push(join.next().unwrap().unwrap());
        }
        join.close();

        assert_eq!(out.len(), 2);
        for t in &out {
            assert_eq!(t.field(0), &Field::Int(2));
            assert_eq!(t.field(1), &Field::Int(2));
        }
    }

    #[test]
    fn empty_right_relation_yields_no_rows() {
        let d = int_desc();
        let left = VecScan::new(Arc::clone(&d), vec![single_int(&d, 1)]);
        let right = VecScan::new(Arc::clone(&d), vec![]);
        let mut join = Join::new(JoinPredicate::new(0, Op::Equals, 0), Box::new(left), Box::new(right));
        join.open().unwrap();
        assert!(!join.has_next().unwrap());
        join.close();
    }
}
