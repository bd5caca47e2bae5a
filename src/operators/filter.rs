use std::sync::Arc;

use crate::error::DbResult;
use crate::op_iterator::{IterState, OpIterator};
use crate::predicate::Predicate;
use crate::tuple::Tuple;
use crate::tuple_desc::TupleDesc;

/// Pulls from `child` until `predicate` accepts a tuple or the child is
/// exhausted. Output schema equals the child's.
pub struct Filter {
    state: IterState,
    predicate: Predicate,
    child: Box<dyn OpIterator>,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn OpIterator>) -> Self {
        Filter {
            state: IterState::default(),
            predicate,
            child,
        }
    }
}

impl OpIterator for Filter {
    fn state(&self) -> &IterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut IterState {
        &mut self.state
    }

    fn do_open(&mut self) -> DbResult<()> {
        self.child.open()
    }

    fn fetch_next(&mut self) -> DbResult<Option<Tuple>> {
        while self.child.has_next()? {
            let t = self.child.next()?.expect("has_next promised a tuple");
            if self.predicate.filter(&t) {
                return Ok(Some(t));
            }
        }
        Ok(None)
    }

    fn do_rewind(&mut self) -> DbResult<()> {
        self.child.rewind()
    }

    fn do_close(&mut self) {
        self.child.close();
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        self.child.tuple_desc()
    }

    fn children(&self) -> Vec<&dyn OpIterator> {
        vec![self.child.as_ref()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) {
        assert_eq!(children.len(), 1, "Filter takes exactly one child");
        self.child = children.remove(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, Type};
    use crate::op::Op;
    use crate::operators::tests_support::VecScan;
    use crate::tuple_desc::FieldItem;

    fn row(a: i32, b: &str) -> Tuple {
        let desc = Arc::new(
            TupleDesc::new(vec![
                FieldItem::new(Type::Int, Some("a")),
                FieldItem::new(Type::Str, Some("b")),
            ])
            .unwrap(),
        );
        Tuple::from_fields(desc, vec![Field::Int(a), Field::Str(b.to_string())]).unwrap()
    }

    #[test]
    fn filters_by_predicate_s4() {
        let rows = vec![row(1, "x"), row(2, "y"), row(3, "x")];
        let desc = rows[0].tuple_desc();
        let scan = VecScan::new(desc, rows);
        let mut filter = Filter::new(Predicate::new(0, Op::GreaterThan, Field::Int(1)), Box::new(scan));
        filter.open().unwrap();
        let mut out = Vec::new();
        while filter.has_next().unwrap() {
            out.push(filter.next().unwrap().unwrap());
        }
        filter.close();
        assert_eq!(out.len(), 2);
        assert!(out.iter().any(|t| t.field(0) == &Field::Int(2)));
        assert!(out.iter().any(|t| t.field(0) == &Field::Int(3)));
    }

    #[test]
    fn set_children_rewrites_the_scanned_child() {
        let desc = rows_desc();
        let scan = VecScan::new(Arc::clone(&desc), vec![row(1, "x")]);
        let mut filter = Filter::new(Predicate::new(0, Op::GreaterThan, Field::Int(0)), Box::new(scan));
        assert_eq!(filter.children().len(), 1);

        let replacement = VecScan::new(Arc::clone(&desc), vec![row(5, "z")]);
        filter.set_children(vec![Box::new(replacement)]);

        filter.open().unwrap();
        let out = filter.next().unwrap().unwrap();
        assert_eq!(out.field(0), &Field::Int(5));
        filter.close();
    }

    fn rows_desc() -> Arc<TupleDesc> {
        row(0, "").tuple_desc()
    }
}
