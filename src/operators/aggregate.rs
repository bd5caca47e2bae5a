use std::sync::Arc;

use crate::aggregator::{self, AggOp, IntAggregator, StrAggregator, NO_GROUPING};
use crate::error::{DbError, DbResult};
use crate::field::Type;
use crate::op_iterator::{IterState, OpIterator};
use crate::tuple::Tuple;
use crate::tuple_desc::TupleDesc;

/// Drives `child` to completion on first pull, merging each tuple into
/// per-group state, then yields one output tuple per group (or a single
/// total when `group_index == NO_GROUPING`). Picks the integer or string
/// aggregator flavor from the child's aggregate-column type at
/// construction time.
pub struct Aggregate {
    state: IterState,
    child: Box<dyn OpIterator>,
    group_index: usize,
    group_type: Option<Type>,
    agg_index: usize,
    op: AggOp,
    agg_is_string: bool,
    desc: Arc<TupleDesc>,
    results: Vec<Tuple>,
    pos: usize,
    computed: bool,
}

impl Aggregate {
    pub fn new(child: Box<dyn OpIterator>, group_index: usize, agg_index: usize, op: AggOp) -> DbResult<Self> {
        let child_desc = child.tuple_desc();
        let group_type = if group_index == NO_GROUPING {
            None
        } else {
            Some(child_desc.field_type(group_index))
        };
        let agg_field_type = child_desc.field_type(agg_index);
        let agg_is_string = agg_field_type == Type::Str;
        if agg_is_string && op != AggOp::Count {
            return Err(DbError::IllegalArgument(
                "string aggregator only supports COUNT".to_string(),
            ));
        }
        let desc = Arc::new(aggregator::output_desc(group_type));
        Ok(Aggregate {
            state: IterState::default(),
            child,
            group_index,
            group_type,
            agg_index,
            op,
            agg_is_string,
            desc,
            results: Vec::new(),
            pos: 0,
            computed: false,
        })
    }

    fn compute(&mut self) -> DbResult<()> {
        let results = if self.agg_is_string {
            let mut agg = StrAggregator::new(self.group_index, self.group_type, self.agg_index, self.op)?;
            while self.child.has_next()? {
                let t = self.child.next()?.expect("has_next promised a tuple");
                agg.merge_tuple(&t)?;
            }
            agg.results(Arc::clone(&self.desc))?
        } else {
            let mut agg = IntAggregator::new(self.group_index, self.group_type, self.agg_index, self.op);
            while self.child.has_next()? {
                let t = self.child.next()?.expect("has_next promised a tuple");
                agg.merge_tuple(&t)?;
            }
            agg.results(Arc::clone(&self.desc))?
        };
        self.results = results;
        self.pos = 0;
        self.computed = true;
        Ok(())
    }
}

impl OpIterator for Aggregate {
    fn state(&self) -> &IterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut IterState {
        &mut self.state
    }

    fn do_open(&mut self) -> DbResult<()> {
        self.child.open()?;
        self.computed = false;
        self.pos = 0;
        Ok(())
    }

    fn fetch_next(&mut self) -> DbResult<Option<Tuple>> {
        if !self.computed {
            self.compute()?;
        }
        if self.pos < self.results.len() {
            let t = self.results[self.pos].clone();
            self.pos += 1;
            Ok(Some(t))
        } else {
            Ok(None)
        }
    }

    fn do_rewind(&mut self) -> DbResult<()> {
        self.child.rewind()?;
        self.computed = false;
        self.pos = 0;
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
        assert_eq!(children.len(), 1, "Aggregate takes exactly one child");
        self.child = children.remove(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::operators::tests_support::VecScan;
    use crate::tuple_desc::FieldItem;

    fn row(desc: &Arc<TupleDesc>, g: &str, v: i32) -> Tuple {
        Tuple::from_fields(Arc::clone(desc), vec![Field::Str(g.into()), Field::Int(v)]).unwrap()
    }

    #[test]
    fn grouped_sum_s6() {
        let desc = Arc::new(
            TupleDesc::new(vec![
                FieldItem::new(Type::Str, Some("g")),
                FieldItem::new(Type::Int, Some("v")),
            ])
            .unwrap(),
        );
        let rows = vec![row(&desc, "A", 1), row(&desc, "A", 2), row(&desc, "B", 5)];
        let scan = VecScan::new(Arc::clone(&desc), rows);
        let mut agg = Aggregate::new(Box::new(scan), 0, 1, AggOp::Sum).unwrap();
        agg.open().unwrap();
        let mut out = Vec::new();
        while agg.has_next().unwrap() {
            out.push(agg.next().unwrap().unwrap());
        }
        agg.close();
        assert_eq!(out.len(), 2);
        let sum_of = |g: &str| {
            out.iter()
                .find(|t| t.field(0) == &Field::Str(g.to_string()))
                .map(|t| t.field(1).clone())
        };
        assert_eq!(sum_of("A"), Some(Field::Int(3)));
        assert_eq!(sum_of("B"), Some(Field::Int(5)));
    }

    #[test]
    fn rewind_produces_equal_multiset() {
        let desc = Arc::new(
            TupleDesc::new(vec![
                FieldItem::new(Type::Str, Some("g")),
                FieldItem::new(Type::Int, Some("v")),
            ])
            .unwrap(),
        );
        let rows = vec![row(&desc, "A", 1), row(&desc, "A", 2), row(&desc, "B", 5)];
        let scan = VecScan::new(Arc::clone(&desc), rows);
        let mut agg = Aggregate::new(Box::new(scan), 0, 1, AggOp::Sum).unwrap();
        agg.open().unwrap();
        let mut first = Vec::new();
        while agg.has_next().unwrap() {
            first.push(agg.next().unwrap().unwrap());
        }
        agg.rewind().unwrap();
        let mut second = Vec::new();
        while agg.has_next().unwrap() {
            second.push(agg.next().unwrap().unwrap());
        }
        agg.close();
        assert_eq!(first.len(), second.len());
        for t in &first {
            assert!(second.iter().any(|o| o == t));
        }
    }

    #[test]
    fn string_aggregate_rejects_non_count_at_construction() {
        let desc = Arc::new(
            TupleDesc::new(vec![
                FieldItem::new(Type::Str, Some("g")),
                FieldItem::new(Type::Str, Some("v")),
            ])
            .unwrap(),
        );
        let scan = VecScan::new(Arc::clone(&desc), vec![]);
        assert!(Aggregate::new(Box::new(scan), 0, 1, AggOp::Sum).is_err());
    }
}
