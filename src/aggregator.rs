//! Per-group aggregation state, independent of the pull-iterator protocol.
//! The [`crate::operators::aggregate::Aggregate`] operator drives a child
//! to completion into one of these, then replays its grouped results.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{DbError, DbResult};
use crate::field::{Field, Type};
use crate::tuple::Tuple;
use crate::tuple_desc::{FieldItem, TupleDesc};

/// Sentinel `group_index` meaning "compute one global aggregate" rather
/// than grouping by a field.
pub const NO_GROUPING: usize = usize::MAX;

/// The aggregation function applied to the aggregate column within each
/// group.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AggOp {
    Min,
    Max,
    Sum,
    Count,
    Avg,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum GroupKey {
    None,
    Int(i32),
    Str(String),
}

impl GroupKey {
    fn from_field(field: &Field) -> GroupKey {
        match field {
            Field::Int(v) => GroupKey::Int(*v),
            Field::Str(s) => GroupKey::Str(s.clone()),
        }
    }

    fn into_field(self, group_type: Type) -> Field {
        match (self, group_type) {
            (GroupKey::Int(v), Type::Int) => Field::Int(v),
            (GroupKey::Str(s), Type::Str) => Field::Str(s),
            _ => unreachable!("group key tag always matches its recorded group type"),
        }
    }
}

/// Floor division, since plain `i64` division truncates toward zero and
/// `AVG` is specified as `floor(sum / count)`.
fn div_floor(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

#[derive(Clone, Copy)]
struct IntGroupState {
    sum: i64,
    count: i64,
    min: i32,
    max: i32,
}

impl IntGroupState {
    fn new(first: i32) -> Self {
        IntGroupState {
            sum: first as i64,
            count: 1,
            min: first,
            max: first,
        }
    }

    fn merge(&mut self, v: i32) {
        self.sum += v as i64;
        self.count += 1;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }

    fn finish(&self, op: AggOp) -> i32 {
        match op {
            AggOp::Min => self.min,
            AggOp::Max => self.max,
            AggOp::Sum => self.sum as i32,
            AggOp::Count => self.count as i32,
            AggOp::Avg => div_floor(self.sum, self.count) as i32,
        }
    }
}

/// Supports `{MIN, MAX, SUM, COUNT, AVG}` over an `INT` aggregate column.
pub struct IntAggregator {
    group_index: usize,
    group_type: Option<Type>,
    agg_index: usize,
    op: AggOp,
    groups: HashMap<GroupKey, IntGroupState>,
}

impl IntAggregator {
    pub fn new(group_index: usize, group_type: Option<Type>, agg_index: usize, op: AggOp) -> Self {
        IntAggregator {
            group_index,
            group_type,
            agg_index,
            op,
            groups: HashMap::new(),
        }
    }

    pub fn merge_tuple(&mut self, tuple: &Tuple) -> DbResult<()> {
        let value = match tuple.field(self.agg_index) {
            Field::Int(v) => *v,
            other => {
                return Err(DbError::SchemaMismatch(format!(
                    "integer aggregator expects an INT aggregate column, got {}",
                    other.field_type()
                )))
            }
        };
        let key = if self.group_index == NO_GROUPING {
            GroupKey::None
        } else {
            GroupKey::from_field(tuple.field(self.group_index))
        };
        self.groups
            .entry(key)
            .and_modify(|s| s.merge(value))
            .or_insert_with(|| IntGroupState::new(value));
        Ok(())
    }

    /// One output tuple per group (or a single total when ungrouped), in
    /// implementation-defined order — callers must compare as a multiset.
    pub fn results(&self, desc: Arc<TupleDesc>) -> DbResult<Vec<Tuple>> {
        let grouped = self.group_index != NO_GROUPING;
        self.groups
            .iter()
            .map(|(key, state)| {
                let agg_value = Field::Int(state.finish(self.op));
                let fields = if grouped {
                    let group_type = self.group_type.expect("grouped aggregator needs a group type");
                    vec![key.clone().into_field(group_type), agg_value]
                } else {
                    vec![agg_value]
                };
                Tuple::from_fields(Arc::clone(&desc), fields)
            })
            .collect()
    }
}

/// Supports only `COUNT` over a `STRING` aggregate column; any other
/// operator is rejected at construction.
pub struct StrAggregator {
    group_index: usize,
    group_type: Option<Type>,
    agg_index: usize,
    groups: HashMap<GroupKey, i64>,
}

impl StrAggregator {
    pub fn new(group_index: usize, group_type: Option<Type>, agg_index: usize, op: AggOp) -> DbResult<Self> {
        if op != AggOp::Count {
            return Err(DbError::IllegalArgument(
                "string aggregator only supports COUNT".to_string(),
            ));
        }
        Ok(StrAggregator {
            group_index,
            group_type,
            agg_index,
            groups: HashMap::new(),
        })
    }

    pub fn merge_tuple(&mut self, tuple: &Tuple) -> DbResult<()> {
        if !matches!(tuple.field(self.agg_index), Field::Str(_)) {
            return Err(DbError::SchemaMismatch(
                "string aggregator expects a STRING aggregate column".to_string(),
            ));
        }
        let key = if self.group_index == NO_GROUPING {
            GroupKey::None
        } else {
            GroupKey::from_field(tuple.field(self.group_index))
        };
        *self.groups.entry(key).or_insert(0) += 1;
        Ok(())
    }

    pub fn results(&self, desc: Arc<TupleDesc>) -> DbResult<Vec<Tuple>> {
        let grouped = self.group_index != NO_GROUPING;
        self.groups
            .iter()
            .map(|(key, count)| {
                let agg_value = Field::Int(*count as i32);
                let fields = if grouped {
                    let group_type = self.group_type.expect("grouped aggregator needs a group type");
                    vec![key.clone().into_field(group_type), agg_value]
                } else {
                    vec![agg_value]
                };
                Tuple::from_fields(Arc::clone(&desc), fields)
            })
            .collect()
    }
}

pub fn output_desc(group_type: Option<Type>) -> TupleDesc {
    let fields = match group_type {
        Some(ty) => vec![
            FieldItem::new(ty, Some("groupVal")),
            FieldItem::new(Type::Int, Some("aggregateVal")),
        ],
        None => vec![FieldItem::new(Type::Int, Some("aggregateVal"))],
    };
    TupleDesc::new(fields).expect("aggregate output descriptor always has at least one field")
}
