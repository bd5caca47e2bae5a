use crate::field::Field;
use crate::op::Op;
use crate::tuple::Tuple;

/// `(fieldIndex, op, constantField)`; `filter` compares
/// `tuple.field(fieldIndex)` against the constant.
pub struct Predicate {
    pub field_index: usize,
    pub op: Op,
    pub constant: Field,
}

impl Predicate {
    pub fn new(field_index: usize, op: Op, constant: Field) -> Self {
        Predicate {
            field_index,
            op,
            constant,
        }
    }

    pub fn filter(&self, tuple: &Tuple) -> bool {
        self.op.apply(tuple.field(self.field_index), &self.constant)
    }
}

/// `(leftIndex, op, rightIndex)`; `filter` compares the two fields.
pub struct JoinPredicate {
    pub left_index: usize,
    pub op: Op,
    pub right_index: usize,
}

impl JoinPredicate {
    pub fn new(left_index: usize, op: Op, right_index: usize) -> Self {
        JoinPredicate {
            left_index,
            op,
            right_index,
        }
    }

    pub fn filter(&self, left: &Tuple, right: &Tuple) -> bool {
        self.op
            .apply(left.field(self.left_index), right.field(self.right_index))
    }
}
