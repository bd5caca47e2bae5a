use std::cmp::Ordering;

use crate::field::Field;

/// Comparison operators shared by `Predicate` and `JoinPredicate`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Op {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEq,
    GreaterThan,
    GreaterThanOrEq,
    Like,
}

impl Op {
    /// Applies the operator to two field values already known to be
    /// comparable (same type). `Like` is substring containment for
    /// strings and equality for ints, per `Field::like`.
    pub fn apply(&self, lhs: &Field, rhs: &Field) -> bool {
        if *self == Op::Like {
            return lhs.like(rhs);
        }
        match lhs.partial_cmp(rhs) {
            Some(ord) => match self {
                Op::Equals => ord == Ordering::Equal,
                Op::NotEquals => ord != Ordering::Equal,
                Op::LessThan => ord == Ordering::Less,
                Op::LessThanOrEq => ord != Ordering::Greater,
                Op::GreaterThan => ord == Ordering::Greater,
                Op::GreaterThanOrEq => ord != Ordering::Less,
                Op::Like => unreachable!(),
            },
            None => *self == Op::NotEquals,
        }
    }
}
