use std::fmt;
use std::sync::Arc;

use crate::error::{DbError, DbResult};
use crate::field::Field;
use crate::page_id::RecordId;
use crate::tuple_desc::TupleDesc;

/// An ordered vector of field values bound to a descriptor, with an
/// optional record id. A freshly-constructed tuple has no record id; one is
/// assigned when the tuple is placed on a page.
#[derive(Clone)]
pub struct Tuple {
    desc: Arc<TupleDesc>,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(desc: Arc<TupleDesc>) -> Self {
        let fields = desc
            .iter()
            .map(|fi| match fi.field_type {
                crate::field::Type::Int => Field::Int(0),
                crate::field::Type::Str => Field::Str(String::new()),
            })
            .collect();
        Tuple {
            desc,
            fields,
            record_id: None,
        }
    }

    pub fn from_fields(desc: Arc<TupleDesc>, fields: Vec<Field>) -> DbResult<Self> {
        if fields.len() != desc.len() {
            return Err(DbError::SchemaMismatch(format!(
                "expected {} fields, got {}",
                desc.len(),
                fields.len()
            )));
        }
        for (i, f) in fields.iter().enumerate() {
            if f.field_type() != desc.field_type(i) {
                return Err(DbError::SchemaMismatch(format!(
                    "field {} has type {} but descriptor expects {}",
                    i,
                    f.field_type(),
                    desc.field_type(i)
                )));
            }
        }
        Ok(Tuple {
            desc,
            fields,
            record_id: None,
        })
    }

    pub fn tuple_desc(&self) -> Arc<TupleDesc> {
        Arc::clone(&self.desc)
    }

    pub fn field(&self, i: usize) -> &Field {
        &self.fields[i]
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Setting a field requires the value's type to match the descriptor
    /// entry.
    pub fn set_field(&mut self, i: usize, value: Field) -> DbResult<()> {
        if value.field_type() != self.desc.field_type(i) {
            return Err(DbError::SchemaMismatch(format!(
                "cannot set field {}: value type {} does not match descriptor type {}",
                i,
                value.field_type(),
                self.desc.field_type(i)
            )));
        }
        self.fields[i] = value;
        Ok(())
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, rid: Option<RecordId>) {
        self.record_id = rid;
    }

    /// Concatenates the fields of two tuples; the caller is responsible
    /// for merging their descriptors separately (via `TupleDesc::merge`).
    pub fn concat(left: &Tuple, right: &Tuple, merged_desc: Arc<TupleDesc>) -> Tuple {
        let mut fields = left.fields.clone();
        fields.extend(right.fields.clone());
        Tuple {
            desc: merged_desc,
            fields,
            record_id: None,
        }
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.fields.iter().map(|v| v.to_string()).collect();
        write!(f, "({})", parts.join(", "))
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Type;
    use crate::tuple_desc::FieldItem;

    fn desc() -> Arc<TupleDesc> {
        Arc::new(
            TupleDesc::new(vec![
                FieldItem::new(Type::Int, Some("a")),
                FieldItem::new(Type::Str, Some("b")),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn fresh_tuple_has_no_record_id() {
        let t = Tuple::new(desc());
        assert!(t.record_id().is_none());
    }

    #[test]
    fn set_field_rejects_type_mismatch() {
        let mut t = Tuple::new(desc());
        assert!(t.set_field(0, Field::Str("x".into())).is_err());
        assert!(t.set_field(0, Field::Int(7)).is_ok());
        assert_eq!(t.field(0), &Field::Int(7));
    }

    #[test]
    fn from_fields_validates_arity_and_types() {
        assert!(Tuple::from_fields(desc(), vec![Field::Int(1)]).is_err());
        assert!(Tuple::from_fields(desc(), vec![Field::Int(1), Field::Int(2)]).is_err());
        assert!(Tuple::from_fields(desc(), vec![Field::Int(1), Field::Str("x".into())]).is_ok());
    }
}
