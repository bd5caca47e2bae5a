use std::fmt;

use crate::error::{DbError, DbResult};
use crate::field::Type;

/// A single `(type, optional name)` entry of a row descriptor.
#[derive(Clone, Debug)]
pub struct FieldItem {
    pub field_type: Type,
    pub name: Option<String>,
}

impl FieldItem {
    pub fn new(field_type: Type, name: Option<&str>) -> Self {
        FieldItem {
            field_type,
            name: name.map(|s| s.to_string()),
        }
    }
}

/// The schema of a tuple: an ordered, non-empty sequence of fields.
/// Equality compares types only; names are metadata used for by-name
/// lookup and are ignored by `PartialEq`.
#[derive(Clone, Debug)]
pub struct TupleDesc {
    fields: Vec<FieldItem>,
}

impl TupleDesc {
    pub fn new(fields: Vec<FieldItem>) -> DbResult<Self> {
        if fields.is_empty() {
            return Err(DbError::IllegalArgument(
                "TupleDesc must have at least one field".to_string(),
            ));
        }
        Ok(TupleDesc { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_type(&self, i: usize) -> Type {
        self.fields[i].field_type
    }

    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.fields[i].name.as_deref()
    }

    /// Total on-disk size of a tuple with this descriptor.
    pub fn size(&self) -> usize {
        self.fields.iter().map(|f| f.field_type.len()).sum()
    }

    /// Index of the first field with the given name, if any.
    pub fn index_for_name(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.as_deref() == Some(name))
    }

    /// Concatenates two descriptors; names (and types) come from `a` then
    /// `b`, in order.
    pub fn merge(a: &TupleDesc, b: &TupleDesc) -> TupleDesc {
        let mut fields = a.fields.clone();
        fields.extend(b.fields.clone());
        TupleDesc { fields }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldItem> {
        self.fields.iter()
    }
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|(a, b)| a.field_type == b.field_type)
    }
}
impl Eq for TupleDesc {}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|fi| match &fi.name {
                Some(n) => format!("{}({})", n, fi.field_type),
                None => format!("{}", fi.field_type),
            })
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}
