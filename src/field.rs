use std::fmt;
use std::io::Read;

use crate::error::{DbError, DbResult};
use crate::io::{read_exact_vec, Encodeable};

/// Fixed width of a `STRING` field on disk, including its 4-byte length
/// prefix (`L` in the data model).
pub const STRING_LEN: usize = 128;

/// The closed set of field types the engine understands.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Type {
    Int,
    Str,
}

impl Type {
    /// Total on-disk length of a value of this type.
    pub fn len(&self) -> usize {
        match self {
            Type::Int => 4,
            Type::Str => STRING_LEN,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "INT"),
            Type::Str => write!(f, "STRING"),
        }
    }
}

/// A tagged field value. Equality is by tag and value; ordering is defined
/// per type and feeds the predicate comparators.
#[derive(Clone, Debug)]
pub enum Field {
    Int(i32),
    Str(String),
}

impl Field {
    pub fn field_type(&self) -> Type {
        match self {
            Field::Int(_) => Type::Int,
            Field::Str(_) => Type::Str,
        }
    }

    /// Substring containment for strings, equality for ints — the `LIKE`
    /// predicate's contract.
    pub fn like(&self, other: &Field) -> bool {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => a == b,
            (Field::Str(a), Field::Str(b)) => a.contains(b.as_str()),
            _ => false,
        }
    }
}

impl Encodeable for Field {
    fn encode(&self) -> Vec<u8> {
        match self {
            Field::Int(v) => v.to_be_bytes().to_vec(),
            Field::Str(s) => {
                let payload = s.as_bytes();
                let max_payload = STRING_LEN - 4;
                if payload.len() > max_payload {
                    // Callers are expected to validate width before this
                    // point; truncate defensively rather than corrupt the
                    // page layout.
                    let mut buf = Vec::with_capacity(STRING_LEN);
                    buf.extend_from_slice(&(max_payload as u32).to_be_bytes());
                    buf.extend_from_slice(&payload[..max_payload]);
                    return buf;
                }
                let mut buf = Vec::with_capacity(STRING_LEN);
                buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
                buf.extend_from_slice(payload);
                buf.resize(STRING_LEN, 0);
                buf
            }
        }
    }
}

impl Field {
    pub fn decode(field_type: Type, reader: &mut impl Read) -> DbResult<Field> {
        match field_type {
            Type::Int => {
                let bytes = read_exact_vec(reader, 4)?;
                Ok(Field::Int(i32::from_be_bytes(bytes.try_into().unwrap())))
            }
            Type::Str => {
                let len_bytes = read_exact_vec(reader, 4)?;
                let n = u32::from_be_bytes(len_bytes.try_into().unwrap()) as usize;
                let max_payload = STRING_LEN - 4;
                if n > max_payload {
                    return Err(DbError::Corrupt(format!(
                        "string length {} exceeds max payload {}",
                        n, max_payload
                    )));
                }
                let payload = read_exact_vec(reader, max_payload)?;
                let s = String::from_utf8(payload[..n].to_vec())
                    .map_err(|e| DbError::Corrupt(e.to_string()))?;
                Ok(Field::Str(s))
            }
        }
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => a == b,
            (Field::Str(a), Field::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Field {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => a.partial_cmp(b),
            (Field::Str(a), Field::Str(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Str(s) => write!(f, "{}", s),
        }
    }
}
