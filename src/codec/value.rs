//! Typed field values

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type tag of a field. The discriminant is the marker byte written in
/// front of the encoded field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ValueType {
    Null = 0x00,
    Bytes = 0x12,
    String = 0x13,
    Uint64 = 0x20,
    Int64 = 0x21,
    Float64 = 0x22,
}

impl ValueType {
    pub fn from_marker(marker: u8) -> Option<ValueType> {
        match marker {
            0x00 => Some(ValueType::Null),
            0x12 => Some(ValueType::Bytes),
            0x13 => Some(ValueType::String),
            0x20 => Some(ValueType::Uint64),
            0x21 => Some(ValueType::Int64),
            0x22 => Some(ValueType::Float64),
            _ => None,
        }
    }

    pub fn marker(self) -> u8 {
        self as u8
    }
}

/// A single typed field of a tuple
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Int64(i64),
    Uint64(u64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl FieldValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            FieldValue::Null => ValueType::Null,
            FieldValue::Int64(_) => ValueType::Int64,
            FieldValue::Uint64(_) => ValueType::Uint64,
            FieldValue::Float64(_) => ValueType::Float64,
            FieldValue::String(_) => ValueType::String,
            FieldValue::Bytes(_) => ValueType::Bytes,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::Uint64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Uint64(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int64(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float64(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        FieldValue::Bytes(v)
    }
}

impl From<&[u8]> for FieldValue {
    fn from(v: &[u8]) -> Self {
        FieldValue::Bytes(v.to_vec())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "NULL"),
            FieldValue::Int64(v) => write!(f, "{}", v),
            FieldValue::Uint64(v) => write!(f, "{}", v),
            FieldValue::Float64(v) => write!(f, "{}", v),
            FieldValue::String(s) => write!(f, "{:?}", s),
            FieldValue::Bytes(b) => {
                let hex: String = b.iter().map(|x| format!("{:02x}", x)).collect();
                write!(f, "0x{}", hex)
            }
        }
    }
}

/// A field decoded from a key or value, with the number of bytes it
/// occupied
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedItem {
    pub value: FieldValue,
    pub bytes_read: usize,
}

impl DecodedItem {
    pub fn new(value: FieldValue, bytes_read: usize) -> Self {
        Self { value, bytes_read }
    }

    pub fn value_type(&self) -> ValueType {
        self.value.value_type()
    }

    pub fn is_value_type(&self, vt: ValueType) -> bool {
        self.value_type() == vt
    }
}
