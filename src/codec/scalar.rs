//! Run-time scalar dispatch
//!
//! `FieldType` names a scalar codec; `ScalarValue` carries one value of any
//! of them. Everything that needs to pick a codec at run time matches on
//! these instead of going through type erasure.

use std::fmt;

use super::value::{Guid, Key, StringRef, Value};
use crate::error::{Result, StoreError};
use crate::store::Store;

/// The closed set of scalar kinds a field can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum FieldType {
    Int32 = 1,
    Int64 = 2,
    UInt64 = 3,
    Float64 = 4,
    Guid = 5,
    String = 6,
}

impl FieldType {
    /// Every field type, in code order
    pub const ALL: [FieldType; 6] = [
        FieldType::Int32,
        FieldType::Int64,
        FieldType::UInt64,
        FieldType::Float64,
        FieldType::Guid,
        FieldType::String,
    ];

    /// Stable on-disk code
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Encoded width of a value of this type
    pub fn size(self) -> usize {
        match self {
            FieldType::Int32 => i32::SIZE,
            FieldType::Int64 => i64::SIZE,
            FieldType::UInt64 => u64::SIZE,
            FieldType::Float64 => f64::SIZE,
            FieldType::Guid => Guid::SIZE,
            FieldType::String => StringRef::SIZE,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A value of any supported scalar kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    Int32(i32),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    Guid(Guid),
    String(StringRef),
}

impl ScalarValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            ScalarValue::Int32(_) => FieldType::Int32,
            ScalarValue::Int64(_) => FieldType::Int64,
            ScalarValue::UInt64(_) => FieldType::UInt64,
            ScalarValue::Float64(_) => FieldType::Float64,
            ScalarValue::Guid(_) => FieldType::Guid,
            ScalarValue::String(_) => FieldType::String,
        }
    }

    /// Encoded bytes, `field_type().size()` long
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ScalarValue::Int32(v) => v.to_bytes(),
            ScalarValue::Int64(v) => v.to_bytes(),
            ScalarValue::UInt64(v) => v.to_bytes(),
            ScalarValue::Float64(v) => v.to_bytes(),
            ScalarValue::Guid(v) => v.to_bytes(),
            ScalarValue::String(v) => v.to_bytes(),
        }
    }

    /// Decode a value of `field_type` from `buf`
    pub fn decode(field_type: FieldType, buf: &[u8]) -> Result<Self> {
        if buf.len() < field_type.size() {
            return Err(StoreError::Serialization(format!(
                "{} needs {} bytes, got {}",
                field_type,
                field_type.size(),
                buf.len()
            )));
        }
        Ok(match field_type {
            FieldType::Int32 => ScalarValue::Int32(i32::decode(buf)),
            FieldType::Int64 => ScalarValue::Int64(i64::decode(buf)),
            FieldType::UInt64 => ScalarValue::UInt64(u64::decode(buf)),
            FieldType::Float64 => ScalarValue::Float64(f64::decode(buf)),
            FieldType::Guid => ScalarValue::Guid(Guid::decode(buf)),
            FieldType::String => ScalarValue::String(StringRef::decode(buf)),
        })
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ScalarValue::Int32(v) => v.is_empty(),
            ScalarValue::Int64(v) => v.is_empty(),
            ScalarValue::UInt64(v) => v.is_empty(),
            ScalarValue::Float64(v) => v.is_empty(),
            ScalarValue::Guid(v) => v.is_empty(),
            ScalarValue::String(v) => v.is_empty(),
        }
    }

    /// Content hash, identical to the typed key's `hash_code`
    pub async fn hash_code(&self, store: &Store) -> Result<u64> {
        match self {
            ScalarValue::Int32(v) => v.hash_code(store).await,
            ScalarValue::Int64(v) => v.hash_code(store).await,
            ScalarValue::UInt64(v) => v.hash_code(store).await,
            ScalarValue::Float64(v) => v.hash_code(store).await,
            ScalarValue::Guid(v) => v.hash_code(store).await,
            ScalarValue::String(v) => v.hash_code(store).await,
        }
    }
}

impl From<i32> for ScalarValue {
    fn from(v: i32) -> Self {
        ScalarValue::Int32(v)
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::Int64(v)
    }
}

impl From<u64> for ScalarValue {
    fn from(v: u64) -> Self {
        ScalarValue::UInt64(v)
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        ScalarValue::Float64(v)
    }
}

impl From<Guid> for ScalarValue {
    fn from(v: Guid) -> Self {
        ScalarValue::Guid(v)
    }
}

impl From<StringRef> for ScalarValue {
    fn from(v: StringRef) -> Self {
        ScalarValue::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_codes_round_trip() {
        for t in FieldType::ALL {
            assert_eq!(FieldType::from_code(t.code()), Some(t));
        }
        assert_eq!(FieldType::from_code(0), None);
        assert_eq!(FieldType::from_code(99), None);
    }

    #[test]
    fn test_decode_dispatches_on_field_type() {
        let value = ScalarValue::from(-42i32);
        let bytes = value.to_bytes();
        assert_eq!(bytes.len(), FieldType::Int32.size());
        assert_eq!(ScalarValue::decode(FieldType::Int32, &bytes).unwrap(), value);

        // Same bytes under a wider type are rejected, not misread
        let result = ScalarValue::decode(FieldType::Int64, &bytes);
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
