//! Run-time typed dictionary
//!
//! Picks the concrete `Dictionary<K>` from a `FieldType` and accepts keys as
//! `ScalarValue`. A key of the wrong kind is an error, never a coercion.

use crate::codec::{FieldType, Guid, InterfaceRecord, ScalarValue, StringRef};
use crate::error::{Result, StoreError};
use crate::store::Store;

use super::map::Dictionary;

/// A dictionary whose key type is chosen at run time
#[derive(Debug, Clone, Copy)]
pub enum FieldIndex {
    Int32(Dictionary<i32>),
    Int64(Dictionary<i64>),
    UInt64(Dictionary<u64>),
    Float64(Dictionary<f64>),
    Guid(Dictionary<Guid>),
    String(Dictionary<StringRef>),
}

/// Run `$body` with `$dict` bound to the typed dictionary and `$key` to the
/// matching typed key, or fail with a field type mismatch
macro_rules! with_key {
    ($index:expr, $value:expr, |$dict:ident, $key:ident| $body:expr) => {
        match ($index, $value) {
            (FieldIndex::Int32($dict), ScalarValue::Int32($key)) => $body,
            (FieldIndex::Int64($dict), ScalarValue::Int64($key)) => $body,
            (FieldIndex::UInt64($dict), ScalarValue::UInt64($key)) => $body,
            (FieldIndex::Float64($dict), ScalarValue::Float64($key)) => $body,
            (FieldIndex::Guid($dict), ScalarValue::Guid($key)) => $body,
            (FieldIndex::String($dict), ScalarValue::String($key)) => $body,
            (index, value) => Err(StoreError::FieldTypeMismatch {
                expected: index.field_type(),
                actual: value.field_type(),
            }),
        }
    };
}

/// Run `$body` with `$dict` bound to the typed dictionary, whatever its type
macro_rules! with_dictionary {
    ($index:expr, |$dict:ident| $body:expr) => {
        match $index {
            FieldIndex::Int32($dict) => $body,
            FieldIndex::Int64($dict) => $body,
            FieldIndex::UInt64($dict) => $body,
            FieldIndex::Float64($dict) => $body,
            FieldIndex::Guid($dict) => $body,
            FieldIndex::String($dict) => $body,
        }
    };
}

impl FieldIndex {
    /// Create an empty index keyed by `field_type`
    pub async fn create(store: &Store, field_type: FieldType) -> Result<Self> {
        Ok(match field_type {
            FieldType::Int32 => FieldIndex::Int32(Dictionary::create(store).await?),
            FieldType::Int64 => FieldIndex::Int64(Dictionary::create(store).await?),
            FieldType::UInt64 => FieldIndex::UInt64(Dictionary::create(store).await?),
            FieldType::Float64 => FieldIndex::Float64(Dictionary::create(store).await?),
            FieldType::Guid => FieldIndex::Guid(Dictionary::create(store).await?),
            FieldType::String => FieldIndex::String(Dictionary::create(store).await?),
        })
    }

    pub fn open(field_type: FieldType, address: i64) -> Self {
        match field_type {
            FieldType::Int32 => FieldIndex::Int32(Dictionary::open(address)),
            FieldType::Int64 => FieldIndex::Int64(Dictionary::open(address)),
            FieldType::UInt64 => FieldIndex::UInt64(Dictionary::open(address)),
            FieldType::Float64 => FieldIndex::Float64(Dictionary::open(address)),
            FieldType::Guid => FieldIndex::Guid(Dictionary::open(address)),
            FieldType::String => FieldIndex::String(Dictionary::open(address)),
        }
    }

    /// Re-open an index from its stored typed pointer
    pub fn from_interface(record: &InterfaceRecord) -> Result<Self> {
        let field_type = record.kind().ok_or_else(|| {
            StoreError::Corruption(format!(
                "unknown field type code {} for index at {}",
                record.field_type, record.address
            ))
        })?;
        Ok(Self::open(field_type, record.address))
    }

    /// Typed pointer to this index, for storing in another record
    pub fn to_interface(&self) -> InterfaceRecord {
        InterfaceRecord::new(self.field_type(), self.address())
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            FieldIndex::Int32(_) => FieldType::Int32,
            FieldIndex::Int64(_) => FieldType::Int64,
            FieldIndex::UInt64(_) => FieldType::UInt64,
            FieldIndex::Float64(_) => FieldType::Float64,
            FieldIndex::Guid(_) => FieldType::Guid,
            FieldIndex::String(_) => FieldType::String,
        }
    }

    pub fn address(&self) -> i64 {
        with_dictionary!(self, |dict| dict.address())
    }

    pub async fn set(&self, store: &Store, key: &ScalarValue, value: i64) -> Result<()> {
        with_key!(self, key, |dict, key| dict.set(store, key, value).await)
    }

    pub async fn get(&self, store: &Store, key: &ScalarValue) -> Result<Option<i64>> {
        with_key!(self, key, |dict, key| dict.get(store, key).await)
    }

    pub async fn contains_key(&self, store: &Store, key: &ScalarValue) -> Result<bool> {
        with_key!(self, key, |dict, key| dict.contains_key(store, key).await)
    }

    pub async fn remove_key(&self, store: &Store, key: &ScalarValue) -> Result<Option<i64>> {
        with_key!(self, key, |dict, key| dict.remove_key(store, key).await)
    }

    /// Every key/value pair, keys lifted back to `ScalarValue`
    pub async fn entries(&self, store: &Store) -> Result<Vec<(ScalarValue, i64)>> {
        with_dictionary!(self, |dict| Ok(dict
            .entries(store)
            .await?
            .into_iter()
            .map(|(key, value)| (ScalarValue::from(key), value))
            .collect()))
    }

    pub async fn len(&self, store: &Store) -> Result<usize> {
        with_dictionary!(self, |dict| dict.len(store).await)
    }

    pub async fn is_empty(&self, store: &Store) -> Result<bool> {
        Ok(self.len(store).await? == 0)
    }

    pub async fn destroy(self, store: &Store) -> Result<()> {
        with_dictionary!(self, |dict| dict.destroy(store).await)
    }
}
