//! Codec Module
//!
//! Fixed-size binary encodings for everything stored in the file.
//!
//! ## Responsibilities
//! - `Value`: fixed-size, host-endian (de)serialization with an empty state
//! - `Key`: content hash and full equality, possibly dereferencing storage
//! - Record layouts (hash nodes, arrays, strings, key/value pairs)
//! - `FieldType` / `ScalarValue`: run-time selection of a scalar codec
//!
//! ## Record Layouts (packed, host-endian)
//! ```text
//! HashNode<T>      [HashCode u64][Value T][Next i64][Array i64]
//! HashEntry<T>     [HashCode u64][Value T]
//! ArrayRecord<T>   [Length i32][Values T x 32][First i64][Next i64]
//! StringRecord     [Length i32][RefCount i32][Bytes u8 x 256][Next i64]
//! KeyValueRecord<K>[Key K][Value i64]
//! InterfaceRecord  [FieldType i32][Address i64]
//! ```

mod records;
mod scalar;
mod value;

pub use records::{
    ArrayRecord, HashEntry, HashNode, HashRecord, InterfaceRecord, KeyValueRecord, StringRecord,
    ARRAY_CAPACITY, HASH_FANOUT, STRING_CHUNK_SIZE,
};
pub use scalar::{FieldType, ScalarValue};
pub use value::{Guid, Key, StringRef, Value};
