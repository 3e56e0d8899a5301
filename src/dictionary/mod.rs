//! Dictionary Module
//!
//! Typed maps built on the hash table and array records.
//!
//! ## Responsibilities
//! - `Dictionary<K>`: key → `i64`, one `KeyValueRecord<K>` per key
//! - `DictionaryArray<K, V>`: key → list of `V` (array record chain)
//! - `DictionaryHashSet<K, V>`: key → set of `V` (nested hash table)
//! - `FieldIndex`: a `Dictionary` whose key type is picked at run time
//!
//! ## Shape
//! ```text
//!  HashTable<i64>              KeyValueRecord<K>        per-key collection
//! ┌──────────────────┐        ┌─────────┬─────────┐    ┌──────────────────┐
//! │ hash(k) → addr ──┼───────►│ key  k  │ value ──┼───►│ ArrayRecord<V> / │
//! └──────────────────┘        └─────────┴─────────┘    │ HashTable<V>     │
//!                                                      └──────────────────┘
//! ```
//! For a plain `Dictionary` the value is the user's `i64` itself.

mod array;
mod field_index;
mod hash_set;
mod map;

pub use array::DictionaryArray;
pub use field_index::FieldIndex;
pub use hash_set::DictionaryHashSet;
pub use map::Dictionary;
