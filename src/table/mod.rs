//! Table Module
//!
//! Hash-indexed storage of fixed-size values.
//!
//! ## Trie Shape
//! ```text
//! entry record (64 nodes)       idx = hash
//! ┌────┬────┬────┬─────┬────┐   node = entry[idx % 64], idx /= 64
//! │ n0 │ n1 │ .. │ n37 │ .. │
//! └────┴────┴────┴──┬──┴────┘
//!                   │ next (idx != 0)
//!                   ▼
//!            ┌────┬────┬─────┐   node = child[idx % 64], idx /= 64
//!            │ .. │ .. │ n12 │ ...
//!            └────┴────┴──┬──┘
//!                         │ array (idx == 0)
//!                         ▼
//!                  overflow ArrayRecord<HashEntry<T>>
//! ```

mod hash_table;
mod matcher;

pub use hash_table::HashTable;
pub use matcher::{FnMatcher, KeyMatcher, Matcher, ValueMatcher};
