//! Strings Module
//!
//! Interned, reference-counted variable-length strings.
//!
//! ## Chunk Chain
//! ```text
//!  first chunk                         next chunk
//! ┌────────┬──────────┬──────────┬────┐  ┌───┬───┬──────────┬────┐
//! │len = n │ refcount │ 256 bytes│next┼─►│ 0 │ 0 │ 256 bytes│ 0  │
//! └────────┴──────────┴──────────┴────┘  └───┴───┴──────────┴────┘
//! ```
//! The string is the first `n` bytes of the concatenated chunk payloads.

mod hash_set;

pub use hash_set::{read_string, StringHashSet};
