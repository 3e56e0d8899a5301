//! # SlotDB
//!
//! An embedded, file-backed record store with:
//! - Bitmap-allocated fixed-size records inside fixed-size blocks
//! - A 64-way hash trie with overflow arrays for full-hash collisions
//! - Typed dictionaries, key → list and key → set collections
//! - Reference-counted string interning
//! - Per-address reader/writer locking instead of a global lock
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │   Dictionary / DictionaryArray / DictionaryHashSet          │
//! │   FieldIndex            StringHashSet                       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────┐
//!   │  HashTable  │─────────►│ArrayProcessor│
//!   │ (64-way)    │ overflow │ (32 / node)  │
//!   └──────┬──────┘          └──────┬───────┘
//!          └────────────┬───────────┘
//!                       ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Store: superblock, typed record I/O, allocation, locks      │
//! └──────┬──────────────┬───────────────┬───────────────┬───────┘
//!        ▼              ▼               ▼               ▼
//!  BlockDirectory  AddressLockPool  BytesCache /     FilePool
//!  + bitmap blocks                  ByteArrayCache   (N handles)
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod array;
pub mod block;
pub mod cache;
pub mod codec;
pub mod dictionary;
pub mod hash;
pub mod io;
pub mod lock;
pub mod store;
pub mod strings;
pub mod table;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use array::ArrayProcessor;
pub use codec::{FieldType, Guid, Key, ScalarValue, StringRef, Value};
pub use config::Config;
pub use dictionary::{Dictionary, DictionaryArray, DictionaryHashSet, FieldIndex};
pub use error::{Result, StoreError};
pub use store::Store;
pub use strings::StringHashSet;
pub use table::{HashTable, Matcher};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of SlotDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
