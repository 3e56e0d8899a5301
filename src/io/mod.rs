//! I/O Module
//!
//! Positional async reads and writes over one shared file.
//!
//! ## Responsibilities
//! - Open the backing file several times so each handle has its own cursor
//! - Rotate requests across handles so independent operations overlap
//! - Translate signed addresses into file offsets

mod file_pool;

pub use file_pool::FilePool;
