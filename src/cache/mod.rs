//! Cache Module
//!
//! Scratch buffer pools and the block header cache.
//!
//! ## Responsibilities
//! - `BytesCache`: reusable byte buffers bucketed by `unit * 2^n`
//! - `ByteArrayCache`: one resident buffer per base address, used to keep
//!   block headers (UsedCount + bitmap) in memory
//!
//! ## Bucket Table
//! ```text
//!   unit=64:  [64] [128] [256] [512] ... [64 * 2^(buckets-1)]
//!   request 100 bytes  ──► bucket 1 (128 B buffer, 100 B visible)
//!   request > largest  ──► unpooled allocation
//! ```

mod bytes_cache;
mod io_cache;

pub use bytes_cache::{BytesCache, PooledBuffer};
pub use io_cache::{ByteArrayCache, CacheGuard, CachedBytes};
