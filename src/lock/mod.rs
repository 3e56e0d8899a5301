//! Lock Module
//!
//! Per-address reader/writer locks.
//!
//! ## Responsibilities
//! - Hand out a reader/writer lock for any file offset on demand
//! - Reference-count live locks and recycle idle ones
//! - Release on every exit path (guards are RAII)
//!
//! ## Contention Model
//! ```text
//!   address 4096 ──► [refs=2, RwLock] ◄── reader, reader
//!   address 8192 ──► [refs=1, RwLock] ◄── writer
//!   (idle)       ──► free list (recycled on next request)
//! ```
//! Distinct addresses never share a lock, so they never contend.

mod pool;

pub use pool::{AddressLockPool, AddressReadGuard, AddressWriteGuard};
