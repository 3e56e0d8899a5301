//! Header cache
//!
//! One resident byte array per base address. Block headers are read once,
//! mutated in memory, and written back from the cached copy.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

use crate::error::{Result, StoreError};

/// Cached bytes for one address plus whether they were loaded yet
struct CachedState {
    loaded: bool,
    bytes: Vec<u8>,
}

/// A resident buffer for one base address
pub struct CachedBytes {
    address: i64,
    len: usize,
    state: AsyncMutex<CachedState>,
}

impl CachedBytes {
    /// Base address this buffer mirrors
    pub fn address(&self) -> i64 {
        self.address
    }

    /// Fixed length of the buffer
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Lock the buffer for reading or mutation
    pub async fn lock(&self) -> CacheGuard<'_> {
        CacheGuard {
            state: self.state.lock().await,
        }
    }
}

/// Locked view over a cached buffer
pub struct CacheGuard<'a> {
    state: MutexGuard<'a, CachedState>,
}

impl CacheGuard<'_> {
    /// True until the caller populates the slot from storage
    pub fn is_first(&self) -> bool {
        !self.state.loaded
    }

    /// Record that the slot now mirrors storage
    pub fn mark_loaded(&mut self) {
        self.state.loaded = true;
    }

    pub fn bytes(&self) -> &[u8] {
        &self.state.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.state.bytes
    }
}

/// Address-keyed cache of resident byte arrays
#[derive(Default)]
pub struct ByteArrayCache {
    slots: Mutex<HashMap<i64, Arc<CachedBytes>>>,
}

impl ByteArrayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the slot for `address`, creating an unloaded one if absent
    ///
    /// An existing slot with a different length is an invariant violation.
    pub fn get_or_create(&self, address: i64, len: usize) -> Result<Arc<CachedBytes>> {
        let mut slots = self.slots.lock();
        let slot = slots.entry(address).or_insert_with(|| {
            Arc::new(CachedBytes {
                address,
                len,
                state: AsyncMutex::new(CachedState {
                    loaded: false,
                    bytes: vec![0u8; len],
                }),
            })
        });

        if slot.len != len {
            return Err(StoreError::SizeMismatch {
                address,
                expected: slot.len,
                actual: len,
            });
        }

        Ok(Arc::clone(slot))
    }

    /// Install already-known contents for `address` (e.g. a fresh block)
    pub fn insert_loaded(&self, address: i64, bytes: Vec<u8>) -> Arc<CachedBytes> {
        let slot = Arc::new(CachedBytes {
            address,
            len: bytes.len(),
            state: AsyncMutex::new(CachedState {
                loaded: true,
                bytes,
            }),
        });
        self.slots.lock().insert(address, Arc::clone(&slot));
        slot
    }

    /// Look up an existing slot
    pub fn get(&self, address: i64) -> Option<Arc<CachedBytes>> {
        self.slots.lock().get(&address).cloned()
    }

    /// Every cached address, in no particular order
    pub fn addresses(&self) -> Vec<i64> {
        self.slots.lock().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}
