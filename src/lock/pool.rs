//! Address lock pool
//!
//! Lazily created, reference-counted async reader/writer locks keyed by
//! file offset.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

type AddressLock = Arc<RwLock<()>>;

/// One live lock and the number of callers holding or waiting on it
struct LockSlot {
    refs: usize,
    lock: AddressLock,
}

struct PoolInner {
    /// Live locks, keyed by address
    slots: Mutex<HashMap<i64, LockSlot>>,
    /// Idle locks waiting to be reused
    free: Mutex<Vec<AddressLock>>,
    free_limit: usize,
}

/// Pool of per-address reader/writer locks
///
/// ## Concurrency:
/// - `slots`/`free`: parking_lot mutexes, never held across an await
/// - The returned guards hold the tokio lock and a reference on the slot
#[derive(Clone)]
pub struct AddressLockPool {
    inner: Arc<PoolInner>,
}

impl AddressLockPool {
    /// Create a pool keeping at most `free_limit` idle locks
    pub fn new(free_limit: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                slots: Mutex::new(HashMap::new()),
                free: Mutex::new(Vec::new()),
                free_limit,
            }),
        }
    }

    /// Acquire shared access to `address`
    pub async fn begin_read(&self, address: i64) -> AddressReadGuard {
        let reference = SlotReference::acquire(&self.inner, address);
        let guard = Arc::clone(&reference.lock).read_owned().await;
        AddressReadGuard {
            _guard: guard,
            _reference: reference,
        }
    }

    /// Acquire exclusive access to `address`
    pub async fn begin_write(&self, address: i64) -> AddressWriteGuard {
        let reference = SlotReference::acquire(&self.inner, address);
        let guard = Arc::clone(&reference.lock).write_owned().await;
        AddressWriteGuard {
            _guard: guard,
            _reference: reference,
        }
    }

    /// Number of addresses with a live lock
    pub fn active_count(&self) -> usize {
        self.inner.slots.lock().len()
    }

    /// Number of idle locks ready for reuse
    pub fn free_count(&self) -> usize {
        self.inner.free.lock().len()
    }
}

impl Default for AddressLockPool {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// A counted reference on one slot; dropping it releases the reference
struct SlotReference {
    pool: Arc<PoolInner>,
    address: i64,
    lock: AddressLock,
}

impl SlotReference {
    fn acquire(pool: &Arc<PoolInner>, address: i64) -> Self {
        let mut slots = pool.slots.lock();
        let slot = slots.entry(address).or_insert_with(|| LockSlot {
            refs: 0,
            lock: pool
                .free
                .lock()
                .pop()
                .unwrap_or_else(|| Arc::new(RwLock::new(()))),
        });
        slot.refs += 1;

        Self {
            pool: Arc::clone(pool),
            address,
            lock: Arc::clone(&slot.lock),
        }
    }
}

impl Drop for SlotReference {
    fn drop(&mut self) {
        let mut slots = self.pool.slots.lock();
        let Some(slot) = slots.get_mut(&self.address) else {
            return;
        };

        slot.refs -= 1;
        if slot.refs > 0 {
            return;
        }

        if let Some(slot) = slots.remove(&self.address) {
            drop(slots);
            let mut free = self.pool.free.lock();
            // Our own clone of the lock is still alive here
            if free.len() < self.pool.free_limit && Arc::strong_count(&slot.lock) == 2 {
                free.push(slot.lock);
            }
        }
    }
}

/// Shared access to one address; released on drop
pub struct AddressReadGuard {
    // Field order matters: the tokio guard must drop before the reference.
    _guard: OwnedRwLockReadGuard<()>,
    _reference: SlotReference,
}

/// Exclusive access to one address; released on drop
pub struct AddressWriteGuard {
    _guard: OwnedRwLockWriteGuard<()>,
    _reference: SlotReference,
}
