//! Byte buffer pool
//!
//! Power-of-two bucketed scratch buffers with async checkout.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use crossbeam::queue::ArrayQueue;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// One size class of the pool
struct Bucket {
    /// Capacity of every buffer in this bucket
    buffer_size: usize,
    /// Idle buffers (lock-free)
    idle: ArrayQueue<BytesMut>,
    /// Limits how many buffers may be checked out at once
    permits: Arc<Semaphore>,
}

/// Pool of reusable scratch buffers
///
/// ## Concurrency:
/// - Checkout waits asynchronously on the bucket's semaphore when the
///   bucket is exhausted; it never blocks a worker thread
/// - Idle buffers sit in a lock-free queue
pub struct BytesCache {
    buckets: Vec<Arc<Bucket>>,
    /// Checkouts served from an idle buffer
    reuses: AtomicU64,
    /// Checkouts that had to allocate
    allocations: AtomicU64,
}

impl BytesCache {
    /// Create a pool with `bucket_count` buckets of `unit * 2^n` bytes,
    /// each allowing `per_bucket` outstanding buffers
    pub fn new(unit: usize, bucket_count: usize, per_bucket: usize) -> Self {
        let buckets = (0..bucket_count)
            .map(|n| {
                Arc::new(Bucket {
                    buffer_size: unit << n,
                    idle: ArrayQueue::new(per_bucket),
                    permits: Arc::new(Semaphore::new(per_bucket)),
                })
            })
            .collect();

        Self {
            buckets,
            reuses: AtomicU64::new(0),
            allocations: AtomicU64::new(0),
        }
    }

    /// Round a requested length up to its bucket size
    ///
    /// Returns `None` when the length is larger than the biggest bucket.
    pub fn rounded_size(&self, len: usize) -> Option<usize> {
        self.bucket_index(len).map(|i| self.buckets[i].buffer_size)
    }

    fn bucket_index(&self, len: usize) -> Option<usize> {
        self.buckets.iter().position(|b| b.buffer_size >= len)
    }

    /// Check out a zeroed buffer of exactly `len` visible bytes
    ///
    /// The buffer returns to its bucket when the `PooledBuffer` drops.
    pub async fn checkout(&self, len: usize) -> PooledBuffer {
        let Some(index) = self.bucket_index(len) else {
            self.allocations.fetch_add(1, Ordering::Relaxed);
            return PooledBuffer {
                buffer: BytesMut::zeroed(len),
                home: None,
            };
        };

        let bucket = Arc::clone(&self.buckets[index]);
        // The semaphore is never closed, so acquisition cannot fail.
        let permit = Arc::clone(&bucket.permits).acquire_owned().await.ok();

        let mut buffer = match bucket.idle.pop() {
            Some(buffer) => {
                self.reuses.fetch_add(1, Ordering::Relaxed);
                buffer
            }
            None => {
                self.allocations.fetch_add(1, Ordering::Relaxed);
                BytesMut::with_capacity(bucket.buffer_size)
            }
        };
        buffer.clear();
        buffer.resize(len, 0);

        PooledBuffer {
            buffer,
            home: Some((bucket, permit)),
        }
    }

    /// Number of checkouts served by reusing an idle buffer
    pub fn reuse_count(&self) -> u64 {
        self.reuses.load(Ordering::Relaxed)
    }

    /// Number of checkouts that allocated a new buffer
    pub fn allocation_count(&self) -> u64 {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Permits currently available in the bucket serving `len`
    pub fn available_permits(&self, len: usize) -> Option<usize> {
        self.bucket_index(len)
            .map(|i| self.buckets[i].permits.available_permits())
    }
}

/// A checked-out buffer; derefs to exactly the requested length
pub struct PooledBuffer {
    buffer: BytesMut,
    home: Option<(Arc<Bucket>, Option<OwnedSemaphorePermit>)>,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some((bucket, permit)) = self.home.take() {
            let buffer = std::mem::take(&mut self.buffer);
            // A full queue just lets the buffer go
            let _ = bucket.idle.push(buffer);
            drop(permit);
        }
    }
}
