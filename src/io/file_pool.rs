//! Rotating file handle pool

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::{Result, StoreError};

/// Pool of file handles over one path
///
/// ## Concurrency:
/// - Each handle sits behind its own async mutex (seek + read/write must
///   not interleave on one cursor)
/// - `next` picks handles round-robin, lock-free
/// - `grow` serializes length checks with `set_len`, so concurrent growth
///   never truncates a region another caller already extended
pub struct FilePool {
    path: PathBuf,
    handles: Vec<Mutex<File>>,
    next: AtomicUsize,
    grow: Mutex<()>,
}

impl FilePool {
    /// Open `count` independent handles, creating the file if needed
    pub async fn open(path: &Path, count: usize, truncate: bool) -> Result<Self> {
        let mut handles = Vec::with_capacity(count);

        for i in 0..count {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                // Only the first handle may truncate, later ones see the result
                .truncate(truncate && i == 0)
                .open(path)
                .await?;
            handles.push(Mutex::new(file));
        }

        Ok(Self {
            path: path.to_path_buf(),
            handles,
            next: AtomicUsize::new(0),
            grow: Mutex::new(()),
        })
    }

    /// Fill `buf` from `address`
    pub async fn read(&self, address: i64, buf: &mut [u8]) -> Result<()> {
        let offset = Self::offset(address)?;
        let mut file = self.pick().lock().await;
        file.seek(SeekFrom::Start(offset)).await?;
        file.read_exact(buf).await?;
        Ok(())
    }

    /// Write all of `buf` at `address`
    pub async fn write(&self, address: i64, buf: &[u8]) -> Result<()> {
        let offset = Self::offset(address)?;
        let mut file = self.pick().lock().await;
        file.seek(SeekFrom::Start(offset)).await?;
        file.write_all(buf).await?;
        file.flush().await?;
        Ok(())
    }

    /// Current file length in bytes
    pub async fn file_len(&self) -> Result<u64> {
        let file = self.pick().lock().await;
        Ok(file.metadata().await?.len())
    }

    /// Grow the file to at least `len` bytes (never shrinks)
    pub async fn ensure_len(&self, len: u64) -> Result<()> {
        let _grow = self.grow.lock().await;
        let file = self.pick().lock().await;
        if file.metadata().await?.len() < len {
            file.set_len(len).await?;
        }
        Ok(())
    }

    /// Flush file contents and metadata to disk
    pub async fn sync(&self) -> Result<()> {
        let file = self.pick().lock().await;
        file.sync_all().await?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn pick(&self) -> &Mutex<File> {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.handles.len();
        &self.handles[i]
    }

    fn offset(address: i64) -> Result<u64> {
        u64::try_from(address).map_err(|_| StoreError::InvalidAddress {
            address,
            reason: "negative file offset".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read_through_other_handle() {
        let dir = TempDir::new().unwrap();
        let pool = FilePool::open(&dir.path().join("data"), 3, true)
            .await
            .unwrap();

        pool.ensure_len(1024).await.unwrap();
        pool.write(100, b"hello").await.unwrap();

        // Rotation guarantees consecutive calls use different handles
        let mut buf = [0u8; 5];
        pool.read(100, &mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
        pool.read(100, &mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[tokio::test]
    async fn test_negative_address_is_rejected() {
        let dir = TempDir::new().unwrap();
        let pool = FilePool::open(&dir.path().join("data"), 1, true)
            .await
            .unwrap();

        let mut buf = [0u8; 1];
        let result = pool.read(-8, &mut buf).await;
        assert!(matches!(result, Err(StoreError::InvalidAddress { .. })));
    }

    #[tokio::test]
    async fn test_ensure_len_never_shrinks() {
        let dir = TempDir::new().unwrap();
        let pool = FilePool::open(&dir.path().join("data"), 2, true)
            .await
            .unwrap();

        pool.ensure_len(4096).await.unwrap();
        pool.ensure_len(10).await.unwrap();
        assert_eq!(pool.file_len().await.unwrap(), 4096);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_growth_keeps_the_largest_length() {
        let dir = TempDir::new().unwrap();
        let pool = std::sync::Arc::new(
            FilePool::open(&dir.path().join("data"), 4, true)
                .await
                .unwrap(),
        );

        let mut handles = Vec::new();
        for task in 0..8u64 {
            let pool = std::sync::Arc::clone(&pool);
            handles.push(tokio::spawn(async move {
                for step in 1..=50u64 {
                    pool.ensure_len((step * 8 + task) * 64).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(pool.file_len().await.unwrap(), (50 * 8 + 7) * 64);
    }
}
