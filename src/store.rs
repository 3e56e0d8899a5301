//! Store Module
//!
//! The shared handle every structure operates through.
//!
//! ## Responsibilities
//! - Open/create the backing file and validate its superblock
//! - Typed record reads and writes at an address
//! - Record allocation through the block directory
//! - Per-address locks, scratch buffers and the block header cache
//!
//! ## File Format
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │ Superblock (64 bytes reserved)                 │
//! │ ┌──────────┬──────────┬────────────┬────────┐  │
//! │ │Magic (4) │Version(2)│BlockSize(4)│CRC (4) │  │
//! │ └──────────┴──────────┴────────────┴────────┘  │
//! ├────────────────────────────────────────────────┤
//! │ Block 0  (block_size bytes)                    │
//! ├────────────────────────────────────────────────┤
//! │ Block 1                                        │
//! │ ...                                            │
//! └────────────────────────────────────────────────┘
//! ```
//! Address 0 is the superblock, so 0 doubles as the null record address.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::block::{BlockDirectory, TypeDirectory};
use crate::cache::{ByteArrayCache, BytesCache, CachedBytes};
use crate::codec::Value;
use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::hash;
use crate::io::FilePool;
use crate::lock::{AddressLockPool, AddressReadGuard, AddressWriteGuard};

/// Magic bytes identifying a SlotDB file
pub const MAGIC: &[u8; 4] = b"SLDB";

/// Current file format version
pub const VERSION: u16 = 1;

/// Bytes reserved for the superblock at offset 0
pub const SUPERBLOCK_SIZE: usize = 64;

/// Fixed header at the start of the file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Superblock {
    pub magic: [u8; 4],
    pub version: u16,
    pub block_size: u32,
}

impl Superblock {
    pub fn new(block_size: usize) -> Self {
        Self {
            magic: *MAGIC,
            version: VERSION,
            block_size: block_size as u32,
        }
    }

    /// Encode into the reserved region: bincode body followed by its CRC32
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(self)?;
        let crc = crc32fast::hash(&body);

        let mut buf = vec![0u8; SUPERBLOCK_SIZE];
        buf[..body.len()].copy_from_slice(&body);
        buf[body.len()..body.len() + 4].copy_from_slice(&crc.to_le_bytes());
        Ok(buf)
    }

    /// Decode and validate the reserved region
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let superblock: Superblock = bincode::deserialize(buf)?;
        let body_len = bincode::serialized_size(&superblock)? as usize;

        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(&buf[body_len..body_len + 4]);
        let stored = u32::from_le_bytes(crc_bytes);
        let actual = crc32fast::hash(&buf[..body_len]);

        if &superblock.magic != MAGIC {
            return Err(StoreError::Corruption(format!(
                "Invalid superblock magic: expected SLDB, got {:?}",
                superblock.magic
            )));
        }
        if stored != actual {
            return Err(StoreError::Corruption(format!(
                "Superblock checksum mismatch: stored {:08x}, computed {:08x}",
                stored, actual
            )));
        }
        if superblock.version != VERSION {
            return Err(StoreError::Corruption(format!(
                "Unsupported file version: {}",
                superblock.version
            )));
        }
        Ok(superblock)
    }
}

/// The storage engine handle
///
/// ## Concurrency Model:
/// - No global lock: every shared location is guarded by the lock pool,
///   keyed by its address
/// - Per-key critical sections (interning, lazy per-key creation) use a
///   second pool keyed by structure address and key hash
/// - File I/O rotates over independent handles
/// - Always used behind an `Arc`; all methods take `&self`
pub struct Store {
    config: Config,
    files: Arc<FilePool>,
    locks: AddressLockPool,
    key_locks: AddressLockPool,
    buffers: BytesCache,
    headers: ByteArrayCache,
    directory: Box<dyn BlockDirectory>,
}

impl Store {
    /// Open or create a store with the default in-memory directory
    ///
    /// A reopened file starts carving new blocks after its current end;
    /// existing blocks are reachable again through
    /// `TypeDirectory::register_block` on a custom directory.
    pub async fn open(config: Config) -> Result<Arc<Self>> {
        let files = Self::open_files(&config).await?;
        let first_block = Self::first_free_block(&config, &files).await?;
        let directory = TypeDirectory::new(config.block_size, first_block);
        Ok(Arc::new(Self::assemble(config, files, Box::new(directory))))
    }

    /// Open or create a store that allocates through `directory`
    pub async fn open_with_directory(
        config: Config,
        directory: Box<dyn BlockDirectory>,
    ) -> Result<Arc<Self>> {
        let files = Self::open_files(&config).await?;
        Ok(Arc::new(Self::assemble(config, files, directory)))
    }

    /// Address of the first block slot past the current end of `config`'s file
    ///
    /// Useful for building a custom directory over a reopened file.
    pub async fn first_free_block(config: &Config, files: &FilePool) -> Result<i64> {
        let len = files.file_len().await? as i64;
        let base = SUPERBLOCK_SIZE as i64;
        let block = config.block_size as i64;
        if len <= base {
            return Ok(base);
        }
        Ok(base + (len - base + block - 1) / block * block)
    }

    // =========================================================================
    // Typed Record Access
    // =========================================================================

    /// Read the record at `address`
    pub async fn read_value<T: Value>(&self, address: i64) -> Result<T> {
        Self::check_address(address)?;
        let mut buf = self.buffers.checkout(T::SIZE).await;
        self.files.read(address, &mut buf).await?;
        Ok(T::decode(&buf))
    }

    /// Overwrite the record at `address`
    pub async fn write_value<T: Value>(&self, address: i64, value: &T) -> Result<()> {
        Self::check_address(address)?;
        let mut buf = self.buffers.checkout(T::SIZE).await;
        value.encode(&mut buf);
        self.files.write(address, &buf).await
    }

    /// Allocate a record slot sized for `T` (contents are stale)
    pub async fn allocate<T: Value>(&self) -> Result<i64> {
        self.directory
            .allocate_record(self, std::any::type_name::<T>(), T::SIZE)
            .await
    }

    /// Allocate a record and write `value` into it before returning
    pub async fn allocate_value<T: Value>(&self, value: &T) -> Result<i64> {
        let address = self.allocate::<T>().await?;
        self.write_value(address, value).await?;
        Ok(address)
    }

    /// Release the record at `address`; returns whether it was allocated
    pub async fn free(&self, address: i64) -> Result<bool> {
        self.directory.free_record(self, address).await
    }

    // =========================================================================
    // Locking
    // =========================================================================

    pub async fn begin_read(&self, address: i64) -> AddressReadGuard {
        self.locks.begin_read(address).await
    }

    pub async fn begin_write(&self, address: i64) -> AddressWriteGuard {
        self.locks.begin_write(address).await
    }

    /// Serialize work on one key of the structure at `scope`
    ///
    /// Key locks live in their own pool, so holding one never blocks an
    /// address lock with the same numeric value.
    pub async fn begin_key_write(&self, scope: i64, hash: u64) -> AddressWriteGuard {
        self.key_locks
            .begin_write(hash::scoped_key(scope, hash))
            .await
    }

    // =========================================================================
    // Durability
    // =========================================================================

    /// Write every cached block header through and fsync the file
    pub async fn sync(&self) -> Result<()> {
        for address in self.headers.addresses() {
            if let Some(slot) = self.headers.get(address) {
                let header = slot.lock().await;
                if !header.is_first() {
                    self.files.write(address, header.bytes()).await?;
                }
            }
        }
        self.files.sync().await
    }

    /// Write a cached header back without waiting for the write
    ///
    /// The backing write runs as a detached task. It holds the slot's lock
    /// while writing, so whichever task writes last writes the newest
    /// contents. A failure is only reported to the log.
    pub(crate) fn write_behind(&self, slot: Arc<CachedBytes>) {
        let files = Arc::clone(&self.files);
        tokio::spawn(async move {
            let header = slot.lock().await;
            if let Err(e) = files.write(slot.address(), header.bytes()).await {
                tracing::error!(address = slot.address(), error = %e, "header write-behind failed");
            }
        });
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn files(&self) -> &FilePool {
        &self.files
    }

    pub fn locks(&self) -> &AddressLockPool {
        &self.locks
    }

    pub fn buffers(&self) -> &BytesCache {
        &self.buffers
    }

    pub fn headers(&self) -> &ByteArrayCache {
        &self.headers
    }

    pub fn directory(&self) -> &dyn BlockDirectory {
        self.directory.as_ref()
    }

    pub async fn file_len(&self) -> Result<u64> {
        self.files.file_len().await
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    async fn open_files(config: &Config) -> Result<FilePool> {
        config.validate()?;
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let files = FilePool::open(&config.path, config.file_handles, config.truncate).await?;

        if files.file_len().await? == 0 {
            let superblock = Superblock::new(config.block_size);
            files.write(0, &superblock.encode()?).await?;
            tracing::info!(path = %config.path.display(), block_size = config.block_size, "store created");
        } else {
            let mut buf = vec![0u8; SUPERBLOCK_SIZE];
            files.read(0, &mut buf).await?;
            let superblock = Superblock::decode(&buf)?;
            if superblock.block_size as usize != config.block_size {
                return Err(StoreError::Config(format!(
                    "file uses block_size {}, config asks for {}",
                    superblock.block_size, config.block_size
                )));
            }
            tracing::info!(path = %config.path.display(), "store opened");
        }

        Ok(files)
    }

    fn assemble(config: Config, files: FilePool, directory: Box<dyn BlockDirectory>) -> Self {
        Self {
            locks: AddressLockPool::new(config.lock_pool_free_limit),
            key_locks: AddressLockPool::new(config.lock_pool_free_limit),
            buffers: BytesCache::new(
                config.buffer_unit,
                config.buffer_buckets,
                config.buffers_per_bucket,
            ),
            headers: ByteArrayCache::new(),
            files: Arc::new(files),
            directory,
            config,
        }
    }

    fn check_address(address: i64) -> Result<()> {
        if address < SUPERBLOCK_SIZE as i64 {
            return Err(StoreError::InvalidAddress {
                address,
                reason: "inside the superblock or null".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_superblock_round_trip() {
        let sb = Superblock::new(4096);
        let buf = sb.encode().unwrap();
        assert_eq!(buf.len(), SUPERBLOCK_SIZE);
        assert_eq!(Superblock::decode(&buf).unwrap(), sb);
    }

    #[test]
    fn test_superblock_detects_corruption() {
        let mut buf = Superblock::new(4096).encode().unwrap();
        buf[6] ^= 0xFF; // inside block_size

        let result = Superblock::decode(&buf);
        assert!(matches!(result, Err(StoreError::Corruption(_))));
    }

    #[test]
    fn test_superblock_rejects_bad_magic() {
        let mut buf = Superblock::new(4096).encode().unwrap();
        buf[0] = b'X';

        let result = Superblock::decode(&buf);
        assert!(matches!(result, Err(StoreError::Corruption(_))));
    }
}
