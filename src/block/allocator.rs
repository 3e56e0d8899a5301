//! Bitmap allocator
//!
//! Record slot allocation inside one block. The header (UsedCount + bitmap)
//! is kept resident in the store's header cache and written back behind
//! every mutation.

use crate::cache::CacheGuard;
use crate::codec::Value;
use crate::error::Result;
use crate::store::Store;

use super::layout::{BlockLayout, USED_COUNT_SIZE};

/// Handle to one block in the store file
///
/// ## Concurrency:
/// - Header mutations hold the block address's write lock
/// - Diagnostics hold its read lock
/// - Unrelated blocks never contend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    layout: BlockLayout,
}

impl Block {
    pub fn new(layout: BlockLayout) -> Self {
        Self { layout }
    }

    /// Lay out a block at `address` (the block itself must already exist)
    pub fn open(address: i64, block_size: usize, record_size: usize) -> Result<Self> {
        Ok(Self::new(BlockLayout::new(address, block_size, record_size)?))
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    pub fn address(&self) -> i64 {
        self.layout.address
    }

    /// Write an all-zero header for a block that was just carved out
    pub async fn format(&self, store: &Store) -> Result<()> {
        let _lock = store.locks().begin_write(self.address()).await;
        let header = vec![0u8; self.layout.header_len()];
        store.files().write(self.address(), &header).await?;
        store.headers().insert_loaded(self.address(), header);
        Ok(())
    }

    /// Claim the first free record slot
    ///
    /// Scans the bitmap byte by byte, lowest bit first. Returns `None` when
    /// the block is full.
    pub async fn allocate_record(&self, store: &Store) -> Result<Option<i64>> {
        let _lock = store.locks().begin_write(self.address()).await;
        let slot = store.headers().get_or_create(self.address(), self.layout.header_len())?;

        let index = {
            let mut header = slot.lock().await;
            self.load(&mut header, store).await?;

            let Some(index) = self.first_unused(header.bytes()) else {
                return Ok(None);
            };
            self.set_bit(&mut header, index, true)?;
            index
        };

        store.write_behind(slot);
        let address = self.layout.record_address(index)?;
        tracing::trace!(block = self.address(), address, "record allocated");
        Ok(Some(address))
    }

    /// Release the record at `address`
    ///
    /// Clears the bit only if it is set, so a double free is harmless.
    /// Returns whether the record was allocated. Record bytes are left as
    /// they are until the slot is reused.
    pub async fn unuse_by_address(&self, store: &Store, address: i64) -> Result<bool> {
        let index = self.layout.index_of(address)?;

        let _lock = store.locks().begin_write(self.address()).await;
        let slot = store.headers().get_or_create(self.address(), self.layout.header_len())?;

        {
            let mut header = slot.lock().await;
            self.load(&mut header, store).await?;

            if !self.bit(header.bytes(), index) {
                return Ok(false);
            }
            self.set_bit(&mut header, index, false)?;
        }

        store.write_behind(slot);
        tracing::trace!(block = self.address(), address, "record released");
        Ok(true)
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// `UsedCount` as stored in the header
    pub async fn get_used_count(&self, store: &Store) -> Result<i32> {
        self.read_header(store, |bytes| i32::decode(&bytes[..USED_COUNT_SIZE]))
            .await
    }

    /// Slot indexes whose bit is set, ascending
    pub async fn get_used_indexes(&self, store: &Store) -> Result<Vec<usize>> {
        self.read_header(store, |bytes| {
            (0..self.layout.record_count)
                .filter(|&i| self.bit(bytes, i))
                .collect()
        })
        .await
    }

    /// Whether at least one slot is free
    pub async fn contains_unused(&self, store: &Store) -> Result<bool> {
        let used = self.get_used_count(store).await?;
        Ok((used as usize) < self.layout.record_count)
    }

    /// Whether the record at `address` is allocated
    pub async fn is_used(&self, store: &Store, address: i64) -> Result<bool> {
        let index = self.layout.index_of(address)?;
        self.read_header(store, |bytes| self.bit(bytes, index)).await
    }

    /// Check that `UsedCount` equals the bitmap's population count
    pub async fn verify(&self, store: &Store) -> Result<()> {
        let (used, popcount) = self
            .read_header(store, |bytes| {
                let used = i32::decode(&bytes[..USED_COUNT_SIZE]);
                let popcount: u32 = bytes[USED_COUNT_SIZE..]
                    .iter()
                    .map(|b| b.count_ones())
                    .sum();
                (used, popcount)
            })
            .await?;

        if used < 0 || used as u32 != popcount {
            return Err(self.layout.violation(format!(
                "UsedCount {} does not match bitmap population {}",
                used, popcount
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    async fn read_header<R>(&self, store: &Store, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        let _lock = store.locks().begin_read(self.address()).await;
        let slot = store.headers().get_or_create(self.address(), self.layout.header_len())?;
        let mut header = slot.lock().await;
        self.load(&mut header, store).await?;
        Ok(f(header.bytes()))
    }

    /// Populate a freshly created cache slot from the file
    async fn load(&self, header: &mut CacheGuard<'_>, store: &Store) -> Result<()> {
        if header.is_first() {
            store.files().read(self.address(), header.bytes_mut()).await?;
            header.mark_loaded();
        }
        Ok(())
    }

    fn first_unused(&self, header: &[u8]) -> Option<usize> {
        let bitmap = &header[USED_COUNT_SIZE..];
        bitmap
            .iter()
            .enumerate()
            .find(|(_, byte)| **byte != 0xFF)
            .map(|(i, byte)| i * 8 + (!*byte).trailing_zeros() as usize)
            .filter(|&index| index < self.layout.record_count)
    }

    fn bit(&self, header: &[u8], index: usize) -> bool {
        header[USED_COUNT_SIZE + index / 8] & (1 << (index % 8)) != 0
    }

    /// Flip one bit and adjust `UsedCount` to match
    fn set_bit(&self, header: &mut CacheGuard<'_>, index: usize, used: bool) -> Result<()> {
        let byte = USED_COUNT_SIZE + index / 8;
        if index >= self.layout.record_count || byte >= header.bytes().len() {
            return Err(self.layout.violation(format!(
                "bit index {} outside bitmap of {} bytes",
                index, self.layout.bitmap_len
            )));
        }

        let bytes = header.bytes_mut();
        let count = i32::decode(&bytes[..USED_COUNT_SIZE]) + if used { 1 } else { -1 };
        if count < 0 || count as usize > self.layout.record_count {
            return Err(self.layout.violation(format!(
                "UsedCount would become {}",
                count
            )));
        }

        let mask = 1u8 << (index % 8);
        if used {
            bytes[byte] |= mask;
        } else {
            bytes[byte] &= !mask;
        }
        count.encode(&mut bytes[..USED_COUNT_SIZE]);
        Ok(())
    }
}
