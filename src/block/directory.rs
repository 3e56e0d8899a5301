//! Block directory
//!
//! Hands out record addresses by record type. The engine only talks to the
//! `BlockDirectory` trait; `TypeDirectory` is the in-memory implementation
//! used by default.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::{Result, StoreError};
use crate::store::Store;

use super::allocator::Block;
use super::layout::BlockLayout;

/// Source of fresh records for each record type
#[async_trait]
pub trait BlockDirectory: Send + Sync {
    /// Allocate one record of `record_size` bytes for `type_name`
    async fn allocate_record(
        &self,
        store: &Store,
        type_name: &'static str,
        record_size: usize,
    ) -> Result<i64>;

    /// Release the record at `address`; returns whether it was allocated
    async fn free_record(&self, store: &Store, address: i64) -> Result<bool>;
}

/// Blocks of one record type, newest last
struct TypeBlocks {
    record_size: usize,
    blocks: Vec<Block>,
}

/// In-memory block directory
///
/// ## Concurrency:
/// - One async mutex per record type: allocations of different types
///   never wait on each other
/// - `by_address`: RwLock over every block, for address → block lookup
/// - `next_block`: atomic bump pointer for carving new blocks
pub struct TypeDirectory {
    block_size: usize,
    types: Mutex<HashMap<&'static str, Arc<AsyncMutex<TypeBlocks>>>>,
    by_address: RwLock<BTreeMap<i64, Block>>,
    next_block: AtomicI64,
}

impl TypeDirectory {
    /// Create a directory carving blocks of `block_size` bytes starting at
    /// `first_block_address`
    pub fn new(block_size: usize, first_block_address: i64) -> Self {
        Self {
            block_size,
            types: Mutex::new(HashMap::new()),
            by_address: RwLock::new(BTreeMap::new()),
            next_block: AtomicI64::new(first_block_address),
        }
    }

    /// Re-attach an existing block to `type_name`
    pub async fn register_block(
        &self,
        type_name: &'static str,
        address: i64,
        record_size: usize,
    ) -> Result<Block> {
        let block = Block::open(address, self.block_size, record_size)?;
        let list = self.type_list(type_name, record_size);
        let mut blocks = list.lock().await;
        Self::check_record_size(type_name, &blocks, record_size)?;

        blocks.blocks.push(block);
        self.by_address.write().insert(address, block);
        self.next_block
            .fetch_max(block.layout().end_address(), Ordering::SeqCst);
        Ok(block)
    }

    /// Block whose record region contains `address`
    pub fn block_of(&self, address: i64) -> Option<Block> {
        self.by_address
            .read()
            .range(..=address)
            .next_back()
            .map(|(_, block)| *block)
            .filter(|block| block.layout().contains(address))
    }

    /// Blocks currently serving `type_name`, oldest first
    pub async fn blocks_for(&self, type_name: &str) -> Vec<Block> {
        let list = self.types.lock().get(type_name).cloned();
        match list {
            Some(list) => list.lock().await.blocks.clone(),
            None => Vec::new(),
        }
    }

    pub fn block_count(&self) -> usize {
        self.by_address.read().len()
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn type_list(&self, type_name: &'static str, record_size: usize) -> Arc<AsyncMutex<TypeBlocks>> {
        let mut types = self.types.lock();
        Arc::clone(types.entry(type_name).or_insert_with(|| {
            Arc::new(AsyncMutex::new(TypeBlocks {
                record_size,
                blocks: Vec::new(),
            }))
        }))
    }

    fn check_record_size(type_name: &str, blocks: &TypeBlocks, record_size: usize) -> Result<()> {
        if blocks.record_size != record_size {
            return Err(StoreError::Config(format!(
                "record type {} registered with size {}, requested {}",
                type_name, blocks.record_size, record_size
            )));
        }
        Ok(())
    }

    /// Carve a new block off the end of the file
    async fn new_block(&self, store: &Store, record_size: usize) -> Result<Block> {
        // Validate before moving the bump pointer
        BlockLayout::new(0, self.block_size, record_size)?;

        let address = self
            .next_block
            .fetch_add(self.block_size as i64, Ordering::SeqCst);
        let block = Block::open(address, self.block_size, record_size)?;

        store
            .files()
            .ensure_len(block.layout().end_address() as u64)
            .await?;
        block.format(store).await?;
        self.by_address.write().insert(address, block);

        tracing::debug!(
            address,
            record_size,
            record_count = block.layout().record_count,
            "block created"
        );
        Ok(block)
    }
}

#[async_trait]
impl BlockDirectory for TypeDirectory {
    async fn allocate_record(
        &self,
        store: &Store,
        type_name: &'static str,
        record_size: usize,
    ) -> Result<i64> {
        let list = self.type_list(type_name, record_size);
        let mut blocks = list.lock().await;
        Self::check_record_size(type_name, &blocks, record_size)?;

        // Newest blocks are the most likely to have room
        for block in blocks.blocks.iter().rev() {
            if let Some(address) = block.allocate_record(store).await? {
                return Ok(address);
            }
        }

        let block = self.new_block(store, record_size).await?;
        blocks.blocks.push(block);
        tracing::debug!(type_name, blocks = blocks.blocks.len(), "record type grew");

        block.allocate_record(store).await?.ok_or_else(|| {
            block
                .layout()
                .violation("freshly formatted block has no free record".to_string())
        })
    }

    async fn free_record(&self, store: &Store, address: i64) -> Result<bool> {
        let block = self
            .block_of(address)
            .ok_or_else(|| StoreError::InvalidAddress {
                address,
                reason: "not inside any known block".to_string(),
            })?;
        block.unuse_by_address(store, address).await
    }
}
