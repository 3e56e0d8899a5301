//! Block layout arithmetic

use crate::error::{Result, StoreError};

/// Width of the `UsedCount` header field
pub const USED_COUNT_SIZE: usize = 4;

/// Geometry of one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    /// File offset of the block (start of `UsedCount`)
    pub address: i64,
    pub block_size: usize,
    pub record_size: usize,
    /// Number of record slots
    pub record_count: usize,
    /// Bitmap length in bytes
    pub bitmap_len: usize,
}

impl BlockLayout {
    /// Lay out a block of `block_size` bytes at `address` for records of
    /// `record_size` bytes
    ///
    /// `record_count` is the largest count whose header, bitmap and records
    /// fit, found by stepping down from `(block_size - 4) / record_size`.
    pub fn new(address: i64, block_size: usize, record_size: usize) -> Result<Self> {
        if record_size == 0 {
            return Err(StoreError::Config("record_size must be non-zero".to_string()));
        }
        if block_size <= USED_COUNT_SIZE {
            return Err(StoreError::Config(format!(
                "block_size {} leaves no room for records",
                block_size
            )));
        }

        let mut count = (block_size - USED_COUNT_SIZE) / record_size;
        while count > 0 && Self::footprint(count, record_size) > block_size {
            count -= 1;
        }

        if count == 0 {
            return Err(StoreError::Config(format!(
                "record_size {} does not fit in a {} byte block",
                record_size, block_size
            )));
        }

        Ok(Self {
            address,
            block_size,
            record_size,
            record_count: count,
            bitmap_len: count.div_ceil(8),
        })
    }

    fn footprint(count: usize, record_size: usize) -> usize {
        USED_COUNT_SIZE + count.div_ceil(8) + count * record_size
    }

    /// Header length: `UsedCount` plus bitmap
    pub fn header_len(&self) -> usize {
        USED_COUNT_SIZE + self.bitmap_len
    }

    pub fn first_record_address(&self) -> i64 {
        self.address + self.header_len() as i64
    }

    /// One past the last byte of the block
    pub fn end_address(&self) -> i64 {
        self.address + self.block_size as i64
    }

    /// Address of record slot `index`
    pub fn record_address(&self, index: usize) -> Result<i64> {
        if index >= self.record_count {
            return Err(self.violation(format!(
                "record index {} out of range",
                index
            )));
        }
        Ok(self.first_record_address() + (index * self.record_size) as i64)
    }

    /// Slot index of the record at `address`
    pub fn index_of(&self, address: i64) -> Result<usize> {
        let offset = address - self.first_record_address();
        if offset < 0 || offset % self.record_size as i64 != 0 {
            return Err(self.violation(format!(
                "address {} is not a record boundary",
                address
            )));
        }
        let index = (offset / self.record_size as i64) as usize;
        if index >= self.record_count {
            return Err(self.violation(format!(
                "address {} maps to record index {} out of range",
                address, index
            )));
        }
        Ok(index)
    }

    /// Whether `address` falls anywhere inside this block's record region
    pub fn contains(&self, address: i64) -> bool {
        let first = self.first_record_address();
        address >= first && address < first + (self.record_count * self.record_size) as i64
    }

    /// Build an invariant violation carrying this block's addressing context
    pub fn violation(&self, detail: String) -> StoreError {
        StoreError::InvariantViolation {
            block_address: self.address,
            record_size: self.record_size,
            record_count: self.record_count,
            detail,
        }
    }
}
