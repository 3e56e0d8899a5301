//! Configuration for SlotDB
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, StoreError};

/// Main configuration for a SlotDB store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Path of the single backing file
    /// Internal structure:
    ///   [superblock (64 B)][block 0][block 1]...
    pub path: PathBuf,

    /// Size of every block in bytes (header + bitmap + records)
    pub block_size: usize,

    /// Discard any existing file contents on open
    pub truncate: bool,

    // -------------------------------------------------------------------------
    // I/O Configuration
    // -------------------------------------------------------------------------
    /// Number of independently opened file handles used in rotation
    pub file_handles: usize,

    // -------------------------------------------------------------------------
    // Buffer Pool Configuration
    // -------------------------------------------------------------------------
    /// Smallest pooled buffer size; buckets are `buffer_unit * 2^n`
    pub buffer_unit: usize,

    /// Number of power-of-two buckets
    pub buffer_buckets: usize,

    /// Maximum buffers checked out of one bucket at a time
    pub buffers_per_bucket: usize,

    // -------------------------------------------------------------------------
    // Lock Pool Configuration
    // -------------------------------------------------------------------------
    /// Maximum number of idle locks kept for recycling
    pub lock_pool_free_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./slotdb.dat"),
            block_size: 256 * 1024, // 256 KB
            truncate: false,
            file_handles: 4,
            buffer_unit: 64,
            buffer_buckets: 16,
            buffers_per_bucket: 64,
            lock_pool_free_limit: 1024,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.block_size < 64 || self.block_size > i32::MAX as usize {
            return Err(StoreError::Config(format!(
                "block_size must be between 64 and {} bytes, got {}",
                i32::MAX,
                self.block_size
            )));
        }
        if self.file_handles == 0 {
            return Err(StoreError::Config(
                "file_handles must be at least 1".to_string(),
            ));
        }
        if self.buffer_unit == 0 || !self.buffer_unit.is_power_of_two() {
            return Err(StoreError::Config(format!(
                "buffer_unit must be a power of two, got {}",
                self.buffer_unit
            )));
        }
        if self.buffer_buckets == 0 || self.buffers_per_bucket == 0 {
            return Err(StoreError::Config(
                "buffer pool needs at least one bucket and one buffer per bucket".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the backing file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the block size (in bytes)
    pub fn block_size(mut self, size: usize) -> Self {
        self.config.block_size = size;
        self
    }

    /// Discard existing file contents on open
    pub fn truncate(mut self, truncate: bool) -> Self {
        self.config.truncate = truncate;
        self
    }

    /// Set the number of rotating file handles
    pub fn file_handles(mut self, count: usize) -> Self {
        self.config.file_handles = count;
        self
    }

    /// Set the smallest pooled buffer size
    pub fn buffer_unit(mut self, unit: usize) -> Self {
        self.config.buffer_unit = unit;
        self
    }

    /// Set the number of buffer buckets
    pub fn buffer_buckets(mut self, count: usize) -> Self {
        self.config.buffer_buckets = count;
        self
    }

    /// Set the per-bucket checkout limit
    pub fn buffers_per_bucket(mut self, count: usize) -> Self {
        self.config.buffers_per_bucket = count;
        self
    }

    /// Set how many idle locks are kept for reuse
    pub fn lock_pool_free_limit(mut self, count: usize) -> Self {
        self.config.lock_pool_free_limit = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
