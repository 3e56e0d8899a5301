//! Interned string set

use async_trait::async_trait;

use crate::codec::{StringRecord, Value, STRING_CHUNK_SIZE};
use crate::error::{Result, StoreError};
use crate::hash;
use crate::store::Store;
use crate::table::{HashTable, Matcher, ValueMatcher};

/// Matches first-chunk addresses whose string equals `s`
struct ContentMatcher<'a> {
    s: &'a str,
}

#[async_trait]
impl<'a> Matcher<i64> for ContentMatcher<'a> {
    async fn matches(&self, address: &i64, store: &Store) -> Result<bool> {
        let first = store.read_value::<StringRecord>(*address).await?;
        if first.length as usize != self.s.len() {
            return Ok(false);
        }
        Ok(read_string(store, *address).await? == self.s)
    }
}

/// Reference-counted set of interned strings
///
/// The table maps each string's content hash to the address of its first
/// chunk. The count lives in the file; callers keep `new_string`/`increase`
/// and `release` balanced.
///
/// ## Concurrency:
/// - Interning and releasing one string hold its key lock
/// - Count changes hold the first chunk's write lock
/// - Chunk contents never change after interning and are read unlocked
#[derive(Debug, Clone, Copy)]
pub struct StringHashSet {
    table: HashTable<i64>,
}

impl StringHashSet {
    pub async fn create(store: &Store) -> Result<Self> {
        Ok(Self {
            table: HashTable::create(store).await?,
        })
    }

    pub fn open(address: i64) -> Self {
        Self {
            table: HashTable::open(address),
        }
    }

    pub fn address(&self) -> i64 {
        self.table.address()
    }

    /// Intern `s` as an owner: the count goes up by one, starting at 1
    pub async fn new_string(&self, store: &Store, s: &str) -> Result<i64> {
        self.intern(store, s, true).await
    }

    /// Intern `s` without taking ownership
    ///
    /// An existing string keeps its count; a new one is stored with a count
    /// of 0 and is removed by the first `release`.
    pub async fn borrow(&self, store: &Store, s: &str) -> Result<i64> {
        self.intern(store, s, false).await
    }

    /// Address of `s` if it is interned
    pub async fn find(&self, store: &Store, s: &str) -> Result<Option<i64>> {
        self.table
            .get(store, hash::hash_str(s), &ContentMatcher { s })
            .await
    }

    /// Add an owner to the string at `address`; returns the new count
    pub async fn increase(&self, store: &Store, address: i64) -> Result<i32> {
        let _lock = store.begin_write(address).await;
        Self::adjust_count(store, address, 1).await
    }

    /// Drop an owner of the string at `address`
    ///
    /// When the count reaches zero (or below, for a borrowed placeholder)
    /// the string leaves the set and its chunks are freed. Returns whether
    /// that happened.
    pub async fn release(&self, store: &Store, address: i64) -> Result<bool> {
        let s = read_string(store, address).await?;
        let hash_code = hash::hash_str(&s);
        let _key_lock = store.begin_key_write(self.address(), hash_code).await;

        {
            let _lock = store.begin_write(address).await;
            let count = Self::adjust_count(store, address, -1).await?;
            if count > 0 {
                return Ok(false);
            }

            self.table
                .remove(store, hash_code, &ValueMatcher(address))
                .await?;
        }

        free_chunks(store, address).await?;
        tracing::trace!(address, "string released");
        Ok(true)
    }

    pub async fn read(&self, store: &Store, address: i64) -> Result<String> {
        read_string(store, address).await
    }

    pub async fn reference_count(&self, store: &Store, address: i64) -> Result<i32> {
        let _lock = store.begin_read(address).await;
        Ok(store
            .read_value::<StringRecord>(address)
            .await?
            .reference_count)
    }

    /// Number of distinct strings
    pub async fn len(&self, store: &Store) -> Result<usize> {
        self.table.len(store).await
    }

    pub async fn is_empty(&self, store: &Store) -> Result<bool> {
        self.table.is_empty(store).await
    }

    /// Free every string regardless of its count, then the table
    pub async fn destroy(self, store: &Store) -> Result<()> {
        for address in self.table.values(store).await? {
            free_chunks(store, address).await?;
        }
        self.table.destroy(store).await
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    async fn intern(&self, store: &Store, s: &str, owned: bool) -> Result<i64> {
        let hash_code = hash::hash_str(s);
        let _key_lock = store.begin_key_write(self.address(), hash_code).await;

        let matcher = ContentMatcher { s };
        if let Some(address) = self.table.get(store, hash_code, &matcher).await? {
            if owned {
                let _lock = store.begin_write(address).await;
                Self::adjust_count(store, address, 1).await?;
            }
            return Ok(address);
        }

        let address = write_chunks(store, s, i32::from(owned)).await?;
        self.table.add(store, hash_code, address).await?;
        tracing::trace!(address, len = s.len(), owned, "string interned");
        Ok(address)
    }

    /// Caller holds the first chunk's write lock
    async fn adjust_count(store: &Store, address: i64, delta: i32) -> Result<i32> {
        let mut first = store.read_value::<StringRecord>(address).await?;
        first.reference_count += delta;
        store.write_value(address, &first).await?;
        Ok(first.reference_count)
    }
}

// =============================================================================
// Chunk Chains
// =============================================================================

/// Read the string whose first chunk is at `address`
pub async fn read_string(store: &Store, address: i64) -> Result<String> {
    let first = store.read_value::<StringRecord>(address).await?;
    if first.length < 0 {
        return Err(StoreError::Corruption(format!(
            "string at {} has negative length {}",
            address, first.length
        )));
    }

    let total = first.length as usize;
    let mut bytes = Vec::with_capacity(total);
    let mut chunk = first;
    loop {
        let take = (total - bytes.len()).min(STRING_CHUNK_SIZE);
        bytes.extend_from_slice(&chunk.value[..take]);
        if bytes.len() == total {
            break;
        }
        if chunk.next_record_address == 0 {
            return Err(StoreError::Corruption(format!(
                "string at {} ends after {} of {} bytes",
                address,
                bytes.len(),
                total
            )));
        }
        chunk = store
            .read_value::<StringRecord>(chunk.next_record_address)
            .await?;
    }

    String::from_utf8(bytes).map_err(|e| {
        StoreError::Corruption(format!("string at {} is not UTF-8: {}", address, e))
    })
}

/// Store `s` as a chunk chain and return the first chunk's address
///
/// Chunks are written last to first so every link points at a chunk that
/// is already complete.
async fn write_chunks(store: &Store, s: &str, reference_count: i32) -> Result<i64> {
    let length = i32::try_from(s.len()).map_err(|_| {
        StoreError::Serialization(format!("string of {} bytes is too long", s.len()))
    })?;

    let bytes = s.as_bytes();
    let chunk_count = bytes.len().div_ceil(STRING_CHUNK_SIZE).max(1);
    let mut next = 0i64;

    for index in (0..chunk_count).rev() {
        let start = index * STRING_CHUNK_SIZE;
        let end = (start + STRING_CHUNK_SIZE).min(bytes.len());

        let mut record = StringRecord::empty();
        record.value[..end - start].copy_from_slice(&bytes[start..end]);
        record.next_record_address = next;
        if index == 0 {
            record.length = length;
            record.reference_count = reference_count;
        }
        next = store.allocate_value(&record).await?;
    }

    Ok(next)
}

async fn free_chunks(store: &Store, address: i64) -> Result<()> {
    let mut next = address;
    while next != 0 {
        let chunk = store.read_value::<StringRecord>(next).await?;
        store.free(next).await?;
        next = chunk.next_record_address;
    }
    Ok(())
}
