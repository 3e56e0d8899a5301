//! Key/value dictionary

use std::marker::PhantomData;

use async_trait::async_trait;

use crate::codec::{Key, KeyValueRecord};
use crate::error::Result;
use crate::store::Store;
use crate::table::{HashTable, Matcher};

/// Matches table values (record addresses) whose stored key equals `key`
struct KvMatcher<'a, K> {
    key: &'a K,
}

#[async_trait]
impl<'a, K: Key> Matcher<i64> for KvMatcher<'a, K> {
    async fn matches(&self, address: &i64, store: &Store) -> Result<bool> {
        // The caller holds the key lock for this hash, so the record
        // cannot be freed and reused while it is compared
        let record = store.read_value::<KeyValueRecord<K>>(*address).await?;
        self.key.key_equals(&record.key, store).await
    }
}

/// Map from keys to `i64` values
///
/// The underlying table stores, per key, the address of a
/// `KeyValueRecord<K>` and is indexed by the key's content hash. Every hit
/// is confirmed with full key equality.
#[derive(Debug)]
pub struct Dictionary<K: Key> {
    table: HashTable<i64>,
    _marker: PhantomData<fn() -> K>,
}

impl<K: Key> Clone for Dictionary<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: Key> Copy for Dictionary<K> {}

impl<K: Key> Dictionary<K> {
    pub async fn create(store: &Store) -> Result<Self> {
        Ok(Self::open(HashTable::<i64>::create(store).await?.address()))
    }

    pub fn open(address: i64) -> Self {
        Self {
            table: HashTable::open(address),
            _marker: PhantomData,
        }
    }

    pub fn address(&self) -> i64 {
        self.table.address()
    }

    /// Set `key` to `value`, overwriting any previous value
    pub async fn set(&self, store: &Store, key: &K, value: i64) -> Result<()> {
        let hash_code = key.hash_code(store).await?;
        let _key_lock = store.begin_key_write(self.address(), hash_code).await;
        self.set_locked(store, key, hash_code, value).await
    }

    pub async fn get(&self, store: &Store, key: &K) -> Result<Option<i64>> {
        let hash_code = key.hash_code(store).await?;
        let _key_lock = store.begin_key_write(self.address(), hash_code).await;
        self.get_hashed(store, key, hash_code).await
    }

    pub async fn contains_key(&self, store: &Store, key: &K) -> Result<bool> {
        let hash_code = key.hash_code(store).await?;
        let _key_lock = store.begin_key_write(self.address(), hash_code).await;
        Ok(self.find(store, key, hash_code).await?.is_some())
    }

    /// Remove `key`, returning its value
    pub async fn remove_key(&self, store: &Store, key: &K) -> Result<Option<i64>> {
        let hash_code = key.hash_code(store).await?;
        let _key_lock = store.begin_key_write(self.address(), hash_code).await;
        self.remove_locked(store, key, hash_code).await
    }

    /// Every key/value pair, in table order
    ///
    /// Takes no key locks: records removed while the walk runs may be
    /// missing or, if their slot was reused, reported with the new content.
    pub async fn entries(&self, store: &Store) -> Result<Vec<(K, i64)>> {
        let mut out = Vec::new();
        for address in self.table.values(store).await? {
            let _lock = store.begin_read(address).await;
            let record = store.read_value::<KeyValueRecord<K>>(address).await?;
            out.push((record.key, record.value));
        }
        Ok(out)
    }

    pub async fn keys(&self, store: &Store) -> Result<Vec<K>> {
        Ok(self
            .entries(store)
            .await?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }

    pub async fn len(&self, store: &Store) -> Result<usize> {
        self.table.len(store).await
    }

    pub async fn is_empty(&self, store: &Store) -> Result<bool> {
        self.table.is_empty(store).await
    }

    /// Free every key/value record and the table itself
    pub async fn destroy(self, store: &Store) -> Result<()> {
        for address in self.table.values(store).await? {
            store.free(address).await?;
        }
        self.table.destroy(store).await
    }

    // =========================================================================
    // Crate-internal Operations
    // =========================================================================
    //
    // Callers of the `_locked` variants already hold the key lock for
    // `(self.address(), hash_code)`.

    pub(crate) async fn get_hashed(
        &self,
        store: &Store,
        key: &K,
        hash_code: u64,
    ) -> Result<Option<i64>> {
        let Some(address) = self.find(store, key, hash_code).await? else {
            return Ok(None);
        };
        let _lock = store.begin_read(address).await;
        let record = store.read_value::<KeyValueRecord<K>>(address).await?;
        Ok(Some(record.value))
    }

    pub(crate) async fn set_locked(
        &self,
        store: &Store,
        key: &K,
        hash_code: u64,
        value: i64,
    ) -> Result<()> {
        if let Some(address) = self.find(store, key, hash_code).await? {
            let _lock = store.begin_write(address).await;
            let mut record = store.read_value::<KeyValueRecord<K>>(address).await?;
            record.value = value;
            return store.write_value(address, &record).await;
        }

        let record = KeyValueRecord {
            key: key.clone(),
            value,
        };
        let address = store.allocate_value(&record).await?;
        self.table.add(store, hash_code, address).await
    }

    pub(crate) async fn remove_locked(
        &self,
        store: &Store,
        key: &K,
        hash_code: u64,
    ) -> Result<Option<i64>> {
        let matcher = KvMatcher { key };
        let Some(address) = self.table.remove(store, hash_code, &matcher).await? else {
            return Ok(None);
        };

        let value = store.read_value::<KeyValueRecord<K>>(address).await?.value;
        store.free(address).await?;
        Ok(Some(value))
    }

    /// Address of the key/value record for `key`
    async fn find(&self, store: &Store, key: &K, hash_code: u64) -> Result<Option<i64>> {
        self.table
            .get(store, hash_code, &KvMatcher { key })
            .await
    }
}
