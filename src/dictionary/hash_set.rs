//! Key to value-set dictionary

use std::marker::PhantomData;

use crate::codec::Key;
use crate::error::Result;
use crate::store::Store;
use crate::table::{HashTable, KeyMatcher};

use super::map::Dictionary;

/// Map from keys to sets of values
///
/// Each key maps to the entry record of its own nested `HashTable<V>`,
/// created on the first `add` for that key. Membership uses the value's
/// content hash and `Key::key_equals`.
#[derive(Debug)]
pub struct DictionaryHashSet<K: Key, V: Key> {
    dictionary: Dictionary<K>,
    _marker: PhantomData<fn() -> V>,
}

impl<K: Key, V: Key> Clone for DictionaryHashSet<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: Key, V: Key> Copy for DictionaryHashSet<K, V> {}

impl<K: Key, V: Key> DictionaryHashSet<K, V> {
    pub async fn create(store: &Store) -> Result<Self> {
        Ok(Self::open(Dictionary::<K>::create(store).await?.address()))
    }

    pub fn open(address: i64) -> Self {
        Self {
            dictionary: Dictionary::open(address),
            _marker: PhantomData,
        }
    }

    pub fn address(&self) -> i64 {
        self.dictionary.address()
    }

    /// Insert `value` into the set of `key`; false if it was already there
    pub async fn add(&self, store: &Store, key: &K, value: V) -> Result<bool> {
        let hash_code = key.hash_code(store).await?;
        let _key_lock = store.begin_key_write(self.address(), hash_code).await;

        let set = match self.dictionary.get_hashed(store, key, hash_code).await? {
            Some(address) => HashTable::<V>::open(address),
            None => {
                let set = HashTable::<V>::create(store).await?;
                self.dictionary
                    .set_locked(store, key, hash_code, set.address())
                    .await?;
                set
            }
        };

        let value_hash = value.hash_code(store).await?;
        if set.contains(store, value_hash, &KeyMatcher(&value)).await? {
            return Ok(false);
        }
        set.add(store, value_hash, value).await?;
        Ok(true)
    }

    pub async fn contains(&self, store: &Store, key: &K, value: &V) -> Result<bool> {
        let Some(set) = self.set(store, key).await? else {
            return Ok(false);
        };
        let value_hash = value.hash_code(store).await?;
        set.contains(store, value_hash, &KeyMatcher(value)).await
    }

    /// Remove `value` from the set of `key`
    pub async fn remove(&self, store: &Store, key: &K, value: &V) -> Result<bool> {
        let hash_code = key.hash_code(store).await?;
        let _key_lock = store.begin_key_write(self.address(), hash_code).await;

        let Some(address) = self.dictionary.get_hashed(store, key, hash_code).await? else {
            return Ok(false);
        };
        let value_hash = value.hash_code(store).await?;
        let removed = HashTable::<V>::open(address)
            .remove(store, value_hash, &KeyMatcher(value))
            .await?;
        Ok(removed.is_some())
    }

    /// Members of the set of `key`; empty when the key is absent
    pub async fn values(&self, store: &Store, key: &K) -> Result<Vec<V>> {
        match self.set(store, key).await? {
            Some(set) => set.values(store).await,
            None => Ok(Vec::new()),
        }
    }

    /// Remove `key` and free its whole set
    pub async fn remove_key(&self, store: &Store, key: &K) -> Result<bool> {
        let hash_code = key.hash_code(store).await?;
        let _key_lock = store.begin_key_write(self.address(), hash_code).await;

        match self.dictionary.remove_locked(store, key, hash_code).await? {
            Some(address) => {
                HashTable::<V>::open(address).destroy(store).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn keys(&self, store: &Store) -> Result<Vec<K>> {
        self.dictionary.keys(store).await
    }

    pub async fn contains_key(&self, store: &Store, key: &K) -> Result<bool> {
        self.dictionary.contains_key(store, key).await
    }

    /// Number of keys
    pub async fn len(&self, store: &Store) -> Result<usize> {
        self.dictionary.len(store).await
    }

    pub async fn is_empty(&self, store: &Store) -> Result<bool> {
        self.dictionary.is_empty(store).await
    }

    /// Free every set, then the dictionary
    pub async fn destroy(self, store: &Store) -> Result<()> {
        for (_, address) in self.dictionary.entries(store).await? {
            HashTable::<V>::open(address).destroy(store).await?;
        }
        self.dictionary.destroy(store).await
    }

    async fn set(&self, store: &Store, key: &K) -> Result<Option<HashTable<V>>> {
        Ok(self.dictionary.get(store, key).await?.map(HashTable::open))
    }
}
