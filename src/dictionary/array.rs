//! Key to value-list dictionary

use std::marker::PhantomData;

use crate::array::ArrayProcessor;
use crate::codec::{Key, Value};
use crate::error::Result;
use crate::store::Store;
use crate::table::Matcher;

use super::map::Dictionary;

/// Map from keys to lists of values
///
/// Each key maps to the head of its own `ArrayRecord<V>` chain, created on
/// the first `add` for that key. Lists may hold duplicates.
#[derive(Debug)]
pub struct DictionaryArray<K: Key, V: Value> {
    dictionary: Dictionary<K>,
    _marker: PhantomData<fn() -> V>,
}

impl<K: Key, V: Value> Clone for DictionaryArray<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: Key, V: Value> Copy for DictionaryArray<K, V> {}

impl<K: Key, V: Value> DictionaryArray<K, V> {
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

    /// Append `value` to the list of `key`
    pub async fn add(&self, store: &Store, key: &K, value: V) -> Result<()> {
        let hash_code = key.hash_code(store).await?;
        let _key_lock = store.begin_key_write(self.address(), hash_code).await;

        let list = match self.dictionary.get_hashed(store, key, hash_code).await? {
            Some(head) => ArrayProcessor::<V>::open(head),
            None => {
                let list = ArrayProcessor::<V>::create(store).await?;
                self.dictionary
                    .set_locked(store, key, hash_code, list.address())
                    .await?;
                list
            }
        };

        list.add(store, value).await
    }

    /// Values of `key`; empty when the key is absent
    pub async fn get(&self, store: &Store, key: &K) -> Result<Vec<V>> {
        match self.list(store, key).await? {
            Some(list) => list.values(store).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn contains(&self, store: &Store, key: &K, value: &V) -> Result<bool> {
        match self.list(store, key).await? {
            Some(list) => list.contains(store, value).await,
            None => Ok(false),
        }
    }

    /// First value of `key` accepted by `matcher`
    pub async fn find(
        &self,
        store: &Store,
        key: &K,
        matcher: &dyn Matcher<V>,
    ) -> Result<Option<V>> {
        match self.list(store, key).await? {
            Some(list) => list.try_find(store, matcher).await,
            None => Ok(None),
        }
    }

    /// Remove one occurrence of `value` from the list of `key`
    pub async fn remove(&self, store: &Store, key: &K, value: &V) -> Result<bool> {
        match self.list(store, key).await? {
            Some(list) => list.remove(store, value).await,
            None => Ok(false),
        }
    }

    /// Remove `key` and free its whole list
    pub async fn remove_key(&self, store: &Store, key: &K) -> Result<bool> {
        let hash_code = key.hash_code(store).await?;
        let _key_lock = store.begin_key_write(self.address(), hash_code).await;

        match self.dictionary.remove_locked(store, key, hash_code).await? {
            Some(head) => {
                ArrayProcessor::<V>::open(head).destroy(store).await?;
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

    /// Free every list, then the dictionary
    pub async fn destroy(self, store: &Store) -> Result<()> {
        for (_, head) in self.dictionary.entries(store).await? {
            ArrayProcessor::<V>::open(head).destroy(store).await?;
        }
        self.dictionary.destroy(store).await
    }

    async fn list(&self, store: &Store, key: &K) -> Result<Option<ArrayProcessor<V>>> {
        Ok(self
            .dictionary
            .get(store, key)
            .await?
            .map(ArrayProcessor::open))
    }
}
