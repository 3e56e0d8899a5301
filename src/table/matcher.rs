//! Match predicates
//!
//! Hash tables and arrays locate values through a `Matcher` rather than a
//! plain closure because deciding equality can require reading other
//! records (a key stored behind an address, an interned string).

use async_trait::async_trait;

use crate::codec::{HashEntry, Key, Value};
use crate::error::Result;
use crate::store::Store;

/// Decides whether a stored value is the one being looked for
#[async_trait]
pub trait Matcher<T: Value>: Send + Sync {
    async fn matches(&self, value: &T, store: &Store) -> Result<bool>;
}

/// Matches values equal (`==`) to the given one
#[derive(Debug, Clone)]
pub struct ValueMatcher<T>(pub T);

#[async_trait]
impl<T: Value> Matcher<T> for ValueMatcher<T> {
    async fn matches(&self, value: &T, _store: &Store) -> Result<bool> {
        Ok(*value == self.0)
    }
}

/// Matches with a synchronous predicate
pub struct FnMatcher<F>(pub F);

#[async_trait]
impl<T, F> Matcher<T> for FnMatcher<F>
where
    T: Value,
    F: Fn(&T) -> bool + Send + Sync,
{
    async fn matches(&self, value: &T, _store: &Store) -> Result<bool> {
        Ok((self.0)(value))
    }
}

/// Matches keys equal by content (`Key::key_equals`)
pub struct KeyMatcher<'a, K>(pub &'a K);

#[async_trait]
impl<'a, K: Key> Matcher<K> for KeyMatcher<'a, K> {
    async fn matches(&self, value: &K, store: &Store) -> Result<bool> {
        self.0.key_equals(value, store).await
    }
}

/// Lifts a value matcher to overflow entries carrying a specific hash
pub(crate) struct EntryMatcher<'a, T: Value> {
    pub hash_code: u64,
    pub inner: &'a dyn Matcher<T>,
}

#[async_trait]
impl<'a, T: Value> Matcher<HashEntry<T>> for EntryMatcher<'a, T> {
    async fn matches(&self, entry: &HashEntry<T>, store: &Store) -> Result<bool> {
        if entry.hash_code != self.hash_code {
            return Ok(false);
        }
        self.inner.matches(&entry.value, store).await
    }
}
