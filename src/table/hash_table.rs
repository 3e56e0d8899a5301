//! Hash trie
//!
//! A 64-way trie over 64-bit hash codes. Level `n` is indexed by the
//! `n`-th 6-bit slice of the hash (least significant first); when the hash
//! runs out of slices, further values sharing the path go to the node's
//! overflow array.

use std::marker::PhantomData;

use crate::array::ArrayProcessor;
use crate::codec::{HashEntry, HashNode, HashRecord, Value, HASH_FANOUT};
use crate::error::Result;
use crate::store::Store;

use super::matcher::{EntryMatcher, Matcher};

/// Where a descent step ended up
enum Step<T: Value> {
    /// Continue in the child record at this address
    Descend(i64),
    /// The hash is exhausted; continue in this overflow array
    Overflow(ArrayProcessor<HashEntry<T>>),
}

/// Handle to a hash table rooted at an entry `HashRecord`
///
/// ## Concurrency:
/// - Each node is guarded by its own address lock
/// - Lookups read a node under its read lock and release it before
///   running the matcher
/// - Mutations re-read the node under its write lock before writing
///
/// ## Invariants:
/// - A child record or overflow array is fully written before the link to
///   it is stored in its parent node
/// - Removing a value empties its node but keeps the node's links
#[derive(Debug)]
pub struct HashTable<T: Value> {
    address: i64,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Value> Clone for HashTable<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Value> Copy for HashTable<T> {}

impl<T: Value> HashTable<T> {
    /// Allocate an empty table
    pub async fn create(store: &Store) -> Result<Self> {
        let address = store.allocate_value(&HashRecord::<T>::empty()).await?;
        tracing::debug!(address, "hash table created");
        Ok(Self::open(address))
    }

    /// Attach to the table whose entry record is at `address`
    pub fn open(address: i64) -> Self {
        Self {
            address,
            _marker: PhantomData,
        }
    }

    pub fn address(&self) -> i64 {
        self.address
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Find the value stored under `hash_code` that `matcher` accepts
    pub async fn get(
        &self,
        store: &Store,
        hash_code: u64,
        matcher: &dyn Matcher<T>,
    ) -> Result<Option<T>> {
        let mut idx = hash_code;
        let mut record = self.address;

        loop {
            let node_address = Self::node_address(record, idx);
            idx /= HASH_FANOUT as u64;

            let node = Self::read_node(store, node_address).await?;
            if Self::holds(&node, hash_code) && matcher.matches(&node.value, store).await? {
                return Ok(Some(node.value));
            }

            if idx != 0 {
                if node.next_record_address == 0 {
                    return Ok(None);
                }
                record = node.next_record_address;
                continue;
            }

            if node.array_record_address == 0 {
                return Ok(None);
            }
            let overflow = ArrayProcessor::<HashEntry<T>>::open(node.array_record_address);
            let found = overflow
                .try_find(store, &EntryMatcher { hash_code, inner: matcher })
                .await?;
            return Ok(found.map(|entry| entry.value));
        }
    }

    pub async fn contains(
        &self,
        store: &Store,
        hash_code: u64,
        matcher: &dyn Matcher<T>,
    ) -> Result<bool> {
        Ok(self.get(store, hash_code, matcher).await?.is_some())
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Store `value` under `hash_code` in the first empty node on its path
    ///
    /// Does not check for an existing equal value; see `update`.
    /// A zero `hash_code` is the empty-node marker: the value lands in entry
    /// slot 0 when that node is free and is dropped otherwise. Either way it
    /// cannot be found again.
    pub async fn add(&self, store: &Store, hash_code: u64, value: T) -> Result<()> {
        if hash_code == 0 {
            tracing::warn!(
                table = self.address,
                "hash code 0 is the empty-node marker; the value may be unreachable"
            );
        }

        let mut idx = hash_code;
        let mut record = self.address;

        loop {
            let node_address = Self::node_address(record, idx);
            idx /= HASH_FANOUT as u64;

            let step = {
                let _lock = store.begin_write(node_address).await;
                let mut node = store.read_value::<HashNode<T>>(node_address).await?;

                if node.is_empty() {
                    node.hash_code = hash_code;
                    node.value = value;
                    store.write_value(node_address, &node).await?;
                    return Ok(());
                }

                // A zero hash cannot be told apart from an empty overflow
                // entry, so it is dropped instead of spilling
                if hash_code == 0 {
                    return Ok(());
                }

                Self::step_or_grow(store, node_address, &mut node, idx).await?
            };

            match step {
                Step::Descend(child) => record = child,
                Step::Overflow(overflow) => {
                    return overflow.add(store, HashEntry { hash_code, value }).await;
                }
            }
        }
    }

    /// Overwrite the matching value; returns whether one was found
    pub async fn replace(
        &self,
        store: &Store,
        hash_code: u64,
        matcher: &dyn Matcher<T>,
        value: T,
    ) -> Result<bool> {
        let mut idx = hash_code;
        let mut record = self.address;

        loop {
            let node_address = Self::node_address(record, idx);
            idx /= HASH_FANOUT as u64;

            let step = {
                let _lock = store.begin_write(node_address).await;
                let mut node = store.read_value::<HashNode<T>>(node_address).await?;

                if Self::holds(&node, hash_code) && matcher.matches(&node.value, store).await? {
                    node.value = value;
                    store.write_value(node_address, &node).await?;
                    return Ok(true);
                }

                match Self::step(&node, idx) {
                    Some(step) => step,
                    None => return Ok(false),
                }
            };

            match step {
                Step::Descend(child) => record = child,
                Step::Overflow(overflow) => {
                    let matcher = EntryMatcher { hash_code, inner: matcher };
                    return overflow
                        .replace_with(store, &matcher, HashEntry { hash_code, value })
                        .await;
                }
            }
        }
    }

    /// Remove the matching value and return it
    pub async fn remove(
        &self,
        store: &Store,
        hash_code: u64,
        matcher: &dyn Matcher<T>,
    ) -> Result<Option<T>> {
        let mut idx = hash_code;
        let mut record = self.address;

        loop {
            let node_address = Self::node_address(record, idx);
            idx /= HASH_FANOUT as u64;

            let step = {
                let _lock = store.begin_write(node_address).await;
                let mut node = store.read_value::<HashNode<T>>(node_address).await?;

                if Self::holds(&node, hash_code) && matcher.matches(&node.value, store).await? {
                    let removed = std::mem::replace(&mut node.value, T::empty());
                    node.hash_code = 0;
                    store.write_value(node_address, &node).await?;
                    return Ok(Some(removed));
                }

                match Self::step(&node, idx) {
                    Some(step) => step,
                    None => return Ok(None),
                }
            };

            match step {
                Step::Descend(child) => record = child,
                Step::Overflow(overflow) => {
                    let found = overflow
                        .remove_with(store, &EntryMatcher { hash_code, inner: matcher })
                        .await?;
                    return Ok(found.map(|entry| entry.value));
                }
            }
        }
    }

    /// Replace the matching value, or add `value` if there is none
    ///
    /// Two steps, each atomic per node: a concurrent `add` of the same value
    /// between them can produce a duplicate. Callers that need one value
    /// per key serialize through `Store::begin_key_write`.
    pub async fn update(
        &self,
        store: &Store,
        hash_code: u64,
        matcher: &dyn Matcher<T>,
        value: T,
    ) -> Result<()> {
        if self.replace(store, hash_code, matcher, value.clone()).await? {
            return Ok(());
        }
        self.add(store, hash_code, value).await
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Every stored value: entry nodes, chained records and overflow arrays
    pub async fn values(&self, store: &Store) -> Result<Vec<T>> {
        let mut out = Vec::new();
        let mut pending = vec![self.address];

        while let Some(record) = pending.pop() {
            for slot in 0..HASH_FANOUT {
                let node_address = HashRecord::<T>::node_address(record, slot);
                let node = Self::read_node(store, node_address).await?;

                if node.next_record_address != 0 {
                    pending.push(node.next_record_address);
                }
                if node.array_record_address != 0 {
                    let overflow =
                        ArrayProcessor::<HashEntry<T>>::open(node.array_record_address);
                    out.extend(overflow.values(store).await?.into_iter().map(|e| e.value));
                }
                if !node.is_empty() {
                    out.push(node.value);
                }
            }
        }

        Ok(out)
    }

    pub async fn len(&self, store: &Store) -> Result<usize> {
        Ok(self.values(store).await?.len())
    }

    pub async fn is_empty(&self, store: &Store) -> Result<bool> {
        Ok(self.len(store).await? == 0)
    }

    /// Free every record owned by the table, entry record last
    ///
    /// The caller must ensure nothing else uses the table.
    pub async fn destroy(self, store: &Store) -> Result<()> {
        let mut records = Vec::new();
        let mut pending = vec![self.address];

        while let Some(address) = pending.pop() {
            let record = store.read_value::<HashRecord<T>>(address).await?;
            for node in &record.nodes {
                if node.next_record_address != 0 {
                    pending.push(node.next_record_address);
                }
                if node.array_record_address != 0 {
                    ArrayProcessor::<HashEntry<T>>::open(node.array_record_address)
                        .destroy(store)
                        .await?;
                }
            }
            records.push(address);
        }

        // Children were pushed after their parents
        for address in records.into_iter().rev() {
            store.free(address).await?;
        }
        tracing::debug!(address = self.address, "hash table destroyed");
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn node_address(record: i64, idx: u64) -> i64 {
        HashRecord::<T>::node_address(record, (idx % HASH_FANOUT as u64) as usize)
    }

    fn holds(node: &HashNode<T>, hash_code: u64) -> bool {
        !node.is_empty() && node.hash_code == hash_code
    }

    async fn read_node(store: &Store, node_address: i64) -> Result<HashNode<T>> {
        let _lock = store.begin_read(node_address).await;
        store.read_value(node_address).await
    }

    /// Next step below a node, if the link exists
    fn step(node: &HashNode<T>, idx: u64) -> Option<Step<T>> {
        if idx != 0 {
            (node.next_record_address != 0).then_some(Step::Descend(node.next_record_address))
        } else {
            (node.array_record_address != 0).then(|| {
                Step::Overflow(ArrayProcessor::open(node.array_record_address))
            })
        }
    }

    /// Next step below a node, allocating the missing child first
    ///
    /// Caller holds the node's write lock.
    async fn step_or_grow(
        store: &Store,
        node_address: i64,
        node: &mut HashNode<T>,
        idx: u64,
    ) -> Result<Step<T>> {
        if let Some(step) = Self::step(node, idx) {
            return Ok(step);
        }

        if idx != 0 {
            let child = store.allocate_value(&HashRecord::<T>::empty()).await?;
            node.next_record_address = child;
            store.write_value(node_address, node).await?;
            tracing::trace!(node = node_address, child, "hash record chained");
            Ok(Step::Descend(child))
        } else {
            let overflow = ArrayProcessor::<HashEntry<T>>::create(store).await?;
            node.array_record_address = overflow.address();
            store.write_value(node_address, node).await?;
            tracing::trace!(node = node_address, array = overflow.address(), "overflow array linked");
            Ok(Step::Overflow(overflow))
        }
    }
}
