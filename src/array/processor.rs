//! Array processor
//!
//! Operations over one chain of `ArrayRecord<T>` nodes, identified by the
//! address of its head node.

use std::marker::PhantomData;

use crate::codec::{ArrayRecord, Value};
use crate::error::{Result, StoreError};
use crate::store::Store;
use crate::table::{Matcher, ValueMatcher};

/// Handle to an array record chain
///
/// ## Concurrency:
/// - Writers hold the head address's write lock for the whole operation
/// - Readers hold its read lock, so they see the chain between writes
///
/// ## Invariants:
/// - Empty values mark free slots; they can never be stored
/// - `length` on the head node equals the number of non-empty slots
/// - Every node's `first_address` is the head address
#[derive(Debug)]
pub struct ArrayProcessor<T: Value> {
    head: i64,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Value> Clone for ArrayProcessor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Value> Copy for ArrayProcessor<T> {}

impl<T: Value> ArrayProcessor<T> {
    /// Allocate an empty chain
    pub async fn create(store: &Store) -> Result<Self> {
        let head = store.allocate::<ArrayRecord<T>>().await?;
        store.write_value(head, &ArrayRecord::<T>::new(head)).await?;
        tracing::trace!(head, "array created");
        Ok(Self::open(head))
    }

    /// Attach to an existing chain
    pub fn open(head: i64) -> Self {
        Self {
            head,
            _marker: PhantomData,
        }
    }

    pub fn address(&self) -> i64 {
        self.head
    }

    /// Store `value` in the first free slot, growing the chain when full
    pub async fn add(&self, store: &Store, value: T) -> Result<()> {
        if value.is_empty() {
            return Err(StoreError::EmptyValue);
        }

        let _lock = store.begin_write(self.head).await;
        let mut address = self.head;
        loop {
            let mut record = store.read_value::<ArrayRecord<T>>(address).await?;

            if let Some(slot) = record.free_slot() {
                record.values[slot] = value;
                store.write_value(address, &record).await?;
                break;
            }

            if record.next_address == 0 {
                let mut next = ArrayRecord::new(self.head);
                next.values[0] = value;
                // The new node is complete before anything points at it
                let next_address = store.allocate_value(&next).await?;
                record.next_address = next_address;
                store.write_value(address, &record).await?;
                tracing::trace!(head = self.head, node = next_address, "array grew");
                break;
            }

            address = record.next_address;
        }

        self.adjust_length(store, 1).await
    }

    /// Every stored value, in chain order
    pub async fn values(&self, store: &Store) -> Result<Vec<T>> {
        let _lock = store.begin_read(self.head).await;
        let mut out = Vec::new();
        let mut address = self.head;
        while address != 0 {
            let record = store.read_value::<ArrayRecord<T>>(address).await?;
            out.extend(record.values.into_iter().filter(|v| !v.is_empty()));
            address = record.next_address;
        }
        Ok(out)
    }

    pub async fn contains(&self, store: &Store, value: &T) -> Result<bool> {
        Ok(self
            .try_find(store, &ValueMatcher(value.clone()))
            .await?
            .is_some())
    }

    /// First stored value accepted by `matcher`
    pub async fn try_find(&self, store: &Store, matcher: &dyn Matcher<T>) -> Result<Option<T>> {
        let _lock = store.begin_read(self.head).await;
        let mut address = self.head;
        while address != 0 {
            let record = store.read_value::<ArrayRecord<T>>(address).await?;
            for value in record.values {
                if !value.is_empty() && matcher.matches(&value, store).await? {
                    return Ok(Some(value));
                }
            }
            address = record.next_address;
        }
        Ok(None)
    }

    /// Remove the first occurrence of `value`
    pub async fn remove(&self, store: &Store, value: &T) -> Result<bool> {
        Ok(self
            .remove_with(store, &ValueMatcher(value.clone()))
            .await?
            .is_some())
    }

    /// Remove the first value accepted by `matcher`
    ///
    /// The slot is emptied in place; nodes are never compacted.
    pub async fn remove_with(&self, store: &Store, matcher: &dyn Matcher<T>) -> Result<Option<T>> {
        let _lock = store.begin_write(self.head).await;
        let Some((address, mut record, slot)) = self.find_slot(store, matcher).await? else {
            return Ok(None);
        };

        let removed = std::mem::replace(&mut record.values[slot], T::empty());
        store.write_value(address, &record).await?;
        self.adjust_length(store, -1).await?;
        Ok(Some(removed))
    }

    /// Overwrite the first value accepted by `matcher`; returns whether one was found
    pub async fn replace_with(
        &self,
        store: &Store,
        matcher: &dyn Matcher<T>,
        value: T,
    ) -> Result<bool> {
        if value.is_empty() {
            return Err(StoreError::EmptyValue);
        }

        let _lock = store.begin_write(self.head).await;
        let Some((address, mut record, slot)) = self.find_slot(store, matcher).await? else {
            return Ok(false);
        };

        record.values[slot] = value;
        store.write_value(address, &record).await?;
        Ok(true)
    }

    /// Element count, as kept on the head node
    pub async fn len(&self, store: &Store) -> Result<usize> {
        let _lock = store.begin_read(self.head).await;
        let head = store.read_value::<ArrayRecord<T>>(self.head).await?;
        Ok(head.length.max(0) as usize)
    }

    pub async fn is_empty(&self, store: &Store) -> Result<bool> {
        Ok(self.len(store).await? == 0)
    }

    /// Free every node of the chain
    pub async fn destroy(self, store: &Store) -> Result<()> {
        let nodes = {
            let _lock = store.begin_write(self.head).await;
            let mut nodes = Vec::new();
            let mut address = self.head;
            while address != 0 {
                nodes.push(address);
                address = store
                    .read_value::<ArrayRecord<T>>(address)
                    .await?
                    .next_address;
            }
            nodes
        };

        for address in nodes {
            store.free(address).await?;
        }
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Locate the first matching slot; caller holds the head write lock
    async fn find_slot(
        &self,
        store: &Store,
        matcher: &dyn Matcher<T>,
    ) -> Result<Option<(i64, ArrayRecord<T>, usize)>> {
        let mut address = self.head;
        while address != 0 {
            let record = store.read_value::<ArrayRecord<T>>(address).await?;
            let mut found = None;
            for (slot, value) in record.values.iter().enumerate() {
                if !value.is_empty() && matcher.matches(value, store).await? {
                    found = Some(slot);
                    break;
                }
            }
            if let Some(slot) = found {
                return Ok(Some((address, record, slot)));
            }
            address = record.next_address;
        }
        Ok(None)
    }

    /// Adjust the head node's length; caller holds the head write lock
    async fn adjust_length(&self, store: &Store, delta: i32) -> Result<()> {
        let mut head = store.read_value::<ArrayRecord<T>>(self.head).await?;
        head.length += delta;
        store.write_value(self.head, &head).await
    }
}
