//! Tests for array record chains
//!
//! These tests verify:
//! - Chaining into a second node after 32 values
//! - Slot reuse after removal and the head length counter
//! - Matcher-based find/remove/replace
//! - Rejection of empty values

use std::sync::Arc;

use slotdb::codec::{ArrayRecord, ARRAY_CAPACITY};
use slotdb::table::FnMatcher;
use slotdb::{ArrayProcessor, Config, Store, StoreError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

async fn open_store(dir: &TempDir) -> Arc<Store> {
    let config = Config::builder()
        .path(dir.path().join("array.dat"))
        .block_size(4096)
        .truncate(true)
        .build();
    Store::open(config).await.unwrap()
}

async fn filled(store: &Store, count: i64) -> ArrayProcessor<i64> {
    let array = ArrayProcessor::<i64>::create(store).await.unwrap();
    for value in 1..=count {
        array.add(store, value).await.unwrap();
    }
    array
}

// =============================================================================
// Chaining Tests
// =============================================================================

#[tokio::test]
async fn test_33rd_value_chains_a_second_node() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let array = filled(&store, ARRAY_CAPACITY as i64).await;

    let head: ArrayRecord<i64> = store.read_value(array.address()).await.unwrap();
    assert_eq!(head.next_address, 0);

    array.add(&store, 33).await.unwrap();

    let head: ArrayRecord<i64> = store.read_value(array.address()).await.unwrap();
    assert_ne!(head.next_address, 0);
    assert_eq!(head.length, 33);
    assert_eq!(head.first_address, array.address());

    let second: ArrayRecord<i64> = store.read_value(head.next_address).await.unwrap();
    assert_eq!(second.values[0], 33);
    assert_eq!(second.first_address, array.address());
    assert_eq!(second.next_address, 0);

    assert!(array.contains(&store, &33).await.unwrap());
    assert_eq!(array.len(&store).await.unwrap(), 33);
}

#[tokio::test]
async fn test_values_in_chain_order() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let array = filled(&store, 70).await;

    let values = array.values(&store).await.unwrap();
    assert_eq!(values, (1..=70).collect::<Vec<i64>>());
}

// =============================================================================
// Removal Tests
// =============================================================================

#[tokio::test]
async fn test_removed_slot_is_reused() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let array = filled(&store, 40).await;

    assert!(array.remove(&store, &5).await.unwrap());
    assert!(!array.remove(&store, &5).await.unwrap());
    assert!(!array.contains(&store, &5).await.unwrap());
    assert_eq!(array.len(&store).await.unwrap(), 39);

    array.add(&store, 500).await.unwrap();

    // The hole in the head node is filled before the chain grows
    let head: ArrayRecord<i64> = store.read_value(array.address()).await.unwrap();
    assert_eq!(head.values[4], 500);
    assert_eq!(array.len(&store).await.unwrap(), 40);
}

#[tokio::test]
async fn test_remove_only_first_match() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let array = ArrayProcessor::<i64>::create(&store).await.unwrap();

    array.add(&store, 7).await.unwrap();
    array.add(&store, 7).await.unwrap();

    assert!(array.remove(&store, &7).await.unwrap());
    assert_eq!(array.values(&store).await.unwrap(), vec![7]);
}

// =============================================================================
// Matcher Tests
// =============================================================================

#[tokio::test]
async fn test_find_remove_replace_with_matchers() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let array = filled(&store, 50).await;

    let over_forty = FnMatcher(|v: &i64| *v > 40);
    assert_eq!(array.try_find(&store, &over_forty).await.unwrap(), Some(41));

    let even_over_forty = FnMatcher(|v: &i64| *v > 40 && v % 2 == 0);
    assert_eq!(
        array.remove_with(&store, &even_over_forty).await.unwrap(),
        Some(42)
    );

    let is_ten = FnMatcher(|v: &i64| *v == 10);
    assert!(array.replace_with(&store, &is_ten, 1000).await.unwrap());
    assert!(array.contains(&store, &1000).await.unwrap());
    assert!(!array.contains(&store, &10).await.unwrap());

    let none = FnMatcher(|v: &i64| *v < 0);
    assert!(!array.replace_with(&store, &none, 1).await.unwrap());
    assert_eq!(array.remove_with(&store, &none).await.unwrap(), None);
}

#[tokio::test]
async fn test_empty_value_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let array = filled(&store, 1).await;

    assert!(matches!(
        array.add(&store, 0).await,
        Err(StoreError::EmptyValue)
    ));

    let any = FnMatcher(|_: &i64| true);
    assert!(matches!(
        array.replace_with(&store, &any, 0).await,
        Err(StoreError::EmptyValue)
    ));
    assert_eq!(array.len(&store).await.unwrap(), 1);
}

#[tokio::test]
async fn test_destroy_releases_nodes() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let array = filled(&store, 65).await;
    let head = array.address();

    array.destroy(&store).await.unwrap();

    let again = ArrayProcessor::<i64>::create(&store).await.unwrap();
    assert_eq!(again.address(), head);
    assert!(again.is_empty(&store).await.unwrap());
}
