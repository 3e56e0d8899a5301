//! Tests for the interned string set
//!
//! These tests verify:
//! - Interning the same text twice shares one address and counts owners
//! - Releasing every owner removes the string
//! - Borrowed placeholders do not count as owners
//! - Multi-chunk, empty and non-ASCII strings read back intact

use std::sync::Arc;

use slotdb::codec::{StringRecord, STRING_CHUNK_SIZE};
use slotdb::{Config, Store, StringHashSet, StringRef};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

async fn setup() -> (TempDir, Arc<Store>, StringHashSet) {
    let dir = TempDir::new().unwrap();
    let config = Config::builder()
        .path(dir.path().join("strings.dat"))
        .block_size(8192)
        .truncate(true)
        .build();
    let store = Store::open(config).await.unwrap();
    let strings = StringHashSet::create(&store).await.unwrap();
    (dir, store, strings)
}

// =============================================================================
// Reference Counting Tests
// =============================================================================

#[tokio::test]
async fn test_interning_counts_owners() {
    let (_dir, store, strings) = setup().await;

    let a = strings.new_string(&store, "x").await.unwrap();
    let b = strings.new_string(&store, "x").await.unwrap();

    assert_eq!(a, b);
    assert_eq!(strings.reference_count(&store, a).await.unwrap(), 2);
    assert_eq!(strings.len(&store).await.unwrap(), 1);

    assert!(!strings.release(&store, a).await.unwrap());
    assert_eq!(strings.reference_count(&store, a).await.unwrap(), 1);
    assert!(strings.release(&store, a).await.unwrap());

    assert_eq!(strings.find(&store, "x").await.unwrap(), None);
    assert!(strings.is_empty(&store).await.unwrap());

    let fresh = strings.new_string(&store, "x").await.unwrap();
    assert_eq!(strings.reference_count(&store, fresh).await.unwrap(), 1);
    assert_eq!(strings.read(&store, fresh).await.unwrap(), "x");
}

#[tokio::test]
async fn test_increase_adds_an_owner() {
    let (_dir, store, strings) = setup().await;

    let a = strings.new_string(&store, "shared").await.unwrap();
    assert_eq!(strings.increase(&store, a).await.unwrap(), 2);

    assert!(!strings.release(&store, a).await.unwrap());
    assert!(strings.release(&store, a).await.unwrap());
    assert_eq!(strings.find(&store, "shared").await.unwrap(), None);
}

#[tokio::test]
async fn test_borrow_does_not_own() {
    let (_dir, store, strings) = setup().await;

    // A miss creates a placeholder with no owners
    let placeholder = strings.borrow(&store, "temp").await.unwrap();
    assert_eq!(strings.reference_count(&store, placeholder).await.unwrap(), 0);
    assert_eq!(strings.find(&store, "temp").await.unwrap(), Some(placeholder));

    // A hit leaves the count alone
    let owned = strings.new_string(&store, "kept").await.unwrap();
    let borrowed = strings.borrow(&store, "kept").await.unwrap();
    assert_eq!(owned, borrowed);
    assert_eq!(strings.reference_count(&store, owned).await.unwrap(), 1);

    // Releasing a placeholder removes it
    assert!(strings.release(&store, placeholder).await.unwrap());
    assert_eq!(strings.find(&store, "temp").await.unwrap(), None);
}

#[tokio::test]
async fn test_distinct_strings_get_distinct_addresses() {
    let (_dir, store, strings) = setup().await;

    let mut addresses = Vec::new();
    for i in 0..100 {
        addresses.push(strings.new_string(&store, &format!("s{}", i)).await.unwrap());
    }
    addresses.sort();
    addresses.dedup();
    assert_eq!(addresses.len(), 100);

    for i in 0..100 {
        let text = format!("s{}", i);
        let address = strings.find(&store, &text).await.unwrap().unwrap();
        assert_eq!(strings.read(&store, address).await.unwrap(), text);
    }
}

// =============================================================================
// Chunking Tests
// =============================================================================

#[tokio::test]
async fn test_long_string_spans_chunks() {
    let (_dir, store, strings) = setup().await;
    let text: String = (0..600).map(|i| char::from(b'a' + (i % 26) as u8)).collect();

    let address = strings.new_string(&store, &text).await.unwrap();
    assert_eq!(strings.read(&store, address).await.unwrap(), text);

    let first: StringRecord = store.read_value(address).await.unwrap();
    assert_eq!(first.length, 600);
    assert_eq!(&first.value[..], &text.as_bytes()[..STRING_CHUNK_SIZE]);

    let second: StringRecord = store.read_value(first.next_record_address).await.unwrap();
    let third: StringRecord = store.read_value(second.next_record_address).await.unwrap();
    assert_eq!(third.next_record_address, 0);
    assert_eq!(&third.value[..600 - 2 * STRING_CHUNK_SIZE], &text.as_bytes()[512..]);
}

#[tokio::test]
async fn test_exact_chunk_boundary() {
    let (_dir, store, strings) = setup().await;
    let text = "b".repeat(STRING_CHUNK_SIZE);

    let address = strings.new_string(&store, &text).await.unwrap();
    let first: StringRecord = store.read_value(address).await.unwrap();

    assert_eq!(first.next_record_address, 0);
    assert_eq!(strings.read(&store, address).await.unwrap(), text);
}

#[tokio::test]
async fn test_empty_and_unicode_strings() {
    let (_dir, store, strings) = setup().await;

    let empty = strings.new_string(&store, "").await.unwrap();
    assert_eq!(strings.read(&store, empty).await.unwrap(), "");

    let unicode = "héllo wörld ✓ 日本語";
    let address = strings.new_string(&store, unicode).await.unwrap();
    assert_eq!(StringRef::new(address).read(&store).await.unwrap(), unicode);
    assert_eq!(StringRef::new(0).read(&store).await.unwrap(), "");
}

#[tokio::test]
async fn test_release_frees_every_chunk() {
    let (_dir, store, strings) = setup().await;
    let text = "z".repeat(3 * STRING_CHUNK_SIZE);

    let address = strings.new_string(&store, &text).await.unwrap();
    assert!(strings.release(&store, address).await.unwrap());

    // Freed slots come back lowest first, so the same text lands in place
    let again = strings.new_string(&store, &text).await.unwrap();
    assert_eq!(again, address);
    assert_eq!(strings.read(&store, again).await.unwrap(), text);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_interning() {
    let (_dir, store, strings) = setup().await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            strings.new_string(&store, "contended").await.unwrap()
        }));
    }

    let mut addresses = Vec::new();
    for handle in handles {
        addresses.push(handle.await.unwrap());
    }

    assert!(addresses.iter().all(|a| *a == addresses[0]));
    assert_eq!(
        strings.reference_count(&store, addresses[0]).await.unwrap(),
        8
    );
}
