//! Tests for the dictionary family
//!
//! These tests verify:
//! - Dictionary set/get/overwrite/remove identity
//! - Keys with identical hashes but different content stay distinct
//! - String keys compare by content, not by address
//! - DictionaryArray and DictionaryHashSet one-to-many semantics
//! - FieldIndex dispatch and type mismatch

use std::sync::Arc;

use async_trait::async_trait;
use slotdb::codec::{InterfaceRecord, Key, Value};
use slotdb::table::FnMatcher;
use slotdb::{
    Config, Dictionary, DictionaryArray, DictionaryHashSet, FieldIndex, FieldType, Guid,
    ScalarValue, Store, StoreError, StringHashSet, StringRef,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

async fn open_store(dir: &TempDir) -> Arc<Store> {
    let config = Config::builder()
        .path(dir.path().join("dictionary.dat"))
        .block_size(16 * 1024)
        .truncate(true)
        .build();
    Store::open(config).await.unwrap()
}

/// A key whose hash ignores its content
#[derive(Debug, Clone, Copy, PartialEq)]
struct Colliding(i64);

impl Value for Colliding {
    const SIZE: usize = 8;

    fn encode(&self, buf: &mut [u8]) {
        self.0.encode(buf);
    }

    fn decode(buf: &[u8]) -> Self {
        Colliding(i64::decode(buf))
    }

    fn empty() -> Self {
        Colliding(0)
    }

    fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

#[async_trait]
impl Key for Colliding {
    async fn hash_code(&self, _store: &Store) -> slotdb::Result<u64> {
        Ok(0xDEAD_BEEF)
    }

    async fn key_equals(&self, other: &Self, _store: &Store) -> slotdb::Result<bool> {
        Ok(self.0 == other.0)
    }
}

// =============================================================================
// Dictionary Tests
// =============================================================================

#[tokio::test]
async fn test_set_get_overwrite_remove() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let dict = Dictionary::<i32>::create(&store).await.unwrap();

    dict.set(&store, &7, 100).await.unwrap();
    assert_eq!(dict.get(&store, &7).await.unwrap(), Some(100));

    dict.set(&store, &7, 200).await.unwrap();
    assert_eq!(dict.get(&store, &7).await.unwrap(), Some(200));
    assert_eq!(dict.len(&store).await.unwrap(), 1);

    assert_eq!(dict.remove_key(&store, &7).await.unwrap(), Some(200));
    assert!(!dict.contains_key(&store, &7).await.unwrap());
    assert_eq!(dict.remove_key(&store, &7).await.unwrap(), None);
    assert!(dict.is_empty(&store).await.unwrap());
}

#[tokio::test]
async fn test_many_keys() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let dict = Dictionary::<i64>::create(&store).await.unwrap();

    for key in -200..200i64 {
        dict.set(&store, &key, key * 3).await.unwrap();
    }
    for key in -200..200i64 {
        assert_eq!(dict.get(&store, &key).await.unwrap(), Some(key * 3));
    }

    let mut keys = dict.keys(&store).await.unwrap();
    keys.sort();
    assert_eq!(keys, (-200..200).collect::<Vec<i64>>());

    let mut entries = dict.entries(&store).await.unwrap();
    entries.sort();
    assert_eq!(entries[0], (-200, -600));
}

#[tokio::test]
async fn test_boundary_keys() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let dict = Dictionary::<i64>::create(&store).await.unwrap();

    for key in [0i64, 1, -1, i64::MAX, i64::MIN] {
        dict.set(&store, &key, key).await.unwrap();
    }
    for key in [0i64, 1, -1, i64::MAX, i64::MIN] {
        assert_eq!(dict.get(&store, &key).await.unwrap(), Some(key));
    }
}

#[tokio::test]
async fn test_colliding_keys_stay_distinct() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let dict = Dictionary::<Colliding>::create(&store).await.unwrap();

    for key in 1..=40i64 {
        dict.set(&store, &Colliding(key), key * 10).await.unwrap();
    }
    for key in 1..=40i64 {
        assert_eq!(
            dict.get(&store, &Colliding(key)).await.unwrap(),
            Some(key * 10)
        );
    }

    assert_eq!(dict.remove_key(&store, &Colliding(1)).await.unwrap(), Some(10));
    assert_eq!(dict.remove_key(&store, &Colliding(25)).await.unwrap(), Some(250));
    assert!(!dict.contains_key(&store, &Colliding(1)).await.unwrap());
    assert!(!dict.contains_key(&store, &Colliding(25)).await.unwrap());
    assert_eq!(dict.get(&store, &Colliding(2)).await.unwrap(), Some(20));
    assert_eq!(dict.get(&store, &Colliding(26)).await.unwrap(), Some(260));
    assert_eq!(dict.len(&store).await.unwrap(), 38);
}

#[tokio::test]
async fn test_string_keys_compare_by_content() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    // Two sets intern the same text at two different addresses
    let first = StringHashSet::create(&store).await.unwrap();
    let second = StringHashSet::create(&store).await.unwrap();
    let a = StringRef::new(first.new_string(&store, "alpha").await.unwrap());
    let b = StringRef::new(second.new_string(&store, "alpha").await.unwrap());
    assert_ne!(a, b);

    let dict = Dictionary::<StringRef>::create(&store).await.unwrap();
    dict.set(&store, &a, 1).await.unwrap();
    assert_eq!(dict.get(&store, &b).await.unwrap(), Some(1));

    dict.set(&store, &b, 2).await.unwrap();
    assert_eq!(dict.len(&store).await.unwrap(), 1);
    assert_eq!(dict.get(&store, &a).await.unwrap(), Some(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sets_of_one_key() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let dict = Dictionary::<i32>::create(&store).await.unwrap();

    let mut handles = Vec::new();
    for task in 0..8i64 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            for i in 0..20i64 {
                dict.set(&store, &42, task * 100 + i).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(dict.len(&store).await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_lookups_never_see_a_reused_record() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let dict = Dictionary::<Colliding>::create(&store).await.unwrap();

    // Both keys share one hash, so their records churn through the same slots
    let mut writers = Vec::new();
    for key in [1i64, 2] {
        let store = Arc::clone(&store);
        writers.push(tokio::spawn(async move {
            for i in 0..200i64 {
                dict.set(&store, &Colliding(key), key * 1000 + i % 10).await.unwrap();
                dict.remove_key(&store, &Colliding(key)).await.unwrap();
            }
        }));
    }

    let reader = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for _ in 0..400 {
                if let Some(value) = dict.get(&store, &Colliding(1)).await.unwrap() {
                    assert_eq!(value / 1000, 1, "key 1 returned {}", value);
                }
            }
        })
    };

    for writer in writers {
        writer.await.unwrap();
    }
    reader.await.unwrap();
    assert!(dict.is_empty(&store).await.unwrap());
}

// =============================================================================
// DictionaryArray Tests
// =============================================================================

#[tokio::test]
async fn test_dictionary_array_lists() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let lists = DictionaryArray::<i32, i64>::create(&store).await.unwrap();

    assert!(lists.get(&store, &1).await.unwrap().is_empty());
    assert!(!lists.contains_key(&store, &1).await.unwrap());

    for value in 1..=40i64 {
        lists.add(&store, &1, value).await.unwrap();
    }
    lists.add(&store, &2, 7).await.unwrap();
    lists.add(&store, &2, 7).await.unwrap();

    assert_eq!(lists.get(&store, &1).await.unwrap().len(), 40);
    assert!(lists.contains(&store, &1, &40).await.unwrap());
    assert_eq!(lists.get(&store, &2).await.unwrap(), vec![7, 7]);
    assert_eq!(lists.len(&store).await.unwrap(), 2);

    let over_thirty = FnMatcher(|v: &i64| *v > 30);
    assert_eq!(lists.find(&store, &1, &over_thirty).await.unwrap(), Some(31));

    assert!(lists.remove(&store, &2, &7).await.unwrap());
    assert_eq!(lists.get(&store, &2).await.unwrap(), vec![7]);

    assert!(lists.remove_key(&store, &1).await.unwrap());
    assert!(!lists.remove_key(&store, &1).await.unwrap());
    assert!(lists.get(&store, &1).await.unwrap().is_empty());
    assert_eq!(lists.keys(&store).await.unwrap(), vec![2]);
}

// =============================================================================
// DictionaryHashSet Tests
// =============================================================================

#[tokio::test]
async fn test_dictionary_hash_set_membership() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let sets = DictionaryHashSet::<i64, Guid>::create(&store).await.unwrap();

    let g1 = Guid::from_bytes([1; 16]);
    let g2 = Guid::from_bytes([2; 16]);

    assert!(sets.add(&store, &10, g1).await.unwrap());
    assert!(!sets.add(&store, &10, g1).await.unwrap());
    assert!(sets.add(&store, &10, g2).await.unwrap());
    assert!(sets.add(&store, &20, g1).await.unwrap());

    assert!(sets.contains(&store, &10, &g2).await.unwrap());
    assert!(!sets.contains(&store, &20, &g2).await.unwrap());
    assert!(!sets.contains(&store, &30, &g1).await.unwrap());

    let mut members = sets.values(&store, &10).await.unwrap();
    members.sort_by_key(|g| *g.as_bytes());
    assert_eq!(members, vec![g1, g2]);

    assert!(sets.remove(&store, &10, &g1).await.unwrap());
    assert!(!sets.remove(&store, &10, &g1).await.unwrap());
    assert_eq!(sets.values(&store, &10).await.unwrap(), vec![g2]);

    assert!(sets.remove_key(&store, &20).await.unwrap());
    assert!(sets.values(&store, &20).await.unwrap().is_empty());
    assert_eq!(sets.keys(&store).await.unwrap(), vec![10]);
}

// =============================================================================
// FieldIndex Tests
// =============================================================================

#[tokio::test]
async fn test_field_index_dispatch() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let samples = [
        ScalarValue::Int32(-5),
        ScalarValue::Int64(i64::MAX),
        ScalarValue::UInt64(u64::MAX),
        ScalarValue::Float64(2.5),
        ScalarValue::Guid(Guid::from_bytes([9; 16])),
    ];

    for (i, key) in samples.iter().enumerate() {
        let index = FieldIndex::create(&store, key.field_type()).await.unwrap();
        assert_eq!(index.field_type(), key.field_type());

        index.set(&store, key, i as i64 + 1).await.unwrap();
        assert_eq!(index.get(&store, key).await.unwrap(), Some(i as i64 + 1));
        assert!(index.contains_key(&store, key).await.unwrap());
        assert_eq!(index.entries(&store).await.unwrap(), vec![(*key, i as i64 + 1)]);

        assert_eq!(index.remove_key(&store, key).await.unwrap(), Some(i as i64 + 1));
        assert!(index.is_empty(&store).await.unwrap());
    }
}

#[tokio::test]
async fn test_field_index_string_keys() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let strings = StringHashSet::create(&store).await.unwrap();

    let index = FieldIndex::create(&store, FieldType::String).await.unwrap();
    let key = ScalarValue::String(StringRef::new(
        strings.new_string(&store, "region").await.unwrap(),
    ));

    index.set(&store, &key, 77).await.unwrap();
    assert_eq!(index.get(&store, &key).await.unwrap(), Some(77));
}

#[tokio::test]
async fn test_field_index_rejects_other_kinds() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let index = FieldIndex::create(&store, FieldType::Int32).await.unwrap();

    let result = index.set(&store, &ScalarValue::Int64(7), 1).await;
    match result {
        Err(StoreError::FieldTypeMismatch { expected, actual }) => {
            assert_eq!(expected, FieldType::Int32);
            assert_eq!(actual, FieldType::Int64);
        }
        other => panic!("expected field type mismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_field_index_reopens_from_interface_record() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let index = FieldIndex::create(&store, FieldType::UInt64).await.unwrap();
    index.set(&store, &ScalarValue::UInt64(3), 33).await.unwrap();

    let pointer = store.allocate_value(&index.to_interface()).await.unwrap();
    let record: InterfaceRecord = store.read_value(pointer).await.unwrap();
    let reopened = FieldIndex::from_interface(&record).unwrap();

    assert_eq!(reopened.field_type(), FieldType::UInt64);
    assert_eq!(
        reopened.get(&store, &ScalarValue::UInt64(3)).await.unwrap(),
        Some(33)
    );

    let bogus = InterfaceRecord {
        field_type: 99,
        address: index.address(),
    };
    assert!(matches!(
        FieldIndex::from_interface(&bogus),
        Err(StoreError::Corruption(_))
    ));
}
