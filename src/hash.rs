//! Hash Service
//!
//! Stable 64-bit content hashes (xxh3). The same input hashes to the same
//! value in every process on every run, which the on-disk hash tries rely on.
//!
//! A hash of exactly zero collides with the empty-node marker of the hash
//! trie. Nothing here remaps it; see `HashTable::add`.

use xxhash_rust::xxh3::xxh3_64;

use crate::codec::ScalarValue;
use crate::error::Result;
use crate::store::Store;

/// Hash raw bytes
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    xxh3_64(bytes)
}

/// Hash a string by its UTF-8 bytes
pub fn hash_str(s: &str) -> u64 {
    hash_bytes(s.as_bytes())
}

/// Fold a structure address and a key hash into one lock-pool key
///
/// Lets every structure serialize work per key through a single shared
/// pool without two structures' keys contending.
pub fn scoped_key(scope: i64, hash: u64) -> i64 {
    let mut buf = [0u8; 16];
    buf[..8].copy_from_slice(&scope.to_ne_bytes());
    buf[8..].copy_from_slice(&hash.to_ne_bytes());
    hash_bytes(&buf) as i64
}

/// Hash a run-time typed scalar (strings are dereferenced first)
pub async fn hash_scalar(value: &ScalarValue, store: &Store) -> Result<u64> {
    value.hash_code(store).await
}
