//! Value and key codecs
//!
//! Every type stored in a record implements `Value`: a compile-time size,
//! explicit encode/decode, and an "empty" state used to mark free slots.
//! Types usable as dictionary keys also implement `Key`, whose hash and
//! equality may need to read the store (e.g. interned strings).

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::hash;
use crate::store::Store;
use crate::strings;

/// Fixed-size binary codec
pub trait Value: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Encoded size in bytes
    const SIZE: usize;

    /// Encode into `buf[..Self::SIZE]`
    fn encode(&self, buf: &mut [u8]);

    /// Decode from `buf[..Self::SIZE]`
    fn decode(buf: &[u8]) -> Self;

    /// The value that marks an unused slot
    fn empty() -> Self;

    fn is_empty(&self) -> bool;

    /// Encode into a fresh vector
    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; Self::SIZE];
        self.encode(&mut buf);
        buf
    }
}

/// A value usable as a hashed key
#[async_trait]
pub trait Key: Value {
    /// Stable 64-bit hash of the key's content
    async fn hash_code(&self, store: &Store) -> Result<u64>;

    /// Full equality, checked after a hash match
    async fn key_equals(&self, other: &Self, store: &Store) -> Result<bool>;
}

/// Copy the first `N` bytes of `buf` into an array
pub(crate) fn take<const N: usize>(buf: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[..N]);
    out
}

// =============================================================================
// Scalars
// =============================================================================

macro_rules! scalar_value {
    ($($ty:ty),* $(,)?) => {$(
        impl Value for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            fn encode(&self, buf: &mut [u8]) {
                buf[..Self::SIZE].copy_from_slice(&self.to_ne_bytes());
            }

            fn decode(buf: &[u8]) -> Self {
                <$ty>::from_ne_bytes(take(buf))
            }

            fn empty() -> Self {
                0 as $ty
            }

            fn is_empty(&self) -> bool {
                self.to_ne_bytes().iter().all(|b| *b == 0)
            }
        }

        #[async_trait]
        impl Key for $ty {
            async fn hash_code(&self, _store: &Store) -> Result<u64> {
                Ok(hash::hash_bytes(&self.to_ne_bytes()))
            }

            // Bitwise, so it agrees with the hash (and NaN finds itself)
            async fn key_equals(&self, other: &Self, _store: &Store) -> Result<bool> {
                Ok(self.to_ne_bytes() == other.to_ne_bytes())
            }
        }
    )*};
}

scalar_value!(i32, i64, u64, f64);

// =============================================================================
// Guid
// =============================================================================

/// 16-byte globally unique identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid([u8; 16]);

impl Guid {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl From<[u8; 16]> for Guid {
    fn from(bytes: [u8; 16]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Guid> for [u8; 16] {
    fn from(guid: Guid) -> Self {
        guid.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self)
    }
}

impl Value for Guid {
    const SIZE: usize = 16;

    fn encode(&self, buf: &mut [u8]) {
        buf[..16].copy_from_slice(&self.0);
    }

    fn decode(buf: &[u8]) -> Self {
        Self(take(buf))
    }

    fn empty() -> Self {
        Self::default()
    }

    fn is_empty(&self) -> bool {
        self.0 == [0u8; 16]
    }
}

#[async_trait]
impl Key for Guid {
    async fn hash_code(&self, _store: &Store) -> Result<u64> {
        Ok(hash::hash_bytes(&self.0))
    }

    async fn key_equals(&self, other: &Self, _store: &Store) -> Result<bool> {
        Ok(self == other)
    }
}

// =============================================================================
// StringRef
// =============================================================================

/// Address of an interned string
///
/// Hashes and compares by string content, so two references to equal
/// strings stored at different addresses are the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StringRef(i64);

impl StringRef {
    pub const fn new(address: i64) -> Self {
        Self(address)
    }

    pub fn address(&self) -> i64 {
        self.0
    }

    /// Materialize the referenced string
    pub async fn read(&self, store: &Store) -> Result<String> {
        if self.0 == 0 {
            return Ok(String::new());
        }
        strings::read_string(store, self.0).await
    }
}

impl From<i64> for StringRef {
    fn from(address: i64) -> Self {
        Self::new(address)
    }
}

impl Value for StringRef {
    const SIZE: usize = 8;

    fn encode(&self, buf: &mut [u8]) {
        self.0.encode(buf);
    }

    fn decode(buf: &[u8]) -> Self {
        Self(i64::decode(buf))
    }

    fn empty() -> Self {
        Self(0)
    }

    fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

#[async_trait]
impl Key for StringRef {
    async fn hash_code(&self, store: &Store) -> Result<u64> {
        Ok(hash::hash_str(&self.read(store).await?))
    }

    async fn key_equals(&self, other: &Self, store: &Store) -> Result<bool> {
        if self.0 == other.0 {
            return Ok(true);
        }
        Ok(self.read(store).await? == other.read(store).await?)
    }
}
