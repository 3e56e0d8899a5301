//! Record layouts
//!
//! Structs whose encodings are the on-disk format. Field order and widths
//! are part of the file format and must not change.

use super::scalar::FieldType;
use super::value::{take, Value};

/// Children per hash trie level
pub const HASH_FANOUT: usize = 64;

/// Value slots per array record
pub const ARRAY_CAPACITY: usize = 32;

/// Payload bytes per string chunk
pub const STRING_CHUNK_SIZE: usize = 256;

// =============================================================================
// Hash Table Records
// =============================================================================

/// One slot of the hash trie
#[derive(Debug, Clone, PartialEq)]
pub struct HashNode<T: Value> {
    /// Full 64-bit hash; zero marks an empty node
    pub hash_code: u64,
    pub value: T,
    /// Child HashRecord for the next 6-bit slice, or 0
    pub next_record_address: i64,
    /// Overflow array for keys that exhaust the hash slices, or 0
    pub array_record_address: i64,
}

impl<T: Value> Value for HashNode<T> {
    const SIZE: usize = 8 + T::SIZE + 8 + 8;

    fn encode(&self, buf: &mut [u8]) {
        self.hash_code.encode(&mut buf[0..8]);
        self.value.encode(&mut buf[8..8 + T::SIZE]);
        let rest = 8 + T::SIZE;
        self.next_record_address.encode(&mut buf[rest..rest + 8]);
        self.array_record_address
            .encode(&mut buf[rest + 8..rest + 16]);
    }

    fn decode(buf: &[u8]) -> Self {
        let rest = 8 + T::SIZE;
        Self {
            hash_code: u64::decode(&buf[0..8]),
            value: T::decode(&buf[8..rest]),
            next_record_address: i64::decode(&buf[rest..rest + 8]),
            array_record_address: i64::decode(&buf[rest + 8..rest + 16]),
        }
    }

    fn empty() -> Self {
        Self {
            hash_code: 0,
            value: T::empty(),
            next_record_address: 0,
            array_record_address: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.hash_code == 0
    }
}

/// 64 contiguous hash nodes: one trie level, or a table's entry block
#[derive(Debug, Clone, PartialEq)]
pub struct HashRecord<T: Value> {
    pub nodes: Vec<HashNode<T>>,
}

impl<T: Value> HashRecord<T> {
    /// Address of node `slot` inside the record at `record_address`
    pub fn node_address(record_address: i64, slot: usize) -> i64 {
        record_address + (slot * HashNode::<T>::SIZE) as i64
    }
}

impl<T: Value> Value for HashRecord<T> {
    const SIZE: usize = HASH_FANOUT * HashNode::<T>::SIZE;

    fn encode(&self, buf: &mut [u8]) {
        for (i, node) in self.nodes.iter().enumerate().take(HASH_FANOUT) {
            let start = i * HashNode::<T>::SIZE;
            node.encode(&mut buf[start..start + HashNode::<T>::SIZE]);
        }
    }

    fn decode(buf: &[u8]) -> Self {
        let nodes = buf[..Self::SIZE]
            .chunks_exact(HashNode::<T>::SIZE)
            .map(HashNode::<T>::decode)
            .collect();
        Self { nodes }
    }

    fn empty() -> Self {
        Self {
            nodes: vec![HashNode::empty(); HASH_FANOUT],
        }
    }

    fn is_empty(&self) -> bool {
        self.nodes.iter().all(|n| {
            n.is_empty() && n.next_record_address == 0 && n.array_record_address == 0
        })
    }
}

/// Element of a node's overflow array
#[derive(Debug, Clone, PartialEq)]
pub struct HashEntry<T: Value> {
    pub hash_code: u64,
    pub value: T,
}

impl<T: Value> Value for HashEntry<T> {
    const SIZE: usize = 8 + T::SIZE;

    fn encode(&self, buf: &mut [u8]) {
        self.hash_code.encode(&mut buf[0..8]);
        self.value.encode(&mut buf[8..8 + T::SIZE]);
    }

    fn decode(buf: &[u8]) -> Self {
        Self {
            hash_code: u64::decode(&buf[0..8]),
            value: T::decode(&buf[8..8 + T::SIZE]),
        }
    }

    fn empty() -> Self {
        Self {
            hash_code: 0,
            value: T::empty(),
        }
    }

    fn is_empty(&self) -> bool {
        self.hash_code == 0
    }
}

// =============================================================================
// Array Record
// =============================================================================

/// One node of a singly linked list of fixed-capacity value arrays
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayRecord<T: Value> {
    /// Element count of the whole list; only maintained on the head node
    pub length: i32,
    pub values: Vec<T>,
    /// Address of the head node of this list
    pub first_address: i64,
    /// Next node, or 0 at the end of the chain
    pub next_address: i64,
}

impl<T: Value> ArrayRecord<T> {
    /// A fresh, empty node belonging to the list headed at `first_address`
    pub fn new(first_address: i64) -> Self {
        Self {
            length: 0,
            values: vec![T::empty(); ARRAY_CAPACITY],
            first_address,
            next_address: 0,
        }
    }

    /// Index of the first free slot
    pub fn free_slot(&self) -> Option<usize> {
        self.values.iter().position(Value::is_empty)
    }
}

impl<T: Value> Value for ArrayRecord<T> {
    const SIZE: usize = 4 + ARRAY_CAPACITY * T::SIZE + 8 + 8;

    fn encode(&self, buf: &mut [u8]) {
        self.length.encode(&mut buf[0..4]);
        for (i, v) in self.values.iter().enumerate().take(ARRAY_CAPACITY) {
            let start = 4 + i * T::SIZE;
            v.encode(&mut buf[start..start + T::SIZE]);
        }
        let tail = 4 + ARRAY_CAPACITY * T::SIZE;
        self.first_address.encode(&mut buf[tail..tail + 8]);
        self.next_address.encode(&mut buf[tail + 8..tail + 16]);
    }

    fn decode(buf: &[u8]) -> Self {
        let tail = 4 + ARRAY_CAPACITY * T::SIZE;
        Self {
            length: i32::decode(&buf[0..4]),
            values: buf[4..tail].chunks_exact(T::SIZE).map(T::decode).collect(),
            first_address: i64::decode(&buf[tail..tail + 8]),
            next_address: i64::decode(&buf[tail + 8..tail + 16]),
        }
    }

    fn empty() -> Self {
        Self::new(0)
    }

    fn is_empty(&self) -> bool {
        self.length == 0 && self.values.iter().all(Value::is_empty)
    }
}

// =============================================================================
// String Record
// =============================================================================

/// One 256-byte chunk of an interned string
#[derive(Clone, PartialEq)]
pub struct StringRecord {
    /// Total byte length of the string; only meaningful on the first chunk
    pub length: i32,
    /// Owners of the string; only meaningful on the first chunk
    pub reference_count: i32,
    pub value: [u8; STRING_CHUNK_SIZE],
    pub next_record_address: i64,
}

impl std::fmt::Debug for StringRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringRecord")
            .field("length", &self.length)
            .field("reference_count", &self.reference_count)
            .field("value", &String::from_utf8_lossy(&self.value))
            .field("next_record_address", &self.next_record_address)
            .finish()
    }
}

impl Value for StringRecord {
    const SIZE: usize = 4 + 4 + STRING_CHUNK_SIZE + 8;

    fn encode(&self, buf: &mut [u8]) {
        self.length.encode(&mut buf[0..4]);
        self.reference_count.encode(&mut buf[4..8]);
        buf[8..8 + STRING_CHUNK_SIZE].copy_from_slice(&self.value);
        self.next_record_address
            .encode(&mut buf[8 + STRING_CHUNK_SIZE..Self::SIZE]);
    }

    fn decode(buf: &[u8]) -> Self {
        Self {
            length: i32::decode(&buf[0..4]),
            reference_count: i32::decode(&buf[4..8]),
            value: take(&buf[8..8 + STRING_CHUNK_SIZE]),
            next_record_address: i64::decode(&buf[8 + STRING_CHUNK_SIZE..Self::SIZE]),
        }
    }

    fn empty() -> Self {
        Self {
            length: 0,
            reference_count: 0,
            value: [0u8; STRING_CHUNK_SIZE],
            next_record_address: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.length == 0 && self.reference_count == 0 && self.next_record_address == 0
    }
}

// =============================================================================
// Key/Value and Interface Records
// =============================================================================

/// A serialized key paired with an address or plain value
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValueRecord<K: Value> {
    pub key: K,
    pub value: i64,
}

impl<K: Value> Value for KeyValueRecord<K> {
    const SIZE: usize = K::SIZE + 8;

    fn encode(&self, buf: &mut [u8]) {
        self.key.encode(&mut buf[0..K::SIZE]);
        self.value.encode(&mut buf[K::SIZE..K::SIZE + 8]);
    }

    fn decode(buf: &[u8]) -> Self {
        Self {
            key: K::decode(&buf[0..K::SIZE]),
            value: i64::decode(&buf[K::SIZE..K::SIZE + 8]),
        }
    }

    fn empty() -> Self {
        Self {
            key: K::empty(),
            value: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.key.is_empty() && self.value == 0
    }
}

/// A typed pointer: the address of a record plus the codec to read it with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterfaceRecord {
    /// Raw `FieldType` code; 0 when empty
    pub field_type: i32,
    pub address: i64,
}

impl InterfaceRecord {
    pub fn new(field_type: FieldType, address: i64) -> Self {
        Self {
            field_type: field_type.code(),
            address,
        }
    }

    /// Decoded field type, if the stored code is known
    pub fn kind(&self) -> Option<FieldType> {
        FieldType::from_code(self.field_type)
    }
}

impl Value for InterfaceRecord {
    const SIZE: usize = 4 + 8;

    fn encode(&self, buf: &mut [u8]) {
        self.field_type.encode(&mut buf[0..4]);
        self.address.encode(&mut buf[4..12]);
    }

    fn decode(buf: &[u8]) -> Self {
        Self {
            field_type: i32::decode(&buf[0..4]),
            address: i64::decode(&buf[4..12]),
        }
    }

    fn empty() -> Self {
        Self {
            field_type: 0,
            address: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.field_type == 0 && self.address == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(HashNode::<i64>::SIZE, 32);
        assert_eq!(HashRecord::<i64>::SIZE, 64 * 32);
        assert_eq!(HashEntry::<i64>::SIZE, 16);
        assert_eq!(ArrayRecord::<i32>::SIZE, 4 + 32 * 4 + 16);
        assert_eq!(StringRecord::SIZE, 272);
        assert_eq!(KeyValueRecord::<i32>::SIZE, 12);
        assert_eq!(InterfaceRecord::SIZE, 12);
    }

    #[test]
    fn test_hash_node_field_offsets() {
        let node = HashNode {
            hash_code: 0x0102_0304_0506_0708,
            value: -1i32,
            next_record_address: 4096,
            array_record_address: 8192,
        };
        let bytes = node.to_bytes();

        assert_eq!(&bytes[0..8], &0x0102_0304_0506_0708u64.to_ne_bytes());
        assert_eq!(&bytes[8..12], &(-1i32).to_ne_bytes());
        assert_eq!(&bytes[12..20], &4096i64.to_ne_bytes());
        assert_eq!(&bytes[20..28], &8192i64.to_ne_bytes());
    }

    #[test]
    fn test_array_record_free_slot() {
        let mut record = ArrayRecord::<i64>::new(64);
        assert_eq!(record.free_slot(), Some(0));

        for (i, v) in record.values.iter_mut().enumerate() {
            *v = i as i64 + 1;
        }
        assert_eq!(record.free_slot(), None);

        record.values[17] = 0;
        assert_eq!(record.free_slot(), Some(17));
    }
}
