//! Table: a typed front-end over `ByteTable`.
//!
//! Keys and values are encoded with `FixedBytes` into small stack buffers
//! and handed to the untyped engine, which never learns the types.

use crate::byte_table::{ByteTable, ChainStats, SetOutcome, TableBuilder};
use crate::error::TableError;
use crate::fixed_bytes::FixedBytes;
use core::marker::PhantomData;
use smallvec::SmallVec;

// Encodings up to this size stay on the stack.
type Scratch = SmallVec<[u8; 32]>;

fn encode<T: FixedBytes>(x: &T) -> Scratch {
    let mut out = Scratch::from_elem(0, T::SIZE);
    x.write_bytes(&mut out);
    out
}

/// A thread-safe table from `K` to `V`, stored as fixed-size bytes.
///
/// Lookups return decoded copies rather than references, so no lock is held
/// once a method returns.
///
/// ```
/// use chunk_table::Table;
///
/// let table: Table<i32, i32> = Table::new().unwrap();
/// table.set(&7, &-7).unwrap();
/// assert_eq!(table.get(&7), Some(-7));
/// assert_eq!(table.get(&8), None);
/// assert_eq!(table.free(), 1);
/// ```
pub struct Table<K, V> {
    raw: ByteTable,
    _types: PhantomData<fn(K, V) -> (K, V)>,
}

impl<K, V> Table<K, V>
where
    K: FixedBytes,
    V: FixedBytes,
{
    pub fn new() -> Result<Self, TableError> {
        Self::builder().build()?.try_into()
    }

    pub fn with_directory_size(directory_size: usize) -> Result<Self, TableError> {
        Self::builder()
            .directory_size(directory_size)
            .build()?
            .try_into()
    }

    /// A `TableBuilder` preset with the encoded sizes of `K` and `V`.
    pub fn builder() -> TableBuilder {
        TableBuilder::new(K::SIZE, V::SIZE)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.raw.lookup(&encode(key)).map(|v| V::from_bytes(&v))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.raw.lookup(&encode(key)).is_some()
    }

    /// Inserts `key` or overwrites its value.
    pub fn set(&self, key: &K, value: &V) -> Result<SetOutcome, TableError> {
        self.raw.upsert(&encode(key), &encode(value))
    }

    /// Rewrites the value of `key` in place under one exclusive lock.
    ///
    /// Returns the new value, or `None` if the key is absent.
    ///
    /// `f` runs with the table locked. Calling back into the same table from
    /// `f` would deadlock; debug builds panic instead.
    pub fn update<F>(&self, key: &K, f: F) -> Option<V>
    where
        F: FnOnce(V) -> V,
    {
        let mut stored = self.raw.lookup_mut(&encode(key))?;
        let next = {
            let _g = self.raw.enter_closure();
            f(V::from_bytes(&stored))
        };
        next.write_bytes(&mut stored);
        Some(next)
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn load_factor(&self) -> f64 {
        self.raw.load_factor()
    }

    pub fn chain_stats(&self) -> ChainStats {
        self.raw.chain_stats()
    }

    /// The untyped engine underneath.
    pub fn as_bytes(&self) -> &ByteTable {
        &self.raw
    }

    /// Tears the table down and returns how many entries it held.
    pub fn free(self) -> usize {
        self.raw.free()
    }
}

impl<K, V> TryFrom<ByteTable> for Table<K, V>
where
    K: FixedBytes,
    V: FixedBytes,
{
    type Error = TableError;

    /// Adopts a `ByteTable` whose sizes match the encodings of `K` and `V`.
    fn try_from(raw: ByteTable) -> Result<Self, Self::Error> {
        if raw.key_size() != K::SIZE {
            return Err(TableError::KeySize {
                expected: raw.key_size(),
                got: K::SIZE,
            });
        }
        if raw.value_size() != V::SIZE {
            return Err(TableError::ValueSize {
                expected: raw.value_size(),
                got: V::SIZE,
            });
        }
        Ok(Self {
            raw,
            _types: PhantomData,
        })
    }
}

impl<K, V> core::fmt::Debug for Table<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Table").field(&self.raw).finish()
    }
}
