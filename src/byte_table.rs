//! ByteTable: the untyped, thread-safe storage engine.

use crate::chunk::{Appended, Chain, SlotLayout};
use crate::error::TableError;
use crate::hash::fnv1a_32;
use crate::reentrancy::{DebugReentrancy, ReentrancyGuard};
use log::{debug, trace, warn};
use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

/// Buckets in the directory unless configured otherwise.
pub const DEFAULT_DIRECTORY_SIZE: usize = 0xFF;

/// Slots per chunk unless configured otherwise: one entry plus three spare.
pub const DEFAULT_CHUNK_CAPACITY: usize = 4;

/// Shared view of a stored value. The table cannot be mutated while it lives.
///
/// The guard holds the table's shared lock: calling `set` or `find_mut` on
/// the same table from the thread holding it deadlocks. Drop it first.
pub type ValueRef<'a> = MappedRwLockReadGuard<'a, [u8]>;

/// Exclusive view of a stored value, writable in place.
///
/// The guard holds the table's exclusive lock: any other call on the same
/// table from the thread holding it deadlocks.
pub type ValueMut<'a> = MappedRwLockWriteGuard<'a, [u8]>;

/// What `set` did with the key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetOutcome {
    /// The key was absent and a new slot now holds it.
    Inserted,
    /// The key was present and its value was overwritten.
    Updated,
}

/// Snapshot of how entries are spread across the directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChainStats {
    /// Buckets holding at least one chunk.
    pub occupied_buckets: usize,
    /// Chunks across all chains.
    pub chunks: usize,
    /// Chunks in the longest chain.
    pub longest_chain: usize,
}

/// Configuration for a [`ByteTable`].
///
/// ```
/// use chunk_table::TableBuilder;
///
/// let table = TableBuilder::new(4, 8)
///     .directory_size(1021)
///     .chunk_capacity(8)
///     .build()
///     .unwrap();
/// assert_eq!(table.directory_size(), 1021);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableBuilder {
    key_size: usize,
    value_size: usize,
    directory_size: usize,
    chunk_capacity: usize,
}

impl TableBuilder {
    /// Starts a configuration for keys and values of the given byte sizes.
    pub fn new(key_size: usize, value_size: usize) -> Self {
        Self {
            key_size,
            value_size,
            directory_size: DEFAULT_DIRECTORY_SIZE,
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
        }
    }

    /// Sets the number of buckets. It never changes afterwards: the table
    /// does not rehash, so an undersized directory degrades every lookup to a
    /// scan over long chains.
    pub fn directory_size(mut self, directory_size: usize) -> Self {
        self.directory_size = directory_size;
        self
    }

    /// Sets how many slots each chunk holds before a new one is linked.
    pub fn chunk_capacity(mut self, chunk_capacity: usize) -> Self {
        self.chunk_capacity = chunk_capacity;
        self
    }

    /// Validates the configuration and allocates the directory.
    pub fn build(self) -> Result<ByteTable, TableError> {
        if self.directory_size == 0 {
            return Err(TableError::ZeroDirectorySize);
        }
        if self.chunk_capacity == 0 {
            return Err(TableError::ZeroChunkCapacity);
        }

        let mut chains = Vec::new();
        chains
            .try_reserve_exact(self.directory_size)
            .map_err(|_| TableError::AllocationFailed {
                bytes: self
                    .directory_size
                    .saturating_mul(core::mem::size_of::<Chain>()),
            })?;
        chains.resize_with(self.directory_size, Chain::default);

        debug!(
            "created table: key_size={} value_size={} directory_size={} chunk_capacity={}",
            self.key_size, self.value_size, self.directory_size, self.chunk_capacity
        );

        Ok(ByteTable {
            layout: SlotLayout::new(self.key_size, self.value_size),
            directory_size: self.directory_size,
            chunk_capacity: self.chunk_capacity,
            directory: RwLock::new(chains.into_boxed_slice()),
            reentrancy: DebugReentrancy::new(),
        })
    }
}

/// A hash table of fixed-size byte keys to fixed-size byte values.
///
/// Every key is exactly `key_size()` bytes and every value exactly
/// `value_size()` bytes; buffers of any other length are rejected. Entries
/// are never removed individually; [`ByteTable::free`] tears the whole table
/// down and reports how many entries it held.
///
/// The table is `Send + Sync`. One reader/writer lock covers the directory
/// and every chain: `find`, `contains_key` and the statistics share it, while
/// `set` and `find_mut` hold it exclusively for their whole duration.
pub struct ByteTable {
    layout: SlotLayout,
    directory_size: usize,
    chunk_capacity: usize,
    directory: RwLock<Box<[Chain]>>,
    reentrancy: DebugReentrancy,
}

impl ByteTable {
    /// A table with the default directory size and chunk capacity.
    pub fn new(key_size: usize, value_size: usize) -> Result<Self, TableError> {
        TableBuilder::new(key_size, value_size).build()
    }

    /// A table with `directory_size` buckets.
    pub fn with_directory_size(
        key_size: usize,
        value_size: usize,
        directory_size: usize,
    ) -> Result<Self, TableError> {
        TableBuilder::new(key_size, value_size)
            .directory_size(directory_size)
            .build()
    }

    pub fn key_size(&self) -> usize {
        self.layout.key_size()
    }

    pub fn value_size(&self) -> usize {
        self.layout.value_size()
    }

    pub fn directory_size(&self) -> usize {
        self.directory_size
    }

    pub fn chunk_capacity(&self) -> usize {
        self.chunk_capacity
    }

    /// Looks `key` up under the shared lock.
    ///
    /// The lock is held until the returned guard is dropped.
    pub fn find(&self, key: &[u8]) -> Result<Option<ValueRef<'_>>, TableError> {
        self.check_key(key)?;
        Ok(self.lookup(key))
    }

    /// Looks `key` up under the exclusive lock, for in-place overwrites.
    ///
    /// The lock is held until the returned guard is dropped; calling back
    /// into the table meanwhile deadlocks.
    pub fn find_mut(&self, key: &[u8]) -> Result<Option<ValueMut<'_>>, TableError> {
        self.check_key(key)?;
        Ok(self.lookup_mut(key))
    }

    pub fn contains_key(&self, key: &[u8]) -> Result<bool, TableError> {
        self.check_key(key)?;
        Ok(self.lookup(key).is_some())
    }

    /// Inserts `key` or overwrites its value.
    ///
    /// Fails without touching the table if either buffer has the wrong
    /// length or a new chunk cannot be allocated.
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<SetOutcome, TableError> {
        self.check_key(key)?;
        self.check_value(value)?;
        self.upsert(key, value)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.reentrancy.check();
        self.directory.read().iter().map(Chain::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.reentrancy.check();
        self.directory.read().iter().all(Chain::is_empty)
    }

    /// Entries per bucket. The directory never grows, so this only rises.
    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.directory_size as f64
    }

    pub fn chain_stats(&self) -> ChainStats {
        self.reentrancy.check();
        let directory = self.directory.read();
        directory
            .iter()
            .filter(|chain| !chain.is_empty())
            .fold(ChainStats::default(), |mut stats, chain| {
                let chunks = chain.chunks().count();
                stats.occupied_buckets += 1;
                stats.chunks += chunks;
                stats.longest_chain = stats.longest_chain.max(chunks);
                stats
            })
    }

    /// Tears the table down and returns how many entries it held.
    ///
    /// Taking `self` by value rules out concurrent access during teardown; a
    /// table shared through an `Arc` must be reclaimed with
    /// `Arc::try_unwrap` first.
    pub fn free(self) -> usize {
        let mut chains = self.directory.into_inner();
        let (slots, chunks) = chains.iter_mut().fold((0, 0), |(slots, chunks), chain| {
            let released = chain.release();
            (slots + released.slots, chunks + released.chunks)
        });
        debug!("freed table: {} elements in {} chunks", slots, chunks);
        slots
    }

    // Internal: callers have already checked buffer lengths.

    #[inline]
    fn bucket_index(&self, hash: u32) -> usize {
        hash as usize % self.directory_size
    }

    pub(crate) fn lookup(&self, key: &[u8]) -> Option<ValueRef<'_>> {
        let hash = fnv1a_32(key);
        let layout = &self.layout;
        let index = self.bucket_index(hash);
        self.reentrancy.check();
        let directory = self.directory.read();
        RwLockReadGuard::try_map(directory, |chains| chains[index].value(layout, hash, key)).ok()
    }

    pub(crate) fn lookup_mut(&self, key: &[u8]) -> Option<ValueMut<'_>> {
        let hash = fnv1a_32(key);
        let layout = &self.layout;
        let index = self.bucket_index(hash);
        self.reentrancy.check();
        let directory = self.directory.write();
        RwLockWriteGuard::try_map(directory, |chains| {
            chains[index].value_mut(layout, hash, key)
        })
        .ok()
    }

    pub(crate) fn upsert(&self, key: &[u8], value: &[u8]) -> Result<SetOutcome, TableError> {
        let hash = fnv1a_32(key);
        let index = self.bucket_index(hash);
        self.reentrancy.check();
        let mut directory = self.directory.write();
        let chain = &mut directory[index];

        if let Some(stored) = chain.value_mut(&self.layout, hash, key) {
            stored.copy_from_slice(value);
            return Ok(SetOutcome::Updated);
        }

        match chain.append(&self.layout, self.chunk_capacity, hash, key, value) {
            Ok(Appended::Slot) => {}
            Ok(Appended::Chunk { position }) => {
                trace!("bucket {}: linked chunk at position {}", index, position);
            }
            Err(e) => {
                warn!("bucket {}: insert dropped: {}", index, e);
                return Err(e);
            }
        }
        Ok(SetOutcome::Inserted)
    }

    /// Marks the calling thread as running a closure under a lock it got
    /// from `lookup_mut`, so nested calls panic in debug builds.
    pub(crate) fn enter_closure(&self) -> ReentrancyGuard<'_> {
        self.reentrancy.enter()
    }

    fn check_key(&self, key: &[u8]) -> Result<(), TableError> {
        if key.len() != self.layout.key_size() {
            return Err(TableError::KeySize {
                expected: self.layout.key_size(),
                got: key.len(),
            });
        }
        Ok(())
    }

    fn check_value(&self, value: &[u8]) -> Result<(), TableError> {
        if value.len() != self.layout.value_size() {
            return Err(TableError::ValueSize {
                expected: self.layout.value_size(),
                got: value.len(),
            });
        }
        Ok(())
    }
}

impl core::fmt::Debug for ByteTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ByteTable")
            .field("key_size", &self.key_size())
            .field("value_size", &self.value_size())
            .field("directory_size", &self.directory_size)
            .field("chunk_capacity", &self.chunk_capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(n: u32) -> [u8; 4] {
        n.to_le_bytes()
    }

    fn v(n: i64) -> [u8; 8] {
        n.to_le_bytes()
    }

    /// Invariant: a key never set is absent.
    #[test]
    fn missing_key_is_absent() {
        let t = ByteTable::new(4, 8).unwrap();
        assert!(t.find(&k(1)).unwrap().is_none());
        assert!(!t.contains_key(&k(1)).unwrap());
        assert!(t.is_empty());
    }

    /// Invariant: set-then-find yields the stored bytes.
    #[test]
    fn set_then_find() {
        let t = ByteTable::new(4, 8).unwrap();
        assert_eq!(t.set(&k(1), &v(-1)).unwrap(), SetOutcome::Inserted);
        let found = t.find(&k(1)).unwrap().expect("present");
        assert_eq!(&*found, &v(-1)[..]);
    }

    /// Invariant: overwriting never duplicates the entry.
    #[test]
    fn overwrite_keeps_single_entry() {
        let t = ByteTable::new(4, 8).unwrap();
        assert_eq!(t.set(&k(5), &v(1)).unwrap(), SetOutcome::Inserted);
        assert_eq!(t.len(), 1);
        assert_eq!(t.set(&k(5), &v(2)).unwrap(), SetOutcome::Updated);
        assert_eq!(t.len(), 1);
        assert_eq!(&*t.find(&k(5)).unwrap().unwrap(), &v(2)[..]);
        assert_eq!(t.free(), 1);
    }

    /// Invariant: wrong buffer lengths are rejected and leave the table untouched.
    #[test]
    fn wrong_sizes_rejected() {
        let t = ByteTable::new(4, 8).unwrap();
        assert_eq!(
            t.set(&[0; 3], &v(0)),
            Err(TableError::KeySize {
                expected: 4,
                got: 3
            })
        );
        assert_eq!(
            t.set(&k(0), &[0; 9]),
            Err(TableError::ValueSize {
                expected: 8,
                got: 9
            })
        );
        assert!(matches!(
            t.find(&[0; 5]),
            Err(TableError::KeySize { .. })
        ));
        assert!(t.find_mut(&[]).is_err());
        assert!(t.is_empty());
    }

    /// Invariant: degenerate configurations are refused at build time.
    #[test]
    fn zero_sizes_refused() {
        assert_eq!(
            ByteTable::with_directory_size(4, 4, 0).unwrap_err(),
            TableError::ZeroDirectorySize
        );
        assert_eq!(
            TableBuilder::new(4, 4).chunk_capacity(0).build().unwrap_err(),
            TableError::ZeroChunkCapacity
        );
    }

    /// Invariant: the builder's parameters are exposed unchanged.
    #[test]
    fn builder_parameters_round_trip() {
        let t = TableBuilder::new(3, 5)
            .directory_size(7)
            .chunk_capacity(2)
            .build()
            .unwrap();
        assert_eq!(t.key_size(), 3);
        assert_eq!(t.value_size(), 5);
        assert_eq!(t.directory_size(), 7);
        assert_eq!(t.chunk_capacity(), 2);

        let d = ByteTable::new(1, 1).unwrap();
        assert_eq!(d.directory_size(), DEFAULT_DIRECTORY_SIZE);
        assert_eq!(d.chunk_capacity(), DEFAULT_CHUNK_CAPACITY);
    }

    /// Invariant: writes through `find_mut` are visible to later finds.
    #[test]
    fn find_mut_overwrites_in_place() {
        let t = ByteTable::new(4, 8).unwrap();
        t.set(&k(9), &v(0)).unwrap();
        {
            let mut slot = t.find_mut(&k(9)).unwrap().expect("present");
            slot.copy_from_slice(&v(123));
        }
        assert_eq!(&*t.find(&k(9)).unwrap().unwrap(), &v(123)[..]);
        assert!(t.find_mut(&k(10)).unwrap().is_none());
    }

    /// Invariant: with a single bucket, every key shares one chain and stays
    /// independently retrievable as the chain grows past its first chunk.
    #[test]
    fn single_bucket_chains_chunks() {
        let t = TableBuilder::new(4, 8)
            .directory_size(1)
            .chunk_capacity(4)
            .build()
            .unwrap();
        for n in 0..10u32 {
            t.set(&k(n), &v(-i64::from(n))).unwrap();
        }
        let stats = t.chain_stats();
        assert_eq!(stats.occupied_buckets, 1);
        assert_eq!(stats.chunks, 3);
        assert_eq!(stats.longest_chain, 3);
        for n in 0..10u32 {
            assert_eq!(&*t.find(&k(n)).unwrap().unwrap(), &v(-i64::from(n))[..]);
        }
        assert_eq!(t.load_factor(), 10.0);
        assert_eq!(t.free(), 10);
    }

    /// Invariant: an insert whose chunk cannot be reserved reports
    /// AllocationFailed and leaves the table empty.
    #[test]
    fn unallocatable_chunk_fails_cleanly() {
        let t = TableBuilder::new(4, 8)
            .directory_size(1)
            .chunk_capacity(1usize << 50)
            .build()
            .unwrap();
        assert!(matches!(
            t.set(&k(1), &v(1)),
            Err(TableError::AllocationFailed { .. })
        ));
        assert!(t.is_empty());
        assert!(t.find(&k(1)).unwrap().is_none());
        assert_eq!(t.chain_stats(), ChainStats::default());
        assert_eq!(t.free(), 0);
    }

    /// Invariant: a chunk size that overflows `usize` is an allocation failure.
    #[test]
    fn overflowing_chunk_size_fails_cleanly() {
        let t = TableBuilder::new(4, 8)
            .directory_size(1)
            .chunk_capacity(usize::MAX / 2)
            .build()
            .unwrap();
        assert_eq!(
            t.set(&k(1), &v(1)),
            Err(TableError::AllocationFailed { bytes: usize::MAX })
        );
        assert!(t.is_empty());
        assert_eq!(t.free(), 0);
    }

    /// Invariant: free reports zero for an untouched table.
    #[test]
    fn free_empty() {
        assert_eq!(ByteTable::new(2, 2).unwrap().free(), 0);
    }

    /// Invariant: the table can be shared across threads.
    #[test]
    fn is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ByteTable>();
    }
}
