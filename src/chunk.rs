//! Chunk chains: the collision storage behind each directory bucket.
//!
//! A chunk is a fixed number of slot records packed into one zeroed
//! buffer. Each record is laid out as `hash | key | value`, with the hash
//! stored in native byte order. Records are addressed by index, never by
//! raw offset arithmetic outside `SlotLayout`.
//!
//! Growth policy: a full tail chunk is never reallocated. A new chunk of the
//! same capacity is linked behind it instead, so existing records never move.

use crate::error::TableError;

const HASH_SIZE: usize = core::mem::size_of::<u32>();

/// Byte geometry of one slot record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SlotLayout {
    key_size: usize,
    value_size: usize,
}

impl SlotLayout {
    pub(crate) const fn new(key_size: usize, value_size: usize) -> Self {
        Self {
            key_size,
            value_size,
        }
    }

    #[inline]
    pub(crate) fn key_size(&self) -> usize {
        self.key_size
    }

    #[inline]
    pub(crate) fn value_size(&self) -> usize {
        self.value_size
    }

    /// Bytes per record.
    #[inline]
    pub(crate) fn stride(&self) -> usize {
        HASH_SIZE + self.key_size + self.value_size
    }

    #[inline]
    fn key_range(&self) -> core::ops::Range<usize> {
        HASH_SIZE..HASH_SIZE + self.key_size
    }

    #[inline]
    fn value_range(&self) -> core::ops::Range<usize> {
        HASH_SIZE + self.key_size..self.stride()
    }
}

/// A block of `capacity` slot records, the first `count` of them occupied.
pub(crate) struct Chunk {
    count: usize,
    capacity: usize,
    records: Box<[u8]>,
    next: Option<Box<Chunk>>,
}

impl Chunk {
    /// Reserves a zeroed chunk, reporting allocation failure instead of aborting.
    ///
    /// Only the record buffer is reserved fallibly. The small boxed header
    /// goes through the global allocator and aborts on exhaustion like any
    /// other `Box::new`.
    fn try_new(layout: &SlotLayout, capacity: usize) -> Result<Box<Chunk>, TableError> {
        let bytes = layout
            .stride()
            .checked_mul(capacity)
            .ok_or(TableError::AllocationFailed { bytes: usize::MAX })?;

        let mut records = Vec::new();
        records
            .try_reserve_exact(bytes)
            .map_err(|_| TableError::AllocationFailed { bytes })?;
        records.resize(bytes, 0);

        Ok(Box::new(Chunk {
            count: 0,
            capacity,
            records: records.into_boxed_slice(),
            next: None,
        }))
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.count
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    #[inline]
    fn record(&self, layout: &SlotLayout, index: usize) -> &[u8] {
        let stride = layout.stride();
        &self.records[index * stride..(index + 1) * stride]
    }

    #[inline]
    fn record_mut(&mut self, layout: &SlotLayout, index: usize) -> &mut [u8] {
        let stride = layout.stride();
        &mut self.records[index * stride..(index + 1) * stride]
    }

    /// Index of the occupied slot holding `key`, scanning in insertion order.
    fn position(&self, layout: &SlotLayout, hash: u32, key: &[u8]) -> Option<usize> {
        (0..self.count).find(|&i| {
            let record = self.record(layout, i);
            stored_hash(record) == hash && &record[layout.key_range()] == key
        })
    }

    /// Writes a new slot after the occupied ones. The caller checks capacity.
    fn push(&mut self, layout: &SlotLayout, hash: u32, key: &[u8], value: &[u8]) {
        debug_assert!(!self.is_full());
        let index = self.count;
        let record = self.record_mut(layout, index);
        record[..HASH_SIZE].copy_from_slice(&hash.to_ne_bytes());
        record[layout.key_range()].copy_from_slice(key);
        record[layout.value_range()].copy_from_slice(value);
        self.count += 1;
    }
}

#[inline]
fn stored_hash(record: &[u8]) -> u32 {
    let mut raw = [0u8; HASH_SIZE];
    raw.copy_from_slice(&record[..HASH_SIZE]);
    u32::from_ne_bytes(raw)
}

/// Where `Chain::append` put the new slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Appended {
    /// Into spare room of the existing tail chunk.
    Slot,
    /// Into a freshly linked chunk at this position in the chain (0 = head).
    Chunk { position: usize },
}

/// Totals gathered while tearing a chain down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Released {
    pub(crate) slots: usize,
    pub(crate) chunks: usize,
}

/// The chunks owned by one directory bucket.
#[derive(Default)]
pub(crate) struct Chain {
    head: Option<Box<Chunk>>,
}

impl Chain {
    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Chunks from head to tail.
    pub(crate) fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        core::iter::successors(self.head.as_deref(), |chunk| chunk.next.as_deref())
    }

    /// Number of occupied slots across the chain.
    pub(crate) fn len(&self) -> usize {
        self.chunks().map(Chunk::len).sum()
    }

    /// Stored value for `key`, if any.
    pub(crate) fn value(&self, layout: &SlotLayout, hash: u32, key: &[u8]) -> Option<&[u8]> {
        self.chunks().find_map(|chunk| {
            chunk
                .position(layout, hash, key)
                .map(|i| &chunk.record(layout, i)[layout.value_range()])
        })
    }

    /// Stored value for `key`, writable in place.
    pub(crate) fn value_mut(
        &mut self,
        layout: &SlotLayout,
        hash: u32,
        key: &[u8],
    ) -> Option<&mut [u8]> {
        let mut cursor = self.head.as_deref_mut();
        while let Some(chunk) = cursor {
            if let Some(i) = chunk.position(layout, hash, key) {
                return Some(&mut chunk.record_mut(layout, i)[layout.value_range()]);
            }
            cursor = chunk.next.as_deref_mut();
        }
        None
    }

    /// Appends a slot without checking for an existing key.
    ///
    /// Only the tail chunk is considered for spare room. On allocation
    /// failure the chain is left exactly as it was.
    pub(crate) fn append(
        &mut self,
        layout: &SlotLayout,
        chunk_capacity: usize,
        hash: u32,
        key: &[u8],
        value: &[u8],
    ) -> Result<Appended, TableError> {
        let mut position = 0;
        let mut link = &mut self.head;
        while let Some(chunk) = link {
            if chunk.next.is_none() && !chunk.is_full() {
                chunk.push(layout, hash, key, value);
                return Ok(Appended::Slot);
            }
            position += 1;
            link = &mut chunk.next;
        }

        let mut chunk = Chunk::try_new(layout, chunk_capacity)?;
        chunk.push(layout, hash, key, value);
        *link = Some(chunk);
        Ok(Appended::Chunk { position })
    }

    /// Unlinks and drops every chunk, head first, without recursion.
    pub(crate) fn release(&mut self) -> Released {
        let mut released = Released::default();
        let mut next = self.head.take();
        while let Some(mut chunk) = next {
            next = chunk.next.take();
            released.slots += chunk.count;
            released.chunks += 1;
        }
        released
    }
}

impl Drop for Chain {
    fn drop(&mut self) {
        // Boxed links would otherwise drop recursively, one frame per chunk.
        let _ = self.release();
    }
}
