//! chunk-table: a thread-safe hash table of fixed-size byte keys and values
//! that resolves collisions with chains of slot chunks.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one untyped storage engine that any fixed-size key/value pair can
//!   ride on, with a thin typed layer for callers who have real types.
//! - Layers:
//!   - `chunk`: slot records (`hash | key | value`) packed into fixed
//!     capacity chunks, linked into one chain per bucket.
//!   - ByteTable: directory of chains behind a reader/writer lock; exposes
//!     find / find_mut / set / free over byte slices.
//!   - Table<K, V>: encodes `FixedBytes` types into stack buffers and
//!     delegates to ByteTable.
//!
//! Addressing
//! - Keys hash with 32-bit FNV-1a; the bucket is `hash % directory_size`.
//! - The directory size is fixed at creation. There is no rehash: a table
//!   that outgrows its directory keeps working, but chains grow linearly and
//!   lookups degrade towards O(n). Size the directory for the expected load.
//! - FNV-1a is unseeded. Adversarial keys can force every entry into one
//!   chain.
//!
//! Chunk growth
//! - A bucket starts empty. The first insert allocates a head chunk of
//!   `chunk_capacity` slots (4 by default). Inserts append to the tail chunk
//!   until it is full, then a new chunk of the same capacity is linked
//!   behind it. Chunks are never reallocated, so slots never move.
//! - Every slot caches its hash; scans reject on hash before comparing keys.
//!
//! Concurrency
//! - The unit of protection is the whole table. `set` holds the write lock
//!   across its find-then-insert sequence, so concurrent sets cannot
//!   duplicate a key or corrupt a chain.
//! - `find` holds the read lock for as long as the returned guard lives, so
//!   it never observes a chain mid-update.
//! - `free` consumes the table. Shared tables must be unwrapped from their
//!   `Arc` first, which makes teardown during access impossible.
//! - The lock is not reentrant. Calling into a table while holding one of
//!   its value guards, or from the closure passed to `Table::update`,
//!   deadlocks. Debug builds turn the closure case into a panic.
//!
//! Errors
//! - Not-found is `None`, never an error.
//! - Buffers of the wrong length are rejected up front.
//! - A chunk's record buffer is reserved fallibly; a failed insert reports
//!   `TableError::AllocationFailed` and leaves the table as it was. The
//!   small per-chunk header is an ordinary `Box` and aborts on exhaustion.
//!
//! Non-goals
//! - No removal, no iteration, no resize, no persistence.

mod byte_table;
mod byte_table_proptest;
mod chunk;
mod error;
mod fixed_bytes;
pub mod hash;
mod reentrancy;
mod table;

// Public surface
pub use byte_table::{
    ByteTable, ChainStats, SetOutcome, TableBuilder, ValueMut, ValueRef, DEFAULT_CHUNK_CAPACITY,
    DEFAULT_DIRECTORY_SIZE,
};
pub use error::TableError;
pub use fixed_bytes::FixedBytes;
pub use table::Table;
