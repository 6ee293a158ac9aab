//! Errors returned by table construction and mutation.

use thiserror::Error;

/// Everything that can go wrong while building or mutating a table.
///
/// A missing key is not an error: lookups report it as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// The key buffer does not match the table's key size.
    #[error("key is {got} bytes, table expects {expected}")]
    KeySize { expected: usize, got: usize },

    /// The value buffer does not match the table's value size.
    #[error("value is {got} bytes, table expects {expected}")]
    ValueSize { expected: usize, got: usize },

    /// A directory needs at least one bucket.
    #[error("directory size must be non-zero")]
    ZeroDirectorySize,

    /// A chunk needs room for at least one slot.
    #[error("chunk capacity must be non-zero")]
    ZeroChunkCapacity,

    /// Storage could not be reserved; the table was left unchanged.
    #[error("failed to allocate {bytes} bytes")]
    AllocationFailed { bytes: usize },
}
