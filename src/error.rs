//! Unified error hierarchy for the streaming index core.
//!
//! Each component gets its own `thiserror`-derived error type; [`IndexError`]
//! composes them with `#[from]` so the driver can propagate a single error
//! kind without losing the originating component's detail.

use thiserror::Error;

/// Errors surfaced by the vector store (C1).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// The vector's dimensionality does not match the store's configured dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: u32,
        /// Actual dimensionality supplied.
        actual: u32,
    },
    /// The store has no free slot and cannot grow further.
    #[error("capacity exceeded: {capacity} slots in use")]
    Capacity {
        /// Configured capacity.
        capacity: usize,
    },
}

/// Errors surfaced by the tag map (C2).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TagError {
    /// A tag that already resolves to a slot was inserted again.
    #[error("duplicate tag: {0}")]
    DuplicateTag(u32),
    /// A tag that does not resolve to any slot was looked up.
    #[error("unknown tag: {0}")]
    UnknownTag(u32),
    /// Tag 0 is reserved to mean "absent" and cannot be assigned.
    #[error("tag 0 is reserved")]
    ReservedTag,
    /// The free list is empty and the unused-slot range is exhausted.
    #[error("capacity exceeded: {capacity} slots in use")]
    Capacity {
        /// Configured capacity.
        capacity: usize,
    },
}

/// Errors surfaced by snapshot I/O (C10).
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Underlying I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The on-disk file header failed to parse.
    #[error("invalid magic number: expected {expected:?}, got {actual:?}")]
    InvalidMagic {
        /// Expected magic bytes.
        expected: [u8; 4],
        /// Actual magic bytes read.
        actual: [u8; 4],
    },
    /// The header's checksum does not match its contents.
    #[error("checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// Expected CRC32.
        expected: u32,
        /// Actual CRC32.
        actual: u32,
    },
    /// The buffer supplied was smaller than a fixed-size header.
    #[error("buffer too small: expected {expected}, got {actual}")]
    BufferTooSmall {
        /// Expected size in bytes.
        expected: usize,
        /// Actual size in bytes.
        actual: usize,
    },
    /// The file's declared size does not match its actual size.
    #[error("file size mismatch: expected {expected}, got {actual}")]
    FileSizeMismatch {
        /// Expected size in bytes, per the header.
        expected: u64,
        /// Actual size in bytes on disk.
        actual: u64,
    },
    /// Data failed a structural consistency check on load.
    #[error("corrupted data: {0}")]
    Corrupted(String),
}

/// Errors surfaced by driver configuration validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// `beginning_index_size == 0` without a positive `start_point_norm`.
    #[error("beginning_index_size is 0 but start_point_norm is not set")]
    MissingStartPointNorm,
    /// `points_to_skip` exceeds the number of vectors in the source file.
    #[error("points_to_skip ({points_to_skip}) exceeds file length ({file_npts})")]
    SkipExceedsFile {
        /// Configured skip count.
        points_to_skip: u64,
        /// Vector count declared by the source file.
        file_npts: u64,
    },
    /// `alpha` is below the required lower bound of 1.0.
    #[error("alpha must be >= 1.0, got {0}")]
    AlphaTooSmall(f32),
    /// `R` or `L` is zero, or `L < R`.
    #[error("invalid degree bound: R={r}, L={l} (require L >= R > 0)")]
    InvalidDegreeBound {
        /// Configured max out-degree.
        r: u32,
        /// Configured build beam width.
        l: u32,
    },
}

impl From<crate::insert::InsertError> for IndexError {
    fn from(err: crate::insert::InsertError) -> Self {
        match err {
            crate::insert::InsertError::Tag(e) => IndexError::Tag(e),
            crate::insert::InsertError::Store(e) => IndexError::Store(e),
        }
    }
}

/// The top-level error type returned by the streaming index core.
///
/// Mirrors the documented error kinds: `DuplicateTag`, `UnknownTag`, `Capacity`,
/// `DimensionMismatch`, `IOFailure`, `FileSizeMismatch`, `InvalidConfig`.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Tag map error (`DuplicateTag` / `UnknownTag` / `Capacity`).
    #[error(transparent)]
    Tag(#[from] TagError),
    /// Vector store error (`DimensionMismatch`, plus `Capacity` as a
    /// bounds-check backstop on direct slot writes).
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Persistence error (`IOFailure` / `FileSizeMismatch`).
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    /// Driver configuration error (`InvalidConfig`).
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),
}
