//! Snapshot file header (C10): a fixed-size, CRC-guarded, `bytemuck`-
//! castable `repr(C)` struct at the front of the file, describing the
//! vector store, tag map, and neighbor-list sections that follow.

use crate::error::PersistenceError;
use bytemuck::{Pod, Zeroable};
use core::mem::{align_of, size_of};

/// Magic number: "VAMA" = [0x56, 0x41, 0x4D, 0x41]
pub const MAGIC: [u8; 4] = *b"VAMA";

/// Current major version.
pub const VERSION_MAJOR: u8 = 0;
/// Current minor version.
pub const VERSION_MINOR: u8 = 1;

/// Fixed-size header for `.vama` snapshot files.
///
/// # Layout
///
/// Total size: 64 bytes, alignment 8 bytes.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct FileHeader {
    /// Magic bytes, always [`MAGIC`].
    pub magic: [u8; 4], // 0
    /// Format version major part.
    pub version_major: u8, // 4
    /// Format version minor part.
    pub version_minor: u8, // 5
    /// Reserved flags, currently always 0.
    pub flags: u16, // 6
    /// Configured slot capacity.
    pub capacity: u64, // 8
    /// Byte length of the postcard-encoded graph section that follows
    /// the vector data section.
    pub graph_len: u64, // 16
    /// Logical vector dimensionality.
    pub dimensions: u32, // 24
    /// Padded row width (`round_up(dimensions, 8)`).
    pub aligned_dim: u32, // 28
    /// Max out-degree bound (`R`) the graph section was pruned to.
    pub max_degree: u32, // 32
    /// Count of frozen entry-point slots.
    pub frozen_count: u32, // 36
    /// `f32::to_bits` of the prune diversity parameter (`alpha`).
    pub alpha_bits: u32, // 40
    /// CRC32 of this header with `header_crc` zeroed.
    pub header_crc: u32, // 44
    /// CRC32 of the vector data section.
    pub vector_crc: u32, // 48
    /// CRC32 of the graph section.
    pub graph_crc: u32, // 52
    /// Reserved for future use, always 0.
    pub reserved: u32, // 56
    /// Reserved for future use, always 0.
    pub reserved2: u32, // 60
}

const _: () = assert!(size_of::<FileHeader>() == 64);
const _: () = assert!(align_of::<FileHeader>() == 8);

impl FileHeader {
    /// The expected magic bytes.
    pub const MAGIC: [u8; 4] = MAGIC;

    /// Builds a header with the checksum left at zero; call
    /// [`update_checksum`](Self::update_checksum) once every field is set.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        capacity: u64,
        graph_len: u64,
        dimensions: u32,
        aligned_dim: u32,
        max_degree: u32,
        frozen_count: u32,
        alpha: f32,
        vector_crc: u32,
        graph_crc: u32,
    ) -> Self {
        let mut header = Self {
            magic: MAGIC,
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            flags: 0,
            capacity,
            graph_len,
            dimensions,
            aligned_dim,
            max_degree,
            frozen_count,
            alpha_bits: alpha.to_bits(),
            header_crc: 0,
            vector_crc,
            graph_crc,
            reserved: 0,
            reserved2: 0,
        };
        header.update_checksum();
        header
    }

    /// The prune diversity parameter this snapshot was built with.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        f32::from_bits(self.alpha_bits)
    }

    /// Byte representation of the header.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 64] {
        bytemuck::cast_ref(self)
    }

    /// Recomputes `header_crc` from the current field values.
    pub fn update_checksum(&mut self) {
        self.header_crc = 0;
        self.header_crc = crc32fast::hash(self.as_bytes());
    }

    /// Parses and validates a header from the first 64 bytes of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::BufferTooSmall`] if `bytes.len() < 64`,
    /// [`PersistenceError::InvalidMagic`] if the magic bytes don't match,
    /// or [`PersistenceError::ChecksumMismatch`] if the header is corrupt.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersistenceError> {
        if bytes.len() < 64 {
            return Err(PersistenceError::BufferTooSmall {
                expected: 64,
                actual: bytes.len(),
            });
        }
        let header = *bytemuck::try_from_bytes::<FileHeader>(&bytes[..64]).map_err(|_| {
            PersistenceError::Corrupted("header buffer is not 8-byte aligned".into())
        })?;

        if header.magic != MAGIC {
            return Err(PersistenceError::InvalidMagic {
                expected: MAGIC,
                actual: header.magic,
            });
        }

        let mut verify = header;
        verify.header_crc = 0;
        let calculated = crc32fast::hash(verify.as_bytes());
        if header.header_crc != calculated {
            return Err(PersistenceError::ChecksumMismatch {
                expected: header.header_crc,
                actual: calculated,
            });
        }

        Ok(header)
    }
}
