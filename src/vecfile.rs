//! Binary vector file reader: `int32 npts, int32 dim` header followed by
//! `npts * dim` row-major scalars. Uses the same `bytemuck::try_cast_slice`
//! alignment-fallback idiom as `persistence/snapshot.rs`, applied here to
//! a much simpler flat layout with no section headers.

use crate::config::DataType;
use crate::error::PersistenceError;
use std::fs;
use std::path::Path;

/// A vector file's header plus its raw scalar payload.
pub struct VecFile {
    npts: u64,
    dim: u32,
    data_type: DataType,
    floats: Vec<f32>,
}

impl VecFile {
    /// Number of vectors declared by the file header.
    #[must_use]
    pub fn npts(&self) -> u64 {
        self.npts
    }

    /// Vector dimensionality declared by the file header.
    #[must_use]
    pub fn dim(&self) -> u32 {
        self.dim
    }

    /// Returns the `index`-th vector, upcast to `f32` regardless of the
    /// file's on-disk [`DataType`].
    ///
    /// # Panics
    ///
    /// Panics if `index >= npts()`.
    #[must_use]
    pub fn vector(&self, index: u64) -> &[f32] {
        let start = (index * u64::from(self.dim)) as usize;
        let end = start + self.dim as usize;
        &self.floats[start..end]
    }

    /// Reads a vector file from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Io`] on I/O failure, or
    /// [`PersistenceError::FileSizeMismatch`] if the file's actual size
    /// does not match `2*sizeof(i32) + npts*dim*sizeof(scalar)`.
    pub fn read(path: &Path, data_type: DataType) -> Result<Self, PersistenceError> {
        let bytes = fs::read(path)?;
        if bytes.len() < 8 {
            return Err(PersistenceError::BufferTooSmall {
                expected: 8,
                actual: bytes.len(),
            });
        }
        let npts = i32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let dim = i32::from_le_bytes(bytes[4..8].try_into().unwrap());
        if npts < 0 || dim < 0 {
            return Err(PersistenceError::Corrupted(
                "negative npts or dim in vector file header".into(),
            ));
        }
        let npts = npts as u64;
        let dim = dim as u32;

        let scalar_size: u64 = match data_type {
            DataType::Int8 | DataType::Uint8 => 1,
            DataType::Float => 4,
        };
        let expected_size = 8 + npts * u64::from(dim) * scalar_size;
        let actual_size = bytes.len() as u64;
        if expected_size != actual_size {
            return Err(PersistenceError::FileSizeMismatch {
                expected: expected_size,
                actual: actual_size,
            });
        }

        let payload = &bytes[8..];
        let floats = match data_type {
            DataType::Float => payload
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes(b.try_into().unwrap()))
                .collect(),
            DataType::Int8 => payload.iter().map(|&b| b as i8 as f32).collect(),
            DataType::Uint8 => payload.iter().map(|&b| b as f32).collect(),
        };

        Ok(Self {
            npts,
            dim,
            data_type,
            floats,
        })
    }

    /// The on-disk scalar kind this file was read as.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use std::io::Write;

    fn write_float_file(npts: i32, dim: i32, rows: &[f32]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&npts.to_le_bytes()).unwrap();
        file.write_all(&dim.to_le_bytes()).unwrap();
        for v in rows {
            file.write_all(&v.to_le_bytes()).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn reads_float_header_and_rows() {
        let file = write_float_file(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let vf = VecFile::read(file.path(), DataType::Float).unwrap();
        assert_eq!(vf.npts(), 2);
        assert_eq!(vf.dim(), 3);
        assert_eq!(vf.vector(0), &[1.0, 2.0, 3.0]);
        assert_eq!(vf.vector(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn rejects_truncated_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&2i32.to_le_bytes()).unwrap();
        file.write_all(&3i32.to_le_bytes()).unwrap();
        file.write_all(&[0u8; 4]).unwrap();
        file.flush().unwrap();
        let err = VecFile::read(file.path(), DataType::Float).unwrap_err();
        assert!(matches!(err, PersistenceError::FileSizeMismatch { .. }));
    }

    #[test]
    fn uint8_rows_upcast_to_float() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&1i32.to_le_bytes()).unwrap();
        file.write_all(&2i32.to_le_bytes()).unwrap();
        file.write_all(&[10u8, 200u8]).unwrap();
        file.flush().unwrap();
        let vf = VecFile::read(file.path(), DataType::Uint8).unwrap();
        assert_eq!(vf.vector(0), &[10.0, 200.0]);
    }
}
