//! Snapshot writer/reader (C10): vector store + tag map + neighbor lists.
//!
//! Bulk vector data is cast via `bytemuck` for speed, while the smaller
//! bookkeeping (tag bindings, free list, neighbor rows, delete set) is
//! serialized with `postcard`; each section is CRC32-guarded
//! independently so a truncated or corrupted section is detectable
//! without needing to parse the whole file.

use crate::error::PersistenceError;
use crate::neighbors::NeighborList;
use crate::persistence::header::FileHeader;
use crate::store::VectorStore;
use crate::tags::TagMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{Read, Write};

#[derive(Serialize, Deserialize)]
struct GraphSnapshot {
    next_unused_slot: usize,
    free_slots: Vec<usize>,
    bindings: Vec<(u32, usize)>,
    frozen_slots: Vec<usize>,
    delete_set: Vec<usize>,
    rows: Vec<Vec<u32>>,
}

/// Everything [`read_snapshot`] reconstructs from a file.
pub struct LoadedSnapshot {
    /// Reconstructed vector store.
    pub store: VectorStore,
    /// Reconstructed tag map.
    pub tags: TagMap,
    /// Reconstructed neighbor lists.
    pub neighbors: NeighborList,
    /// Frozen entry-point slots.
    pub frozen_slots: Vec<usize>,
    /// Slots currently in the delete set.
    pub delete_set: HashSet<usize>,
    /// The prune diversity parameter the graph was built with.
    pub alpha: f32,
}

/// Writes a full snapshot to `writer`.
///
/// # Errors
///
/// Returns [`PersistenceError::Io`] on write failure.
pub fn write_snapshot(
    store: &VectorStore,
    tags: &TagMap,
    neighbors: &NeighborList,
    frozen_slots: &[usize],
    delete_set: &HashSet<usize>,
    alpha: f32,
    writer: &mut impl Write,
) -> Result<(), PersistenceError> {
    let graph = GraphSnapshot {
        next_unused_slot: tags.next_unused_slot(),
        free_slots: tags.free_slots().to_vec(),
        bindings: tags.iter().collect(),
        frozen_slots: frozen_slots.to_vec(),
        delete_set: delete_set.iter().copied().collect(),
        rows: neighbors.rows().to_vec(),
    };
    let graph_bytes =
        postcard::to_allocvec(&graph).map_err(|e| PersistenceError::Corrupted(e.to_string()))?;
    let graph_crc = crc32fast::hash(&graph_bytes);

    let vector_bytes: &[u8] = bytemuck::cast_slice(store.raw_data());
    let vector_crc = crc32fast::hash(vector_bytes);

    let header = FileHeader::new(
        store.capacity() as u64,
        graph_bytes.len() as u64,
        store.dim(),
        store.aligned_dim(),
        neighbors.r_max() as u32,
        frozen_slots.len() as u32,
        alpha,
        vector_crc,
        graph_crc,
    );

    writer.write_all(header.as_bytes())?;
    writer.write_all(vector_bytes)?;
    writer.write_all(&graph_bytes)?;
    Ok(())
}

/// Reads a snapshot written by [`write_snapshot`].
///
/// # Errors
///
/// Returns [`PersistenceError`] if the header is invalid, a section's
/// checksum does not match, or the file is truncated.
pub fn read_snapshot(reader: &mut impl Read) -> Result<LoadedSnapshot, PersistenceError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let header = FileHeader::from_bytes(&bytes)?;
    let vector_len = header.capacity as usize * header.aligned_dim as usize * 4;
    let vector_start = 64;
    let vector_end = vector_start + vector_len;
    let graph_end = vector_end + header.graph_len as usize;

    if bytes.len() < graph_end {
        return Err(PersistenceError::FileSizeMismatch {
            expected: graph_end as u64,
            actual: bytes.len() as u64,
        });
    }

    let vector_bytes = &bytes[vector_start..vector_end];
    let actual_vector_crc = crc32fast::hash(vector_bytes);
    if actual_vector_crc != header.vector_crc {
        return Err(PersistenceError::ChecksumMismatch {
            expected: header.vector_crc,
            actual: actual_vector_crc,
        });
    }

    let graph_bytes = &bytes[vector_end..graph_end];
    let actual_graph_crc = crc32fast::hash(graph_bytes);
    if actual_graph_crc != header.graph_crc {
        return Err(PersistenceError::ChecksumMismatch {
            expected: header.graph_crc,
            actual: actual_graph_crc,
        });
    }

    let floats: Vec<f32> = match bytemuck::try_cast_slice::<u8, f32>(vector_bytes) {
        Ok(floats) => floats.to_vec(),
        Err(_) => vector_bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
            .collect(),
    };
    let store = VectorStore::from_raw_parts(header.dimensions, header.capacity as usize, floats)
        .map_err(|_| PersistenceError::Corrupted("vector data length mismatch".into()))?;

    let graph: GraphSnapshot = postcard::from_bytes(graph_bytes)
        .map_err(|e| PersistenceError::Corrupted(format!("graph section decode failed: {e}")))?;

    if graph.rows.len() != header.capacity as usize {
        return Err(PersistenceError::Corrupted(format!(
            "neighbor row count mismatch: expected {}, got {}",
            header.capacity,
            graph.rows.len()
        )));
    }

    let neighbors = NeighborList::from_rows(header.max_degree as usize, graph.rows);
    let tags = TagMap::from_parts(
        header.capacity as usize,
        graph.next_unused_slot,
        graph.free_slots,
        graph.bindings,
    );
    let delete_set: HashSet<usize> = graph.delete_set.into_iter().collect();

    Ok(LoadedSnapshot {
        store,
        tags,
        neighbors,
        frozen_slots: graph.frozen_slots,
        delete_set,
        alpha: header.alpha(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insert::insert_point;
    use crate::config::{DataType, DriverConfig};
    use crate::metric::DistFn;
    use std::io::Cursor;

    fn built_index() -> (VectorStore, TagMap, NeighborList, Vec<usize>, DriverConfig) {
        let mut cfg = DriverConfig::new("x".into(), "y".into(), 0, 1, 1, 0, 0);
        cfg.max_degree = 4;
        cfg.l_build = 8;
        cfg.alpha = 1.2;
        cfg.dist_fn = DistFn::L2;
        cfg.data_type = DataType::Float;

        let mut tags = TagMap::new(16);
        let mut store = VectorStore::new(2, 16);
        let mut neighbors = NeighborList::new(16, 4);
        let frozen = tags.reserve_frozen(1);
        store.write(frozen[0], &[0.0, 0.0]).unwrap();
        for i in 1..6u32 {
            let v = [i as f32, (i * 2) as f32];
            insert_point(i, &v, &mut tags, &mut store, &mut neighbors, &frozen, &cfg, |_| false).unwrap();
        }
        (store, tags, neighbors, frozen, cfg)
    }

    #[test]
    fn roundtrips_a_small_index() {
        let (store, tags, neighbors, frozen, cfg) = built_index();
        let delete_set = HashSet::new();

        let mut buf = Vec::new();
        write_snapshot(&store, &tags, &neighbors, &frozen, &delete_set, cfg.alpha, &mut buf).unwrap();

        let mut cursor = Cursor::new(buf);
        let loaded = read_snapshot(&mut cursor).unwrap();

        assert_eq!(loaded.store.dim(), store.dim());
        assert_eq!(loaded.store.capacity(), store.capacity());
        assert_eq!(loaded.frozen_slots, frozen);
        for tag in 1..6u32 {
            assert_eq!(loaded.tags.slot_of(tag), tags.slot_of(tag));
        }
        for slot in 0..store.capacity() {
            assert_eq!(loaded.neighbors.neighbors(slot), neighbors.neighbors(slot));
        }
    }

    #[test]
    fn rejects_corrupted_vector_section() {
        let (store, tags, neighbors, frozen, cfg) = built_index();
        let delete_set = HashSet::new();
        let mut buf = Vec::new();
        write_snapshot(&store, &tags, &neighbors, &frozen, &delete_set, cfg.alpha, &mut buf).unwrap();

        buf[70] ^= 0xFF;
        let mut cursor = Cursor::new(buf);
        let err = read_snapshot(&mut cursor).unwrap_err();
        assert!(matches!(err, PersistenceError::ChecksumMismatch { .. }));
    }

    #[test]
    fn preserves_delete_set() {
        let (store, tags, neighbors, frozen, cfg) = built_index();
        let mut delete_set = HashSet::new();
        delete_set.insert(tags.slot_of(2).unwrap());

        let mut buf = Vec::new();
        write_snapshot(&store, &tags, &neighbors, &frozen, &delete_set, cfg.alpha, &mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let loaded = read_snapshot(&mut cursor).unwrap();
        assert_eq!(loaded.delete_set, delete_set);
    }
}
