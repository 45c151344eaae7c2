//! Top-level index wiring: `StreamingIndex` composes C1-C8 behind two
//! coarse locks, `tag_map` and `structural`. Every mutating operation
//! (`insert`, `delete`, `consolidate`, `build_initial_batch`) takes both
//! write locks for its entire body, so these operations fully serialize
//! against each other; `search` and the read-only accessors take only
//! the read side, and can run concurrently with one another.

use crate::config::DriverConfig;
use crate::delete::{self, ConsolidateReport};
use crate::error::IndexError;
use crate::insert::{build_batch, insert_point};
use crate::neighbors::NeighborList;
use crate::search::{greedy_search, Candidate};
use crate::store::VectorStore;
use crate::tags::TagMap;
use std::collections::HashSet;
use std::sync::RwLock;

/// Everything that sits behind the `structural` lock: one level below
/// `tag_map` in the hierarchy.
struct Structural {
    store: VectorStore,
    neighbors: NeighborList,
    frozen_slots: Vec<usize>,
    delete_set: HashSet<usize>,
}

/// The streaming index core: vector store, tag map, graph, and delete
/// set under the two-lock hierarchy described above.
pub struct StreamingIndex {
    tag_map: RwLock<TagMap>,
    structural: RwLock<Structural>,
    config: DriverConfig,
}

impl StreamingIndex {
    /// Creates an index over `capacity` slots of `dim`-dimensional
    /// vectors, with no frozen points yet reserved.
    #[must_use]
    pub fn new(dim: u32, capacity: usize, config: DriverConfig) -> Self {
        let structural = Structural {
            store: VectorStore::new(dim, capacity),
            neighbors: NeighborList::new(capacity, config.max_degree as usize),
            frozen_slots: Vec::new(),
            delete_set: HashSet::new(),
        };
        Self {
            tag_map: RwLock::new(TagMap::new(capacity)),
            structural: RwLock::new(structural),
            config,
        }
    }

    /// Rebuilds a `StreamingIndex` from a loaded snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: crate::persistence::LoadedSnapshot, mut config: DriverConfig) -> Self {
        config.alpha = snapshot.alpha;
        let structural = Structural {
            store: snapshot.store,
            neighbors: snapshot.neighbors,
            frozen_slots: snapshot.frozen_slots,
            delete_set: snapshot.delete_set,
        };
        Self {
            tag_map: RwLock::new(snapshot.tags),
            structural: RwLock::new(structural),
            config,
        }
    }

    /// Reserves `count` frozen entry-point slots and writes their
    /// vectors. Must be called before any insert.
    ///
    /// # Panics
    ///
    /// Panics if `vectors.len() != count` or any vector has the wrong
    /// dimensionality.
    pub fn reserve_frozen_points(&self, vectors: &[Vec<f32>]) {
        let mut tag_guard = self.tag_map.write().unwrap();
        let mut structural = self.structural.write().unwrap();
        let slots = tag_guard.reserve_frozen(vectors.len());
        for (&slot, vector) in slots.iter().zip(vectors) {
            structural.store.write(slot, vector).expect("frozen point dimension mismatch");
        }
        structural.frozen_slots.extend(slots);
    }

    /// Logical vector dimensionality.
    #[must_use]
    pub fn dim(&self) -> u32 {
        self.structural.read().unwrap().store.dim()
    }

    /// Builds the initial batch under a single lock
    /// acquisition, bypassing per-insert back-edge propagation in favor
    /// of one global back-edge and re-prune pass (see
    /// [`crate::insert::build_batch`]).
    ///
    /// # Errors
    ///
    /// See [`crate::insert::build_batch`].
    pub fn build_initial_batch(&self, points: &[(u32, Vec<f32>)]) -> Result<(), IndexError> {
        let mut tag_guard = self.tag_map.write().unwrap();
        let mut structural_guard = self.structural.write().unwrap();
        let structural = &mut *structural_guard;
        build_batch(
            points,
            &mut tag_guard,
            &mut structural.store,
            &mut structural.neighbors,
            &structural.frozen_slots,
            &self.config,
        )?;
        Ok(())
    }

    /// Inserts `vector` under `tag` (C7).
    ///
    /// # Errors
    ///
    /// See [`crate::insert::insert_point`].
    pub fn insert(&self, tag: u32, vector: &[f32]) -> Result<usize, IndexError> {
        let mut tag_guard = self.tag_map.write().unwrap();
        let mut structural_guard = self.structural.write().unwrap();
        let structural = &mut *structural_guard;
        let is_deleted = |slot: usize| structural.delete_set.contains(&slot);
        let slot = insert_point(
            tag,
            vector,
            &mut tag_guard,
            &mut structural.store,
            &mut structural.neighbors,
            &structural.frozen_slots,
            &self.config,
            is_deleted,
        )?;
        Ok(slot)
    }

    /// Lazily marks `tag` for deletion (C8.1).
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Tag`] if `tag` does not resolve.
    pub fn delete(&self, tag: u32) -> Result<(), IndexError> {
        let mut tag_guard = self.tag_map.write().unwrap();
        let mut structural = self.structural.write().unwrap();
        delete::lazy_delete(tag, &mut tag_guard, &mut structural.delete_set)?;
        Ok(())
    }

    /// Runs a batched consolidation pass over every occupied slot (C8.2).
    pub fn consolidate(&self) -> ConsolidateReport {
        let mut tag_guard = self.tag_map.write().unwrap();
        let mut structural_guard = self.structural.write().unwrap();
        let structural = &mut *structural_guard;

        let mut occupied: Vec<usize> = structural.frozen_slots.clone();
        occupied.extend(tag_guard.occupied_slots());
        occupied.extend(structural.delete_set.iter().copied());
        occupied.sort_unstable();
        occupied.dedup();

        delete::consolidate_deletes(
            self.config.dist_fn,
            &structural.store,
            &mut structural.neighbors,
            &mut tag_guard,
            &mut structural.delete_set,
            &occupied,
            &structural.frozen_slots,
            &self.config,
        )
    }

    /// Searches for the `k` nearest non-deleted tags to `query`.
    ///
    /// Returns `(tag, distance)` pairs sorted by ascending distance.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(u32, f32)> {
        let tag_guard = self.tag_map.read().unwrap();
        let structural = self.structural.read().unwrap();
        let result = greedy_search(
            self.config.dist_fn,
            &structural.store,
            &structural.neighbors,
            query,
            &structural.frozen_slots,
            k.max(self.config.l_build as usize),
            |slot| structural.delete_set.contains(&slot),
        );
        result
            .beam
            .into_iter()
            .take(k)
            .filter_map(|Candidate { slot, dist }| tag_guard.tag_of(slot).map(|tag| (tag, dist)))
            .collect()
    }

    /// Number of currently tag-bound (live) points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tag_map.read().unwrap().occupied_count()
    }

    /// True if no points are currently tag-bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured slot capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.tag_map.read().unwrap().capacity()
    }

    /// Number of free (unoccupied, reusable) slots.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.tag_map.read().unwrap().free_count()
    }

    /// Writes a snapshot of the current index state to `writer`.
    ///
    /// # Errors
    ///
    /// See [`crate::persistence::write_snapshot`].
    pub fn snapshot(&self, writer: &mut impl std::io::Write) -> Result<(), IndexError> {
        let tag_guard = self.tag_map.read().unwrap();
        let structural = self.structural.read().unwrap();
        crate::persistence::write_snapshot(
            &structural.store,
            &tag_guard,
            &structural.neighbors,
            &structural.frozen_slots,
            &structural.delete_set,
            self.config.alpha,
            writer,
        )
        .map_err(IndexError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::DistFn;

    fn test_config() -> DriverConfig {
        let mut cfg = DriverConfig::new("x".into(), "y".into(), 0, 1, 1, 0, 0);
        cfg.max_degree = 4;
        cfg.l_build = 10;
        cfg.alpha = 1.2;
        cfg.dist_fn = DistFn::L2;
        cfg
    }

    #[test]
    fn insert_then_search_finds_the_point() {
        let index = StreamingIndex::new(2, 32, test_config());
        index.reserve_frozen_points(&[vec![0.0, 0.0]]);
        index.insert(1, &[5.0, 5.0]).unwrap();
        index.insert(2, &[1.0, 1.0]).unwrap();

        let results = index.search(&[5.1, 5.1], 1);
        assert_eq!(results[0].0, 1);
    }

    #[test]
    fn delete_then_search_excludes_the_tag() {
        let index = StreamingIndex::new(2, 32, test_config());
        index.reserve_frozen_points(&[vec![0.0, 0.0]]);
        index.insert(1, &[5.0, 5.0]).unwrap();
        index.insert(2, &[5.1, 5.1]).unwrap();

        index.delete(1).unwrap();
        let results = index.search(&[5.0, 5.0], 2);
        assert!(!results.iter().any(|(tag, _)| *tag == 1));
    }

    #[test]
    fn consolidate_releases_deleted_slots() {
        let index = StreamingIndex::new(2, 32, test_config());
        index.reserve_frozen_points(&[vec![0.0, 0.0]]);
        for i in 1..10u32 {
            index.insert(i, &[i as f32, i as f32]).unwrap();
        }
        index.delete(3).unwrap();
        let report = index.consolidate();
        assert_eq!(report.slots_released, 1);
        assert_eq!(report.delete_set_size, 0);
        assert_eq!(index.len(), 8);
    }

    #[test]
    fn snapshot_roundtrips_through_reload() {
        let index = StreamingIndex::new(2, 32, test_config());
        index.reserve_frozen_points(&[vec![0.0, 0.0]]);
        index.insert(1, &[5.0, 5.0]).unwrap();

        let mut buf = Vec::new();
        index.snapshot(&mut buf).unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let loaded = crate::persistence::read_snapshot(&mut cursor).unwrap();
        let reloaded = StreamingIndex::from_snapshot(loaded, test_config());
        let results = reloaded.search(&[5.1, 5.1], 1);
        assert_eq!(results[0].0, 1);
    }
}
