//! Insert engine (C7): allocate, store, search, prune, back-edge, publish.
//!
//! A single-phase algorithm: search once from the frozen entry points,
//! prune the new node's outbound list, then back-edge into each chosen
//! neighbor with a candidate-cap re-prune.

use crate::config::DriverConfig;
use crate::error::{StoreError, TagError};
use crate::metric::DistFn;
use crate::neighbors::NeighborList;
use crate::prune::robust_prune;
use crate::search::{greedy_search, Candidate};
use crate::store::VectorStore;
use crate::tags::TagMap;
use std::collections::HashMap;

/// Candidate-cap default (`C`).
pub const DEFAULT_CANDIDATE_CAP: usize = 500;

/// Errors specific to `insert_point`.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InsertError {
    /// The tag already resolves to a slot.
    #[error(transparent)]
    Tag(#[from] TagError),
    /// The vector store rejected the vector (dimension mismatch or capacity).
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Inserts `vector` under `tag`, wiring the graph.
///
/// `is_deleted` reports whether a slot is currently in the delete set,
/// needed so search correctly routes through (but does not return)
/// tombstoned slots while computing the candidate set.
///
/// # Errors
///
/// Returns [`InsertError::Tag`] for `DuplicateTag` or `Capacity`, or
/// [`InsertError::Store`] for `DimensionMismatch`.
#[allow(clippy::too_many_arguments)]
pub fn insert_point(
    tag: u32,
    vector: &[f32],
    tags: &mut TagMap,
    store: &mut VectorStore,
    neighbors: &mut NeighborList,
    entry_slots: &[usize],
    config: &DriverConfig,
    is_deleted: impl Fn(usize) -> bool + Copy,
) -> Result<usize, InsertError> {
    // Step 1: allocate slot. Fails with `Capacity` if both the free list
    // and the unused-slot range are exhausted.
    let slot = tags.allocate(tag)?;

    // Step 2: store vector (zero-padded to aligned_dim internally).
    if let Err(e) = store.write(slot, vector) {
        // Allocation must be rolled back: the slot was never published,
        // so it is safe to return it to the free list untouched.
        tags.release(slot);
        return Err(e.into());
    }

    let dist_fn = config.dist_fn;

    // Step 3: search from the frozen entry points.
    let result = greedy_search(
        dist_fn,
        store,
        neighbors,
        vector,
        entry_slots,
        config.l_build as usize,
        is_deleted,
    );

    // Step 4: prune outbound edges of the new slot.
    let chosen = robust_prune(
        dist_fn,
        store,
        slot,
        &result.visited,
        config.max_degree as usize,
        config.alpha,
    );
    neighbors.set_neighbors(slot, &chosen);

    // Step 5: back-edges, with re-prune once a neighbor's list reaches the candidate cap.
    for &q in &chosen {
        let q = q as usize;
        let appended = neighbors.append_transient(q, slot as u32, DEFAULT_CANDIDATE_CAP);
        if appended && neighbors.degree_of(q) >= DEFAULT_CANDIDATE_CAP {
            let q_vec = store.get(q).to_vec();
            let candidates: Vec<crate::search::Candidate> = neighbors
                .neighbors(q)
                .iter()
                .map(|&n| crate::search::Candidate {
                    slot: n as usize,
                    dist: dist_fn.distance(&q_vec, store.get(n as usize)),
                })
                .collect();
            let repruned = robust_prune(
                dist_fn,
                store,
                q,
                &candidates,
                config.max_degree as usize,
                config.alpha,
            );
            neighbors.set_neighbors(q, &repruned);
        }
    }

    // Step 6: publish the tag last.
    tags.publish(tag, slot);

    Ok(slot)
}

/// Builds the initial batch: equivalent to calling
/// [`insert_point`] for every `(tag, vector)` pair, but bypasses the
/// per-insert back-edge propagation in favor of a single global back-edge
/// and re-prune pass once every point's forward edges are computed.
///
/// # Errors
///
/// Returns [`InsertError`] on the first point that fails to allocate or
/// store; earlier points in the batch remain committed (per-point insert
/// failure within a checkpoint is fatal, not best-effort).
pub fn build_batch(
    points: &[(u32, Vec<f32>)],
    tags: &mut TagMap,
    store: &mut VectorStore,
    neighbors: &mut NeighborList,
    entry_slots: &[usize],
    config: &DriverConfig,
) -> Result<(), InsertError> {
    let dist_fn = config.dist_fn;
    let mut inserted_slots = Vec::with_capacity(points.len());

    for (tag, vector) in points {
        let slot = tags.allocate(*tag)?;
        if let Err(e) = store.write(slot, vector) {
            tags.release(slot);
            return Err(e.into());
        }

        let result = greedy_search(
            dist_fn,
            store,
            neighbors,
            vector,
            entry_slots,
            config.l_build as usize,
            |_| false,
        );
        let chosen = robust_prune(
            dist_fn,
            store,
            slot,
            &result.visited,
            config.max_degree as usize,
            config.alpha,
        );
        neighbors.set_neighbors(slot, &chosen);
        tags.publish(*tag, slot);
        inserted_slots.push(slot);
    }

    let mut inbound: HashMap<usize, Vec<u32>> = HashMap::new();
    for &slot in &inserted_slots {
        for &q in neighbors.neighbors(slot) {
            inbound.entry(q as usize).or_default().push(slot as u32);
        }
    }
    for (q, back_edges) in inbound {
        for target in back_edges {
            neighbors.append_transient(q, target, DEFAULT_CANDIDATE_CAP);
        }
        if neighbors.degree_of(q) >= DEFAULT_CANDIDATE_CAP {
            let q_vec = store.get(q).to_vec();
            let candidates: Vec<Candidate> = neighbors
                .neighbors(q)
                .iter()
                .map(|&n| Candidate {
                    slot: n as usize,
                    dist: dist_fn.distance(&q_vec, store.get(n as usize)),
                })
                .collect();
            let repruned = robust_prune(
                dist_fn,
                store,
                q,
                &candidates,
                config.max_degree as usize,
                config.alpha,
            );
            neighbors.set_neighbors(q, &repruned);
        }
    }
    Ok(())
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
    fn insert_publishes_tag_and_wires_edges() {
        let dim = 4;
        let capacity = 16;
        let mut tags = TagMap::new(capacity);
        let mut store = VectorStore::new(dim, capacity);
        let mut neighbors = NeighborList::new(capacity, 4);
        let frozen = tags.reserve_frozen(1);
        store.write(frozen[0], &[0.0, 0.0, 0.0, 0.0]).unwrap();
        let config = test_config();

        let slot = insert_point(
            1,
            &[1.0, 0.0, 0.0, 0.0],
            &mut tags,
            &mut store,
            &mut neighbors,
            &frozen,
            &config,
            |_| false,
        )
        .unwrap();

        assert_eq!(tags.slot_of(1), Some(slot));
        assert!(neighbors.neighbors(slot).contains(&(frozen[0] as u32)));
        // Back-edge: the frozen point should now point back at the new slot.
        assert!(neighbors.neighbors(frozen[0]).contains(&(slot as u32)));
    }

    #[test]
    fn duplicate_tag_is_rejected_without_mutating_state() {
        let dim = 4;
        let capacity = 16;
        let mut tags = TagMap::new(capacity);
        let mut store = VectorStore::new(dim, capacity);
        let mut neighbors = NeighborList::new(capacity, 4);
        let frozen = tags.reserve_frozen(1);
        store.write(frozen[0], &[0.0, 0.0, 0.0, 0.0]).unwrap();
        let config = test_config();

        insert_point(
            1,
            &[1.0, 0.0, 0.0, 0.0],
            &mut tags,
            &mut store,
            &mut neighbors,
            &frozen,
            &config,
            |_| false,
        )
        .unwrap();

        let err = insert_point(
            1,
            &[2.0, 0.0, 0.0, 0.0],
            &mut tags,
            &mut store,
            &mut neighbors,
            &frozen,
            &config,
            |_| false,
        )
        .unwrap_err();
        assert_eq!(err, InsertError::Tag(TagError::DuplicateTag(1)));
    }

    #[test]
    fn dimension_mismatch_releases_the_allocated_slot() {
        let dim = 4;
        let capacity = 16;
        let mut tags = TagMap::new(capacity);
        let mut store = VectorStore::new(dim, capacity);
        let mut neighbors = NeighborList::new(capacity, 4);
        let frozen = tags.reserve_frozen(1);
        store.write(frozen[0], &[0.0, 0.0, 0.0, 0.0]).unwrap();
        let config = test_config();

        let err = insert_point(
            1,
            &[1.0, 0.0],
            &mut tags,
            &mut store,
            &mut neighbors,
            &frozen,
            &config,
            |_| false,
        )
        .unwrap_err();
        assert!(matches!(err, InsertError::Store(StoreError::DimensionMismatch { .. })));
        assert_eq!(tags.free_count(), 1);
    }

    #[test]
    fn outbound_degree_never_exceeds_r() {
        let dim = 2;
        let capacity = 32;
        let mut tags = TagMap::new(capacity);
        let mut store = VectorStore::new(dim, capacity);
        let mut neighbors = NeighborList::new(capacity, 4);
        let frozen = tags.reserve_frozen(1);
        store.write(frozen[0], &[0.0, 0.0]).unwrap();
        let config = test_config();

        for i in 1..20u32 {
            let v = [i as f32, (i * 2) as f32];
            let slot = insert_point(
                i,
                &v,
                &mut tags,
                &mut store,
                &mut neighbors,
                &frozen,
                &config,
                |_| false,
            )
            .unwrap();
            assert!(neighbors.degree_of(slot) <= config.max_degree as usize);
        }
    }

    #[test]
    fn build_batch_publishes_every_tag_and_respects_degree_bound() {
        let dim = 2;
        let capacity = 32;
        let mut tags = TagMap::new(capacity);
        let mut store = VectorStore::new(dim, capacity);
        let mut neighbors = NeighborList::new(capacity, 4);
        let frozen = tags.reserve_frozen(1);
        store.write(frozen[0], &[0.0, 0.0]).unwrap();
        let config = test_config();

        let points: Vec<(u32, Vec<f32>)> = (1..15u32)
            .map(|i| (i, vec![i as f32, (i * 2) as f32]))
            .collect();
        build_batch(&points, &mut tags, &mut store, &mut neighbors, &frozen, &config).unwrap();

        for (tag, _) in &points {
            let slot = tags.slot_of(*tag).unwrap();
            assert!(neighbors.degree_of(slot) <= config.max_degree as usize);
        }
        assert_eq!(tags.occupied_count(), points.len());
    }

    #[test]
    fn insert_past_capacity_returns_capacity_error_instead_of_panicking() {
        let dim = 2;
        let capacity = 2; // one frozen point, one insertable slot
        let mut tags = TagMap::new(capacity);
        let mut store = VectorStore::new(dim, capacity);
        let mut neighbors = NeighborList::new(capacity, 4);
        let frozen = tags.reserve_frozen(1);
        store.write(frozen[0], &[0.0, 0.0]).unwrap();
        let config = test_config();

        insert_point(
            1,
            &[1.0, 1.0],
            &mut tags,
            &mut store,
            &mut neighbors,
            &frozen,
            &config,
            |_| false,
        )
        .unwrap();

        let err = insert_point(
            2,
            &[2.0, 2.0],
            &mut tags,
            &mut store,
            &mut neighbors,
            &frozen,
            &config,
            |_| false,
        )
        .unwrap_err();
        assert_eq!(err, InsertError::Tag(TagError::Capacity { capacity }));
    }

    proptest::proptest! {
        #[test]
        fn degree_bound_no_self_loops_no_duplicates_hold_for_any_insert_order(
            coords in proptest::collection::vec((-50i32..50, -50i32..50), 1..40)
        ) {
            let dim = 2;
            let capacity = coords.len() + 8;
            let mut tags = TagMap::new(capacity);
            let mut store = VectorStore::new(dim, capacity);
            let mut neighbors = NeighborList::new(capacity, 4);
            let frozen = tags.reserve_frozen(1);
            store.write(frozen[0], &[0.0, 0.0]).unwrap();
            let config = test_config();

            let mut slots = Vec::with_capacity(coords.len());
            for (i, (x, y)) in coords.iter().enumerate() {
                let tag = i as u32 + 1;
                let vector = [*x as f32, *y as f32];
                let slot = insert_point(
                    tag,
                    &vector,
                    &mut tags,
                    &mut store,
                    &mut neighbors,
                    &frozen,
                    &config,
                    |_| false,
                )
                .unwrap();
                slots.push(slot);
            }

            for &slot in slots.iter().chain(frozen.iter()) {
                let row = neighbors.neighbors(slot);
                proptest::prop_assert!(row.len() <= config.max_degree as usize);
                proptest::prop_assert!(!row.contains(&(slot as u32)));
                let mut sorted = row.to_vec();
                sorted.sort_unstable();
                sorted.dedup();
                proptest::prop_assert_eq!(sorted.len(), row.len());
            }
        }
    }
}
