//! Delete engine: lazy marking (C8.1) and batched consolidation (C8.2).
//!
//! A deleted tag is tombstoned immediately (C8.1) but its slot stays
//! live in the graph until consolidation (C8.2) repairs every inbound
//! edge by reconnecting through the deleted slot's own out-neighbors,
//! then releases the slot back to the free list.

use crate::config::DriverConfig;
use crate::error::TagError;
use crate::metric::DistFn;
use crate::neighbors::NeighborList;
use crate::prune::robust_prune;
use crate::search::Candidate;
use crate::store::VectorStore;
use crate::tags::TagMap;
use std::collections::HashSet;
use std::time::Instant;

/// C8.1: moves `tag`'s slot into the delete set.
///
/// Leaves the vector, its outbound list, and all inbound edges intact —
/// only the `tag -> slot` binding is removed.
///
/// # Errors
///
/// Returns [`TagError::UnknownTag`] if `tag` is not currently bound.
pub fn lazy_delete(
    tag: u32,
    tags: &mut TagMap,
    delete_set: &mut HashSet<usize>,
) -> Result<(), TagError> {
    let slot = tags.unbind(tag)?;
    delete_set.insert(slot);
    Ok(())
}

/// Report returned by [`consolidate_deletes`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsolidateReport {
    /// Occupied slots minus frozen slots, after this pass.
    pub active_points: usize,
    /// Configured slot capacity.
    pub max_points: usize,
    /// Free slot count after this pass.
    pub empty_slots: usize,
    /// Slots released to the free list by this pass.
    pub slots_released: usize,
    /// Remaining delete-set size (always 0 on success).
    pub delete_set_size: usize,
    /// Wall-clock duration of the pass, in seconds.
    pub time: f64,
}

/// C8.2: repairs every occupied slot's neighbor list to remove
/// references to `delete_set`, then releases deleted slots to the free
/// list.
///
/// `occupied_slots` must include frozen slots (they are repaired but
/// never released) and every currently tag-bound or delete-set slot.
#[allow(clippy::too_many_arguments)]
pub fn consolidate_deletes(
    dist_fn: DistFn,
    store: &VectorStore,
    neighbors: &mut NeighborList,
    tags: &mut TagMap,
    delete_set: &mut HashSet<usize>,
    occupied_slots: &[usize],
    frozen_slots: &[usize],
    config: &DriverConfig,
) -> ConsolidateReport {
    let started = Instant::now();
    let frozen: HashSet<usize> = frozen_slots.iter().copied().collect();
    let r = config.max_degree as usize;

    // Every occupied slot's repair only reads neighbor lists and the
    // store, and writes nothing but its own return value, so the pass
    // can run one task per slot in parallel; repairs are applied below
    // only after every task has finished reading.
    let neighbors_ref: &NeighborList = neighbors;
    let delete_set_ref: &HashSet<usize> = delete_set;
    let repairs: Vec<(usize, Vec<u32>)> = iterate(occupied_slots, config)
        .filter_map(|&p| {
            let p_neighbors = neighbors_ref.neighbors(p);
            let has_deleted_neighbor =
                p_neighbors.iter().any(|n| delete_set_ref.contains(&(*n as usize)));
            if !has_deleted_neighbor && p_neighbors.len() <= r {
                return None;
            }

            let mut expanded: HashSet<usize> = HashSet::new();
            for &n in p_neighbors {
                let n = n as usize;
                if delete_set_ref.contains(&n) {
                    for &two_hop in neighbors_ref.neighbors(n) {
                        let two_hop = two_hop as usize;
                        if !delete_set_ref.contains(&two_hop) && two_hop != p {
                            expanded.insert(two_hop);
                        }
                    }
                } else {
                    expanded.insert(n);
                }
            }

            if expanded.len() <= r && !has_deleted_neighbor {
                return None;
            }

            let p_vec = store.get(p);
            let candidates: Vec<Candidate> = expanded
                .into_iter()
                .map(|slot| Candidate {
                    slot,
                    dist: dist_fn.distance(p_vec, store.get(slot)),
                })
                .collect();
            let pruned = robust_prune(dist_fn, store, p, &candidates, r, config.alpha);
            Some((p, pruned))
        })
        .collect();

    for (p, new_neighbors) in repairs {
        neighbors.set_neighbors(p, &new_neighbors);
    }

    let slots_released = delete_set.len();
    for &slot in delete_set.iter() {
        neighbors.clear(slot);
        if !frozen.contains(&slot) {
            tags.release(slot);
        }
    }
    delete_set.clear();

    ConsolidateReport {
        active_points: tags.occupied_count(),
        max_points: tags.capacity(),
        empty_slots: tags.free_count(),
        slots_released,
        delete_set_size: delete_set.len(),
        time: started.elapsed().as_secs_f64(),
    }
}

#[cfg(feature = "parallel")]
fn iterate<'a>(
    slots: &'a [usize],
    _config: &DriverConfig,
) -> impl rayon::iter::ParallelIterator<Item = &'a usize> + 'a {
    use rayon::prelude::*;
    slots.par_iter()
}

#[cfg(not(feature = "parallel"))]
fn iterate<'a>(
    slots: &'a [usize],
    _config: &DriverConfig,
) -> impl Iterator<Item = &'a usize> + 'a {
    slots.iter()
}
