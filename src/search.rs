//! Greedy search (C5): best-first beam traversal from frozen entry points
//! over a single-layer proximity graph, with tombstoned slots routed
//! through (to preserve graph connectivity) but never returned to the
//! caller.

use crate::metric::DistFn;
use crate::neighbors::NeighborList;
use crate::store::VectorStore;
use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::collections::HashSet;

/// One scored slot: a candidate discovered during search.
///
/// Ordered by distance ascending, then by slot ID ascending on ties —
/// a deterministic tie-break ("smaller slot ID wins").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// The slot this candidate refers to.
    pub slot: usize,
    /// Its distance to the query.
    pub dist: f32,
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then_with(|| self.slot.cmp(&other.slot))
    }
}

/// Result of a greedy search pass.
pub struct SearchResult {
    /// The `L` closest non-deleted slots discovered, sorted by distance.
    pub beam: Vec<Candidate>,
    /// Every slot whose distance to the query was computed, including
    /// deleted ones — the candidate set robust prune draws from.
    pub visited: Vec<Candidate>,
}

/// Runs best-first greedy search for `query` starting from `entry_slots`,
/// maintaining a beam of width `l`.
///
/// `is_deleted(slot)` reports whether a slot is in the delete set: such
/// slots are traversed (their edges are followed) but never placed in
/// the returned beam.
pub fn greedy_search(
    dist_fn: DistFn,
    store: &VectorStore,
    neighbors: &NeighborList,
    query: &[f32],
    entry_slots: &[usize],
    l: usize,
    is_deleted: impl Fn(usize) -> bool,
) -> SearchResult {
    let mut seen: HashSet<usize> = HashSet::new();
    let mut frontier: BinaryHeap<Reverse<Candidate>> = BinaryHeap::new();
    let mut results: BinaryHeap<Candidate> = BinaryHeap::new();
    let mut visited: Vec<Candidate> = Vec::new();

    for &slot in entry_slots {
        if seen.insert(slot) {
            let cand = Candidate {
                slot,
                dist: dist_fn.distance(query, store.get(slot)),
            };
            visited.push(cand);
            frontier.push(Reverse(cand));
            if !is_deleted(slot) {
                push_bounded(&mut results, cand, l);
            }
        }
    }

    while let Some(Reverse(current)) = frontier.pop() {
        if results.len() >= l {
            if let Some(worst) = results.peek() {
                if current.dist > worst.dist {
                    break;
                }
            }
        }

        for &neighbor in neighbors.neighbors(current.slot) {
            let neighbor = neighbor as usize;
            if !seen.insert(neighbor) {
                continue;
            }
            let cand = Candidate {
                slot: neighbor,
                dist: dist_fn.distance(query, store.get(neighbor)),
            };
            visited.push(cand);
            frontier.push(Reverse(cand));
            if !is_deleted(neighbor) {
                push_bounded(&mut results, cand, l);
            }
        }
    }

    let mut beam: Vec<Candidate> = results.into_vec();
    beam.sort();
    SearchResult { beam, visited }
}

/// Pushes `cand` into the max-heap `results`, evicting the current worst
/// entry if that keeps the heap within `cap`.
fn push_bounded(results: &mut BinaryHeap<Candidate>, cand: Candidate, cap: usize) {
    if results.len() < cap {
        results.push(cand);
    } else if let Some(worst) = results.peek() {
        if cand < *worst {
            results.pop();
            results.push(cand);
        }
    }
}
