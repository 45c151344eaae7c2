//! Robust prune (C6): the α-RNG diversity rule. Accepts a candidate into
//! the neighbor list unless some already-accepted neighbor is closer to
//! it than `alpha` times its distance to the query point, which keeps
//! the resulting edge set both short and directionally diverse.

use crate::metric::DistFn;
use crate::search::Candidate;
use crate::store::VectorStore;

/// Selects at most `r` survivors from `candidates` under the α-RNG rule.
///
/// `p` is the slot the pruned list will belong to; `candidates` is
/// distance-to-`p` scored. Candidates are considered in ascending
/// distance order (ties broken by slot ID, per [`Candidate`]'s `Ord`);
/// each accepted candidate `q` eliminates every remaining candidate `r`
/// with `alpha * dist(q, r) <= dist(p, r)`.
///
/// # Panics
///
/// Panics if `alpha < 1.0` — callers must validate configuration before
/// calling this (see [`crate::config::DriverConfig::validate`]).
#[must_use]
pub fn robust_prune(
    dist_fn: DistFn,
    store: &VectorStore,
    p: usize,
    candidates: &[Candidate],
    r: usize,
    alpha: f32,
) -> Vec<u32> {
    assert!(alpha >= 1.0, "alpha must be >= 1.0, got {alpha}");

    let mut remaining: Vec<Candidate> = candidates.iter().copied().filter(|c| c.slot != p).collect();
    remaining.sort();

    let mut chosen: Vec<u32> = Vec::new();
    let mut i = 0;
    while i < remaining.len() && chosen.len() < r {
        let q = remaining[i];
        chosen.push(q.slot as u32);
        let q_vec = store.get(q.slot);
        remaining = remaining
            .into_iter()
            .skip(i + 1)
            .filter(|r_cand| {
                let dist_q_r = dist_fn.distance(q_vec, store.get(r_cand.slot));
                alpha * dist_q_r > r_cand.dist
            })
            .collect();
        i = 0;
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_store() -> VectorStore {
        // Five collinear points at x = 0, 1, 2, 3, 10 and `p` implicitly at x=0.
        let mut store = VectorStore::new(1, 5);
        for (slot, x) in [0.0, 1.0, 2.0, 3.0, 10.0].into_iter().enumerate() {
            store.write(slot, &[x]).unwrap();
        }
        store
    }

    fn candidate(store: &VectorStore, p: usize, slot: usize) -> Candidate {
        Candidate {
            slot,
            dist: DistFn::L2.distance(store.get(p), store.get(slot)),
        }
    }

    #[test]
    fn respects_hard_degree_bound() {
        let store = grid_store();
        let p = 0;
        let candidates: Vec<Candidate> = (1..5).map(|s| candidate(&store, p, s)).collect();
        let chosen = robust_prune(DistFn::L2, &store, p, &candidates, 2, 1.0);
        assert!(chosen.len() <= 2);
    }

    #[test]
    fn alpha_one_drops_dominated_candidates() {
        // At alpha=1.0, slot 1 (closest) should dominate slot 2 (covered
        // since 1.0 * dist(1,2) <= dist(0,2): dist(1,2)=1, dist(0,2)=4).
        let store = grid_store();
        let p = 0;
        let candidates: Vec<Candidate> = (1..4).map(|s| candidate(&store, p, s)).collect();
        let chosen = robust_prune(DistFn::L2, &store, p, &candidates, 3, 1.0);
        assert!(chosen.contains(&1));
        assert!(!chosen.contains(&2));
    }

    #[test]
    fn larger_alpha_retains_more_candidates() {
        let store = grid_store();
        let p = 0;
        let candidates: Vec<Candidate> = (1..4).map(|s| candidate(&store, p, s)).collect();
        let chosen = robust_prune(DistFn::L2, &store, p, &candidates, 3, 1.2);
        assert!(chosen.len() >= 2);
    }

    #[test]
    fn excludes_p_itself_if_present() {
        let store = grid_store();
        let p = 0;
        let mut candidates: Vec<Candidate> = (1..4).map(|s| candidate(&store, p, s)).collect();
        candidates.push(Candidate { slot: p, dist: 0.0 });
        let chosen = robust_prune(DistFn::L2, &store, p, &candidates, 3, 1.0);
        assert!(!chosen.contains(&(p as u32)));
    }

    #[test]
    #[should_panic(expected = "alpha must be")]
    fn panics_on_alpha_below_one() {
        let store = grid_store();
        let candidates = vec![candidate(&store, 0, 1)];
        robust_prune(DistFn::L2, &store, 0, &candidates, 2, 0.5);
    }
}
