//! Neighbor list (C3): per-slot outbound edges with a capacity bound.
//!
//! The graph is single-layer with one hard degree bound `R`, and insert
//! transiently lets a handful of slots exceed `R` up to a candidate cap
//! `C` before re-pruning (C7 step 5). A fixed-stride flat buffer can't
//! host that overflow without disturbing every other slot's row, so each
//! slot gets its own growable `Vec<u32>` instead.

/// C3: one outbound edge list per slot, each bounded by `r_max` except
/// transiently during insert back-edge propagation.
pub struct NeighborList {
    r_max: usize,
    rows: Vec<Vec<u32>>,
}

impl NeighborList {
    /// Creates a neighbor list for `capacity` slots with out-degree bound `r_max`.
    #[must_use]
    pub fn new(capacity: usize, r_max: usize) -> Self {
        Self {
            r_max,
            rows: vec![Vec::new(); capacity],
        }
    }

    /// Maximum out-degree bound (`R`).
    #[must_use]
    pub fn r_max(&self) -> usize {
        self.r_max
    }

    /// Returns the current outbound neighbors of `slot`.
    #[must_use]
    pub fn neighbors(&self, slot: usize) -> &[u32] {
        &self.rows[slot]
    }

    /// Current out-degree of `slot`.
    #[must_use]
    pub fn degree_of(&self, slot: usize) -> usize {
        self.rows[slot].len()
    }

    /// Overwrites the outbound list of `slot` with `new_neighbors`.
    ///
    /// Enforces the no-self-loop and no-duplicate invariants
    /// in debug builds; callers (robust prune) are responsible for
    /// upholding them in release builds since this is a hot path.
    ///
    /// # Panics
    ///
    /// Panics (debug only) if `new_neighbors` contains `slot` itself or a
    /// duplicate.
    pub fn set_neighbors(&mut self, slot: usize, new_neighbors: &[u32]) {
        debug_assert!(
            !new_neighbors.contains(&(slot as u32)),
            "self-loop on slot {slot}"
        );
        debug_assert!(
            {
                let mut sorted = new_neighbors.to_vec();
                sorted.sort_unstable();
                sorted.windows(2).all(|w| w[0] != w[1])
            },
            "duplicate neighbor in list for slot {slot}"
        );
        self.rows[slot] = new_neighbors.to_vec();
    }

    /// Appends `target` to `slot`'s outbound list without pruning,
    /// allowing the list to transiently exceed `r_max` up to `cap`
    /// (the candidate cap `C`).
    ///
    /// Returns `false` without modifying state if `target` is already
    /// present, equals `slot` (self-loop), or the row is already at `cap`.
    pub fn append_transient(&mut self, slot: usize, target: u32, cap: usize) -> bool {
        if target == slot as u32 {
            return false;
        }
        let row = &mut self.rows[slot];
        if row.len() >= cap || row.contains(&target) {
            return false;
        }
        row.push(target);
        true
    }

    /// Clears `slot`'s outbound list (a deleted slot's list is
    /// discarded during consolidation).
    pub fn clear(&mut self, slot: usize) {
        self.rows[slot].clear();
    }

    /// Every slot's outbound list, in slot order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<u32>] {
        &self.rows
    }

    /// Rebuilds a neighbor list directly from a snapshot's rows.
    #[must_use]
    pub fn from_rows(r_max: usize, rows: Vec<Vec<u32>>) -> Self {
        Self { r_max, rows }
    }
}
