//! A streaming (incremental) graph-based approximate nearest-neighbor
//! index core, in the Vamana/DiskANN family.
//!
//! The index maintains a directed proximity graph over fixed-dimension
//! vectors addressed through a tag↔slot indirection layer, supporting
//! three concurrent operations: batch build, point insertion, and lazy
//! deletion followed by batched consolidation. A small number of frozen
//! entry-point slots anchor greedy search into the graph.
//!
//! ## Example
//!
//! ```rust
//! use vamana_core::{DriverConfig, DistFn, StreamingIndex};
//!
//! let mut config = DriverConfig::new("x".into(), "y".into(), 0, 1, 1, 0, 0);
//! config.max_degree = 8;
//! config.l_build = 16;
//! config.dist_fn = DistFn::L2;
//!
//! let index = StreamingIndex::new(4, 32, config);
//! index.reserve_frozen_points(&[vec![0.0, 0.0, 0.0, 0.0]]);
//! index.insert(1, &[1.0, 0.0, 0.0, 0.0]).expect("insert");
//!
//! let results = index.search(&[1.0, 0.0, 0.0, 0.0], 1);
//! assert_eq!(results[0].0, 1);
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

/// Driver configuration.
pub mod config;
/// Streaming driver: checkpointed inserts, delete window, snapshots (C9).
pub mod driver;
/// Lazy delete and batched consolidation (C8).
pub mod delete;
/// Unified error hierarchy.
pub mod error;
/// Insert engine: allocate, search, prune, back-edge, publish (C7).
pub mod insert;
/// Top-level index wiring under the documented lock hierarchy (§5).
pub mod index;
/// Distance kernels (C4).
pub mod metric;
/// Per-slot outbound neighbor lists (C3).
pub mod neighbors;
/// Snapshot file format and reader/writer (C10).
pub mod persistence;
/// Robust prune / α-RNG rule (C6).
pub mod prune;
/// Greedy best-first search (C5).
pub mod search;
/// Aligned, slot-indexed vector storage (C1).
pub mod store;
/// Bidirectional tag↔slot map with a free list (C2).
pub mod tags;
/// Binary vector file reader (external interface, §6).
pub mod vecfile;

pub use config::{DataType, DriverConfig};
pub use driver::{run, DriverReport};
pub use error::IndexError;
pub use index::StreamingIndex;
pub use metric::DistFn;

/// The crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version string.
#[must_use]
pub fn version() -> &'static str {
    VERSION
}
