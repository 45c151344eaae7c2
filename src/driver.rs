//! Streaming driver (C9): orchestrates the initial batch build,
//! checkpointed inserts, the optional delete window, and periodic
//! snapshots over a [`StreamingIndex`].
//!
//! The per-checkpoint parallel-for reuses the optional-`rayon`-behind-a-
//! feature idiom also used in `delete.rs`, so the same binary can run
//! single- or multi-threaded checkpoints depending on the `parallel`
//! feature.

use crate::config::DriverConfig;
use crate::delete::ConsolidateReport;
use crate::error::{IndexError, PersistenceError};
use crate::index::StreamingIndex;
use crate::metric::DistFn;
use crate::vecfile::VecFile;
use rand::Rng;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Summary of a completed driver run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverReport {
    /// Occupied slots minus frozen slots, at the end of the run.
    pub active_points: usize,
    /// Configured slot capacity.
    pub max_points: usize,
    /// Free slot count at the end of the run.
    pub empty_slots: usize,
    /// Number of checkpoints completed.
    pub checkpoints_run: u64,
    /// Number of snapshots written (periodic plus the final one).
    pub snapshots_written: u64,
}

/// Runs the streaming driver to completion.
///
/// Builds an index from `config.data_path`, inserts points per the
/// configured schedule, optionally runs the delete window, and writes
/// periodic and final snapshots under `config.index_path_prefix`.
///
/// # Errors
///
/// Returns [`IndexError::InvalidConfig`] if the configuration fails
/// validation, [`IndexError::Persistence`] on vector-file or snapshot
/// I/O failure, or any error raised by an individual insert.
pub fn run(mut config: DriverConfig) -> Result<(Arc<StreamingIndex>, DriverReport), IndexError> {
    config.clamp_beginning_index_size();
    let file = VecFile::read(Path::new(&config.data_path), config.data_type)?;
    config.validate(file.npts())?;

    let dim = file.dim();
    let max_to_insert = effective_max_to_insert(&config, file.npts());
    let capacity = 1 + max_to_insert as usize;
    let index = Arc::new(StreamingIndex::new(dim, capacity, config.clone()));

    let mut total_inserted: u64 = 0;
    let mut checkpoints_run: u64 = 0;
    let mut snapshots_written: u64 = 0;
    let mut delete_triggered = false;
    let mut delete_handle: Option<JoinHandle<Result<ConsolidateReport, IndexError>>> = None;

    if config.beginning_index_size > 0 {
        let batch = load_batch(&file, config.points_to_skip, config.beginning_index_size);
        let medoid = approximate_medoid(config.dist_fn, &batch);
        index.reserve_frozen_points(&[medoid]);
        index.build_initial_batch(&batch)?;
        total_inserted += config.beginning_index_size;
        log::info!("initial batch of {} points built", config.beginning_index_size);
    } else {
        let random_point = random_unit_vector(dim, config.start_point_norm);
        index.reserve_frozen_points(&[random_point]);
        log::info!("beginning_index_size is 0; frozen point seeded from a random unit vector");
    }

    try_trigger_delete(
        &index,
        &config,
        total_inserted,
        &mut delete_triggered,
        &mut delete_handle,
    )?;

    let mut next_row = config.points_to_skip + config.beginning_index_size;
    while total_inserted < max_to_insert {
        let remaining = max_to_insert - total_inserted;
        let batch_size = remaining.min(config.points_per_checkpoint.max(1));
        let batch = load_batch(&file, next_row, batch_size);

        insert_checkpoint(&index, &batch)?;

        next_row += batch_size;
        total_inserted += batch_size;
        checkpoints_run += 1;
        log::info!(
            "checkpoint {checkpoints_run}: {total_inserted}/{max_to_insert} points inserted"
        );

        try_trigger_delete(
            &index,
            &config,
            total_inserted,
            &mut delete_triggered,
            &mut delete_handle,
        )?;

        if config.checkpoints_per_snapshot > 0 && checkpoints_run % config.checkpoints_per_snapshot == 0
        {
            write_stage_snapshot(&index, &config, ".inc-", total_inserted)?;
            snapshots_written += 1;
        }
    }

    if let Some(handle) = delete_handle.take() {
        handle.join().expect("delete task panicked")?;
    }

    // The final snapshot is always written, whether or not a delete
    // window actually fired, so a run always lands on a named stage.
    let final_stage = if config.do_concurrent {
        ".after-concurrent-delete-"
    } else {
        ".after-delete-"
    };
    write_stage_snapshot(&index, &config, final_stage, total_inserted)?;
    snapshots_written += 1;

    let report = DriverReport {
        active_points: index.len(),
        max_points: index.capacity(),
        empty_slots: index.free_count(),
        checkpoints_run,
        snapshots_written,
    };
    Ok((index, report))
}

fn effective_max_to_insert(config: &DriverConfig, file_npts: u64) -> u64 {
    if config.max_points_to_insert > 0 {
        config.max_points_to_insert
    } else {
        file_npts.saturating_sub(config.points_to_skip)
    }
}

/// Loads `count` vectors starting at file row `start`, tagging each with
/// its row index plus 1 (tag 0 is reserved to mean "absent").
fn load_batch(file: &VecFile, start: u64, count: u64) -> Vec<(u32, Vec<f32>)> {
    (0..count)
        .map(|i| {
            let row = start + i;
            (row as u32 + 1, file.vector(row).to_vec())
        })
        .collect()
}

/// Picks the batch vector closest to the batch centroid as an
/// approximate medoid of the initial batch, avoiding the O(n^2) cost of
/// an exact medoid.
fn approximate_medoid(dist_fn: DistFn, batch: &[(u32, Vec<f32>)]) -> Vec<f32> {
    let dim = batch[0].1.len();
    let mut centroid = vec![0.0f32; dim];
    for (_, v) in batch {
        for (c, x) in centroid.iter_mut().zip(v) {
            *c += x;
        }
    }
    let n = batch.len() as f32;
    for c in &mut centroid {
        *c /= n;
    }

    batch
        .iter()
        .min_by(|(_, a), (_, b)| {
            dist_fn
                .distance(a, &centroid)
                .total_cmp(&dist_fn.distance(b, &centroid))
        })
        .map(|(_, v)| v.clone())
        .expect("initial batch is non-empty")
}

/// A random unit vector scaled to `norm`, used as the frozen entry point
/// when `beginning_index_size == 0`.
fn random_unit_vector(dim: u32, norm: f32) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    let mut v: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
    let magnitude = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in &mut v {
            *x *= norm / magnitude;
        }
    }
    v
}

/// Lazily deletes tags `[skip+1, skip+D+1)` then consolidates.
fn delete_window(index: &StreamingIndex, config: &DriverConfig) -> Result<ConsolidateReport, IndexError> {
    let start = config.points_to_skip + 1;
    let end = start + config.points_to_delete_from_beginning;
    for tag in start..end {
        index.delete(tag as u32)?;
    }
    Ok(index.consolidate())
}

/// Triggers the delete window at most once: runs synchronously in
/// sequential mode, or spawns a background thread joined before the
/// final snapshot in concurrent mode.
fn try_trigger_delete(
    index: &Arc<StreamingIndex>,
    config: &DriverConfig,
    total_inserted: u64,
    delete_triggered: &mut bool,
    delete_handle: &mut Option<JoinHandle<Result<ConsolidateReport, IndexError>>>,
) -> Result<(), IndexError> {
    if *delete_triggered {
        return Ok(());
    }
    if config.points_to_delete_from_beginning == 0 || total_inserted < config.start_deletes_after {
        return Ok(());
    }
    *delete_triggered = true;

    if config.do_concurrent {
        let index = Arc::clone(index);
        let config = config.clone();
        *delete_handle = Some(std::thread::spawn(move || delete_window(&index, &config)));
        log::info!("concurrent delete task launched at {total_inserted} points inserted");
    } else {
        let report = delete_window(index, config)?;
        log::info!(
            "delete window consolidated: {} slots released",
            report.slots_released
        );
    }
    Ok(())
}

/// Inserts `batch` into `index`, one point per task, in parallel when
/// the `parallel` feature is enabled.
#[cfg(feature = "parallel")]
fn insert_checkpoint(index: &StreamingIndex, batch: &[(u32, Vec<f32>)]) -> Result<(), IndexError> {
    use rayon::prelude::*;
    batch
        .par_iter()
        .try_for_each(|(tag, vector)| index.insert(*tag, vector).map(|_| ()))
}

#[cfg(not(feature = "parallel"))]
fn insert_checkpoint(index: &StreamingIndex, batch: &[(u32, Vec<f32>)]) -> Result<(), IndexError> {
    for (tag, vector) in batch {
        index.insert(*tag, vector)?;
    }
    Ok(())
}

/// Snapshot filename: `<prefix><stage>skip<S>-del<D>-<threshold>`.
fn snapshot_path(config: &DriverConfig, stage: &str, threshold: u64) -> String {
    format!(
        "{}{}skip{}-del{}-{}",
        config.index_path_prefix,
        stage,
        config.points_to_skip,
        config.points_to_delete_from_beginning,
        threshold
    )
}

fn write_stage_snapshot(
    index: &StreamingIndex,
    config: &DriverConfig,
    stage: &str,
    threshold: u64,
) -> Result<(), IndexError> {
    let path = snapshot_path(config, stage, threshold);
    let mut file = std::fs::File::create(&path).map_err(PersistenceError::Io)?;
    index.snapshot(&mut file)?;
    log::info!("wrote snapshot {path}");
    Ok(())
}
