//! Driver configuration.

use crate::error::ConfigError;
use crate::metric::DistFn;

/// Scalar element kind of the source vector file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// 8-bit signed integer components.
    Int8,
    /// 8-bit unsigned integer components.
    Uint8,
    /// 32-bit IEEE-754 float components.
    Float,
}

/// Full configuration for the streaming driver (C9).
///
/// `new` fills in the documented defaults; `validate` enforces the
/// documented validation rules.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Scalar kind of the source file.
    pub data_type: DataType,
    /// Distance function used for search and pruning.
    pub dist_fn: DistFn,
    /// Path to the binary vector file.
    pub data_path: String,
    /// Prefix for snapshot filenames.
    pub index_path_prefix: String,
    /// Max out-degree bound (`R`).
    pub max_degree: u32,
    /// Build-time beam width (`L`), must be `>= max_degree`.
    pub l_build: u32,
    /// Prune diversity parameter (`alpha`), must be `>= 1.0`.
    pub alpha: f32,
    /// Thread pool size; `0` means "use available parallelism".
    pub num_threads: usize,
    /// Initial prefix of the source file ignored for inserts.
    pub points_to_skip: u64,
    /// Upper bound on inserts; `0` means "all remaining points".
    pub max_points_to_insert: u64,
    /// Size of the initial batch build.
    pub beginning_index_size: u64,
    /// Insert batch size per checkpoint.
    pub points_per_checkpoint: u64,
    /// Checkpoints between snapshots; `0` disables periodic snapshots.
    pub checkpoints_per_snapshot: u64,
    /// Width of the delete window starting at `points_to_skip`.
    pub points_to_delete_from_beginning: u64,
    /// Run deletion concurrently with subsequent insert checkpoints.
    pub do_concurrent: bool,
    /// Cumulative insert count at which the delete window triggers.
    pub start_deletes_after: u64,
    /// Norm of the random frozen point when `beginning_index_size == 0`.
    pub start_point_norm: f32,
}

impl DriverConfig {
    /// Constructs a config with the documented defaults for the optional fields.
    #[must_use]
    pub fn new(
        data_path: String,
        index_path_prefix: String,
        points_to_skip: u64,
        beginning_index_size: u64,
        points_per_checkpoint: u64,
        checkpoints_per_snapshot: u64,
        points_to_delete_from_beginning: u64,
    ) -> Self {
        Self {
            data_type: DataType::Float,
            dist_fn: DistFn::L2,
            data_path,
            index_path_prefix,
            max_degree: 64,
            l_build: 100,
            alpha: 1.2,
            num_threads: 0,
            points_to_skip,
            max_points_to_insert: 0,
            beginning_index_size,
            points_per_checkpoint,
            checkpoints_per_snapshot,
            points_to_delete_from_beginning,
            do_concurrent: false,
            start_deletes_after: 0,
            start_point_norm: 0.0,
        }
    }

    /// Validates the configuration against the documented validation rules.
    ///
    /// `file_npts` is the vector count declared by the source file's
    /// header, used to validate `points_to_skip`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any validation rule is violated.
    pub fn validate(&self, file_npts: u64) -> Result<(), ConfigError> {
        if self.beginning_index_size == 0 && self.start_point_norm <= 0.0 {
            return Err(ConfigError::MissingStartPointNorm);
        }
        if self.points_to_skip > file_npts {
            return Err(ConfigError::SkipExceedsFile {
                points_to_skip: self.points_to_skip,
                file_npts,
            });
        }
        if self.alpha < 1.0 {
            return Err(ConfigError::AlphaTooSmall(self.alpha));
        }
        if self.max_degree == 0 || self.l_build < self.max_degree {
            return Err(ConfigError::InvalidDegreeBound {
                r: self.max_degree,
                l: self.l_build,
            });
        }
        Ok(())
    }

    /// Clamps `beginning_index_size` to `max_points_to_insert` with a
    /// warning, rather than rejecting the configuration outright.
    pub fn clamp_beginning_index_size(&mut self) {
        if self.max_points_to_insert > 0 && self.beginning_index_size > self.max_points_to_insert {
            log::warn!(
                "beginning_index_size ({}) exceeds max_points_to_insert ({}); clamping",
                self.beginning_index_size,
                self.max_points_to_insert
            );
            self.beginning_index_size = self.max_points_to_insert;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> DriverConfig {
        DriverConfig::new("data.bin".into(), "idx".into(), 0, 1000, 500, 2, 0)
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = base_config();
        assert_eq!(cfg.max_degree, 64);
        assert_eq!(cfg.l_build, 100);
        assert!((cfg.alpha - 1.2).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_zero_begin_without_norm() {
        let mut cfg = base_config();
        cfg.beginning_index_size = 0;
        assert_eq!(cfg.validate(10_000), Err(ConfigError::MissingStartPointNorm));
    }

    #[test]
    fn accepts_zero_begin_with_norm() {
        let mut cfg = base_config();
        cfg.beginning_index_size = 0;
        cfg.start_point_norm = 1.0;
        assert!(cfg.validate(10_000).is_ok());
    }

    #[test]
    fn rejects_skip_beyond_file() {
        let mut cfg = base_config();
        cfg.points_to_skip = 20_000;
        assert!(matches!(
            cfg.validate(10_000),
            Err(ConfigError::SkipExceedsFile { .. })
        ));
    }

    #[test]
    fn clamp_warns_and_reduces() {
        let mut cfg = base_config();
        cfg.max_points_to_insert = 100;
        cfg.clamp_beginning_index_size();
        assert_eq!(cfg.beginning_index_size, 100);
    }
}
