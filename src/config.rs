// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Run configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Detail level at which surfaces are always triangulated.
pub const HIGH_DETAIL_LOD: f64 = 2.2;

/// Tolerance for comparing detail levels.
pub const LOD_EPSILON: f64 = 1e-8;

/// Default offset distance for the Minkowski expansion.
pub const DEFAULT_OFFSET_DISTANCE: f64 = 0.1;

/// Default lattice cell size.
pub const DEFAULT_CELL_SIZE: f64 = 0.1;

/// Largest distance of a vertex from its surface plane, in metres.
pub const DEFAULT_PLANARITY_TOLERANCE: f64 = 0.01;

/// Configuration of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// CityJSON document to read
    pub input: PathBuf,
    /// Objects to consolidate; empty selects every object at `detail_level`
    pub object_ids: Vec<String>,
    /// Where the exterior shell of the big solid is written
    pub output: PathBuf,
    /// Where the convex hull is written; derived from `output` when unset
    pub hull_output: Option<PathBuf>,
    /// City object id used in the written documents
    pub output_object_id: String,
    /// Selected geometric detail tier
    pub detail_level: f64,
    /// Triangulate surfaces even below the high-detail level
    pub triangulation_enabled: bool,
    /// Offset every solid before folding it into a running total
    pub minkowski_enabled: bool,
    /// Offset distance, run-wide
    pub offset_distance: f64,
    /// Also compute and write the convex hull of the big solid
    pub convex_hull_enabled: bool,
    /// Two-lane fork-join instead of a single sequential fold
    pub multithreading_enabled: bool,
    /// One task per record appending into a shared pool
    pub per_object_ingestion: bool,
    /// Bound on concurrent tasks in per-object ingestion
    pub max_workers: Option<usize>,
    /// Lattice cell size of the solid kernel
    pub cell_size: f64,
    /// Non-planar surfaces beyond this deviation fail to build unless triangulated
    pub planarity_tolerance: f64,
    /// Report the Hausdorff distance of the exterior shell
    pub hausdorff_enabled: bool,
    /// Progress bar during per-object ingestion
    pub show_progress: bool,
    /// Verbose output
    pub verbose: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/input.city.json"),
            object_ids: Vec::new(),
            output: PathBuf::from("data/bigsolid.city.json"),
            hull_output: None,
            output_object_id: "bigsolid".to_string(),
            detail_level: HIGH_DETAIL_LOD,
            triangulation_enabled: false,
            minkowski_enabled: true,
            offset_distance: DEFAULT_OFFSET_DISTANCE,
            convex_hull_enabled: false,
            multithreading_enabled: true,
            per_object_ingestion: false,
            max_workers: None,
            cell_size: DEFAULT_CELL_SIZE,
            planarity_tolerance: DEFAULT_PLANARITY_TOLERANCE,
            hausdorff_enabled: false,
            show_progress: false,
            verbose: false,
        }
    }
}

/// Whether `lod` is the high-detail tier.
pub fn is_high_detail(lod: f64) -> bool {
    (lod - HIGH_DETAIL_LOD).abs() < LOD_EPSILON
}

impl PipelineConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Reads `path` when given, otherwise `bigsolid.toml` if present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new("bigsolid.toml").exists() => Self::from_file("bigsolid.toml")?,
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `BIGSOLID_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(input) = lookup("BIGSOLID_INPUT") {
            self.input = PathBuf::from(input);
        }

        if let Some(output) = lookup("BIGSOLID_OUTPUT") {
            self.output = PathBuf::from(output);
        }

        if let Some(lod) = lookup("BIGSOLID_LOD") {
            self.detail_level = parse_override("BIGSOLID_LOD", &lod)?;
        }

        if let Some(cell_size) = lookup("BIGSOLID_CELL_SIZE") {
            self.cell_size = parse_override("BIGSOLID_CELL_SIZE", &cell_size)?;
        }

        if let Some(multithreading) = lookup("BIGSOLID_MULTITHREADING") {
            self.multithreading_enabled =
                parse_override("BIGSOLID_MULTITHREADING", &multithreading)?;
        }

        if let Some(workers) = lookup("BIGSOLID_WORKERS") {
            self.max_workers = Some(parse_override("BIGSOLID_WORKERS", &workers)?);
        }

        if let Some(verbose) = lookup("BIGSOLID_VERBOSE") {
            self.verbose = parse_override("BIGSOLID_VERBOSE", &verbose)?;
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content).map_err(|source| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source,
        })
    }

    /// Reject values the kernel cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "cell_size must be positive, got {}",
                self.cell_size
            )));
        }
        if !(self.offset_distance.is_finite() && self.offset_distance >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "offset_distance must be non-negative, got {}",
                self.offset_distance
            )));
        }
        if !(self.planarity_tolerance.is_finite() && self.planarity_tolerance >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "planarity_tolerance must be non-negative, got {}",
                self.planarity_tolerance
            )));
        }
        if !self.detail_level.is_finite() {
            return Err(ConfigError::Invalid("detail_level must be finite".into()));
        }
        if self.max_workers == Some(0) {
            return Err(ConfigError::Invalid("max_workers must be at least 1".into()));
        }
        Ok(())
    }

    /// Whether records are triangulated before voxelization.
    ///
    /// Always on at the high-detail level, otherwise driven by the toggle.
    pub fn triangulate(&self) -> bool {
        is_high_detail(self.detail_level) || self.triangulation_enabled
    }

    /// Offset distance to apply before folding, if the offset step is on.
    pub fn offset(&self) -> Option<f64> {
        self.minkowski_enabled.then_some(self.offset_distance)
    }

    /// Convex hull output path, `<stem>_convex.<ext>` next to `output` unless set.
    pub fn hull_output_path(&self) -> PathBuf {
        if let Some(path) = &self.hull_output {
            return path.clone();
        }

        let file_name = self
            .output
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bigsolid.city.json".to_string());
        let hull_name = match file_name.split_once('.') {
            Some((stem, ext)) => format!("{stem}_convex.{ext}"),
            None => format!("{file_name}_convex"),
        };
        self.output.with_file_name(hull_name)
    }
}

fn parse_override<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Override {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_triangulation_forced_at_high_detail() {
        let config = PipelineConfig::default();
        assert!(config.triangulate());

        let config = PipelineConfig {
            detail_level: 1.2,
            ..PipelineConfig::default()
        };
        assert!(!config.triangulate());

        let config = PipelineConfig {
            detail_level: 1.3,
            triangulation_enabled: true,
            ..PipelineConfig::default()
        };
        assert!(config.triangulate());
    }

    #[test]
    fn test_offset_toggle() {
        let mut config = PipelineConfig::default();
        assert_eq!(config.offset(), Some(0.1));
        config.minkowski_enabled = false;
        assert_eq!(config.offset(), None);
    }

    #[test]
    fn test_validate() {
        assert!(PipelineConfig::default().validate().is_ok());

        let config = PipelineConfig {
            cell_size: 0.0,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = PipelineConfig {
            max_workers: Some(0),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            offset_distance: -0.5,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            planarity_tolerance: f64::NAN,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("BIGSOLID_INPUT", "city.json"),
            ("BIGSOLID_CELL_SIZE", "0.25"),
            ("BIGSOLID_MULTITHREADING", "false"),
            ("BIGSOLID_WORKERS", "4"),
        ]
        .into_iter()
        .collect();

        let mut config = PipelineConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.input, PathBuf::from("city.json"));
        assert_eq!(config.cell_size, 0.25);
        assert!(!config.multithreading_enabled);
        assert_eq!(config.max_workers, Some(4));
    }

    #[test]
    fn test_bad_env_override() {
        let mut config = PipelineConfig::default();
        let result = config.apply_env(|key| (key == "BIGSOLID_LOD").then(|| "high".to_string()));
        assert!(matches!(
            result,
            Err(ConfigError::Override { key: "BIGSOLID_LOD", .. })
        ));
    }

    #[test]
    fn test_bad_verbose_override() {
        let mut config = PipelineConfig::default();
        let result = config.apply_env(|key| (key == "BIGSOLID_VERBOSE").then(|| "loud".to_string()));
        assert!(matches!(
            result,
            Err(ConfigError::Override { key: "BIGSOLID_VERBOSE", .. })
        ));

        config
            .apply_env(|key| (key == "BIGSOLID_VERBOSE").then(|| "true".to_string()))
            .unwrap();
        assert!(config.verbose);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bigsolid.toml");

        let config = PipelineConfig {
            object_ids: vec!["NL.IMBAG.Pand.0503100000018412-0".into()],
            convex_hull_enabled: true,
            max_workers: Some(2),
            ..PipelineConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "detail_level = 1.3\nconvex_hull_enabled = true\n").unwrap();

        let loaded = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(loaded.detail_level, 1.3);
        assert!(loaded.convex_hull_enabled);
        assert_eq!(loaded.cell_size, DEFAULT_CELL_SIZE);
    }

    #[test]
    fn test_hull_output_path() {
        let config = PipelineConfig {
            output: PathBuf::from("out/building_18412_0.json"),
            ..PipelineConfig::default()
        };
        assert_eq!(
            config.hull_output_path(),
            PathBuf::from("out/building_18412_0_convex.json")
        );
    }
}
