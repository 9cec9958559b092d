// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! End-to-end pipeline run
//!
//! Stages: parse, build (sequential, fork-join or per-object), extract,
//! optional convex hull, optional distance, write. Output files are written
//! only after every computation has succeeded.

use super::coordinator::FanOutCoordinator;
use super::lane::{run_lane, Lane, LaneSettings, LaneSummary, SkippedRecord};
use super::split::split;
use super::store::ObjectIngestion;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::geometry::{
    boundary, convex_hull, extract_shells, hausdorff_distance, Boundary, Shell, Solid, Topology,
};
use crate::io::{write_shell, CityJsonDocument};
use crate::kernel::{ColumnKernel, MergeReducer, SolidBuilder};
use crate::record::ObjectRecord;
use serde::{Serialize, Serializer};
use std::path::PathBuf;
use std::time::{Duration, Instant};

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

/// How records are turned into the big solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldMode {
    /// One lane, all records in order
    Sequential,
    /// Two lanes, one of them on a spawned thread
    ForkJoin,
    /// One task per record into a shared pool
    PerObject,
}

impl FoldMode {
    pub fn from_config(config: &PipelineConfig) -> Self {
        if config.per_object_ingestion {
            FoldMode::PerObject
        } else if config.multithreading_enabled {
            FoldMode::ForkJoin
        } else {
            FoldMode::Sequential
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FoldMode::Sequential => "sequential",
            FoldMode::ForkJoin => "fork-join",
            FoldMode::PerObject => "per-object",
        }
    }
}

/// The big solid and how it came about.
#[derive(Debug)]
pub struct Consolidation {
    pub big: Solid,
    pub mode: FoldMode,
    pub built: usize,
    /// Per-lane summaries; empty in per-object mode
    pub lanes: Vec<LaneSummary>,
    /// Skipped records in record order
    pub skipped: Vec<SkippedRecord>,
}

/// Build and fold `records` into one solid using the mode chosen by `config`.
pub fn consolidate<B, R>(
    records: &[ObjectRecord],
    builder: &B,
    reducer: &R,
    config: &PipelineConfig,
) -> Result<Consolidation, PipelineError>
where
    B: SolidBuilder + ?Sized,
    R: MergeReducer + ?Sized,
{
    let settings = LaneSettings::from(config);
    let mode = FoldMode::from_config(config);
    tracing::info!(
        mode = mode.as_str(),
        records = records.len(),
        triangulate = settings.triangulate,
        offset = ?settings.offset,
        "building solids"
    );

    let consolidation = match mode {
        FoldMode::Sequential => {
            let output = run_lane(Lane::Whole, records, 0, builder, reducer, &settings);
            Consolidation {
                big: output.total,
                mode,
                built: output.summary.built,
                skipped: output.summary.skipped.clone(),
                lanes: vec![output.summary],
            }
        }
        FoldMode::ForkJoin => {
            let (first, second) = split(records);
            let outcome = FanOutCoordinator::new(builder, reducer, settings).run(first, second)?;
            let lanes = outcome.lanes.to_vec();
            Consolidation {
                big: outcome.big,
                mode,
                built: lanes.iter().map(|lane| lane.built).sum(),
                skipped: lanes.iter().flat_map(|lane| lane.skipped.clone()).collect(),
                lanes,
            }
        }
        FoldMode::PerObject => {
            let outcome = ObjectIngestion::new(builder, reducer, settings)
                .with_max_workers(config.max_workers)
                .with_progress(config.show_progress)
                .run(records)?;
            Consolidation {
                big: outcome.big,
                mode,
                built: outcome.built,
                lanes: Vec::new(),
                skipped: outcome.skipped,
            }
        }
    };

    tracing::info!(
        built = consolidation.built,
        skipped = consolidation.skipped.len(),
        cells = consolidation.big.cell_count(),
        "big solid assembled"
    );
    Ok(consolidation)
}

/// Convex hull figures for the run report.
#[derive(Debug, Clone, Serialize)]
pub struct HullSummary {
    pub output: PathBuf,
    pub cells: u64,
    pub volume: f64,
    pub triangles: usize,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub mode: FoldMode,
    pub detail_level: f64,
    pub triangulated: bool,
    pub offset: Option<f64>,
    pub cell_size: f64,
    pub records: usize,
    pub built: usize,
    pub lanes: Vec<LaneSummary>,
    pub skipped: Vec<SkippedRecord>,
    pub cells: u64,
    pub volume: f64,
    pub topology: Topology,
    pub simple: bool,
    pub shells: usize,
    pub exterior_faces: usize,
    pub exterior_vertices: usize,
    pub hull: Option<HullSummary>,
    pub hausdorff_distance: Option<f64>,
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

impl RunReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Configured pipeline backed by the lattice kernel.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    kernel: ColumnKernel,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let kernel = ColumnKernel::from_config(&config);
        Ok(Self { config, kernel })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn kernel(&self) -> &ColumnKernel {
        &self.kernel
    }

    /// Read the selected records from the configured input.
    pub fn load_records(&self) -> Result<Vec<ObjectRecord>, PipelineError> {
        let document = CityJsonDocument::from_path(&self.config.input)?;
        let records = document.select(&self.config.object_ids, self.config.detail_level)?;
        tracing::info!(
            input = %self.config.input.display(),
            selected = records.len(),
            lod = self.config.detail_level,
            "records selected"
        );
        Ok(records)
    }

    pub fn run(&self) -> Result<RunReport, PipelineError> {
        let start = Instant::now();
        let records = self.load_records()?;
        self.run_records(&records, start)
    }

    /// Run every stage after parsing on already loaded records.
    pub fn run_records(&self, records: &[ObjectRecord], start: Instant) -> Result<RunReport, PipelineError> {
        let config = &self.config;
        let lattice = self.kernel.lattice();

        let consolidation = consolidate(records, &self.kernel, &self.kernel, config)?;
        let big = &consolidation.big;

        let Boundary { shells, topology } = boundary(big);
        let exterior = shells.first().ok_or(PipelineError::EmptyResult)?;
        tracing::info!(
            shells = shells.len(),
            volumes = topology.volumes,
            voids = topology.voids,
            simple = topology.is_simple(),
            "shells extracted"
        );

        let hull = if config.convex_hull_enabled {
            let hull = convex_hull(big, lattice)?;
            let shell = extract_shells(&hull.solid)
                .into_iter()
                .next()
                .ok_or_else(|| PipelineError::ConvexHull("hull has no boundary".to_string()))?;
            Some((hull, shell))
        } else {
            None
        };

        let hausdorff = if config.hausdorff_enabled {
            let reference = match &hull {
                Some((_, shell)) => shell.to_mesh(lattice),
                None => self.offset_exterior(big, config.offset_distance)?.to_mesh(lattice),
            };
            let distance = hausdorff_distance(&exterior.to_mesh(lattice), &reference)?;
            tracing::info!(distance, "hausdorff distance computed");
            Some(distance)
        } else {
            None
        };

        write_shell(
            &config.output,
            exterior,
            lattice,
            config.detail_level,
            &config.output_object_id,
        )?;

        let hull_summary = match hull {
            Some((hull, shell)) => {
                let output = config.hull_output_path();
                write_shell(
                    &output,
                    &shell,
                    lattice,
                    config.detail_level,
                    &format!("{}_convex", config.output_object_id),
                )?;
                Some(HullSummary {
                    output,
                    cells: hull.solid.cell_count(),
                    volume: hull.solid.volume(lattice),
                    triangles: hull.mesh.triangle_count(),
                })
            }
            None => None,
        };

        Ok(RunReport {
            input: config.input.clone(),
            output: config.output.clone(),
            mode: consolidation.mode,
            detail_level: config.detail_level,
            triangulated: config.triangulate(),
            offset: config.offset(),
            cell_size: lattice.cell_size(),
            records: records.len(),
            built: consolidation.built,
            lanes: consolidation.lanes.clone(),
            skipped: consolidation.skipped.clone(),
            cells: big.cell_count(),
            volume: big.volume(lattice),
            topology,
            simple: topology.is_simple(),
            shells: shells.len(),
            exterior_faces: exterior.face_count(),
            exterior_vertices: exterior.vertices().len(),
            hull: hull_summary,
            hausdorff_distance: hausdorff,
            elapsed: start.elapsed(),
        })
    }

    /// Exterior shell of `solid` grown by `distance`.
    fn offset_exterior(&self, solid: &Solid, distance: f64) -> Result<Shell, PipelineError> {
        let grown = self.kernel.offset(solid.clone(), distance);
        extract_shells(&grown)
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::Distance("offset solid has no boundary".to_string()))
    }
}

/// Run the pipeline once with `config`.
pub fn run(config: PipelineConfig) -> Result<RunReport, PipelineError> {
    Pipeline::new(config)?.run()
}
