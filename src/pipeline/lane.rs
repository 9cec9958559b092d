// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Lane procedure: build every record of a subset and fold the results

use crate::config::PipelineConfig;
use crate::error::BuildError;
use crate::geometry::Solid;
use crate::kernel::{MergeReducer, SolidBuilder};
use crate::record::ObjectRecord;
use serde::Serialize;
use std::fmt;

/// Which worker path a lane runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Lane {
    /// First half, on the spawned thread
    First,
    /// Second half, inline on the coordinator's thread
    Second,
    /// All records, single-threaded
    Whole,
}

impl Lane {
    pub fn name(&self) -> &'static str {
        match self {
            Lane::First => "lane-a",
            Lane::Second => "lane-b",
            Lane::Whole => "sequential",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-run knobs every lane needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneSettings {
    pub triangulate: bool,
    /// Offset applied to each solid before it is folded, if any.
    pub offset: Option<f64>,
}

impl From<&PipelineConfig> for LaneSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            triangulate: config.triangulate(),
            offset: config.offset(),
        }
    }
}

/// A record that failed to build and was left out of the total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    /// Position in the selected record list
    pub index: usize,
    pub id: String,
    pub reason: String,
}

impl SkippedRecord {
    pub fn new(index: usize, record: &ObjectRecord, error: &BuildError) -> Self {
        Self {
            index,
            id: record.id().to_string(),
            reason: error.to_string(),
        }
    }
}

/// Build one record and apply the configured offset.
pub fn get_one<B, R>(
    record: &ObjectRecord,
    builder: &B,
    reducer: &R,
    settings: &LaneSettings,
) -> Result<Solid, BuildError>
where
    B: SolidBuilder + ?Sized,
    R: MergeReducer + ?Sized,
{
    let solid = builder.build(record, settings.triangulate)?;
    Ok(match settings.offset {
        Some(distance) => reducer.offset(solid, distance),
        None => solid,
    })
}

/// Solids built by one lane, waiting to be folded into the running total.
///
/// Owned by a single lane; never shared.
#[derive(Debug, Default)]
pub struct PartialAccumulator {
    pending: Vec<Solid>,
    total: Solid,
    folded: usize,
}

impl PartialAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, solid: Solid) {
        self.pending.push(solid);
    }

    /// Solids pushed so far, folded or not.
    pub fn len(&self) -> usize {
        self.folded + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fold pending solids into the total, left to right in push order.
    pub fn fold<R: MergeReducer + ?Sized>(&mut self, reducer: &R) {
        for solid in self.pending.drain(..) {
            let total = std::mem::take(&mut self.total);
            self.total = reducer.union(total, solid);
            self.folded += 1;
        }
    }

    pub fn into_total<R: MergeReducer + ?Sized>(mut self, reducer: &R) -> Solid {
        self.fold(reducer);
        self.total
    }
}

/// What a lane reports back besides its total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaneSummary {
    pub lane: Lane,
    pub records: usize,
    pub built: usize,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Debug)]
pub struct LaneOutput {
    pub total: Solid,
    pub summary: LaneSummary,
}

/// Build and fold `records` in order.
///
/// `first_index` is the position of `records[0]` in the full selection, so
/// skipped records are reported with their global index. Build failures are
/// logged and skipped; they never end the lane.
pub fn run_lane<B, R>(
    lane: Lane,
    records: &[ObjectRecord],
    first_index: usize,
    builder: &B,
    reducer: &R,
    settings: &LaneSettings,
) -> LaneOutput
where
    B: SolidBuilder + ?Sized,
    R: MergeReducer + ?Sized,
{
    let span = tracing::info_span!("lane", lane = %lane, records = records.len());
    let _enter = span.enter();

    let mut accumulator = PartialAccumulator::new();
    let mut skipped = Vec::new();

    for (offset, record) in records.iter().enumerate() {
        match get_one(record, builder, reducer, settings) {
            Ok(solid) => accumulator.push(solid),
            Err(error) => {
                tracing::warn!(id = record.id(), %error, "skipping object");
                skipped.push(SkippedRecord::new(first_index + offset, record, &error));
            }
        }
    }

    let built = accumulator.len();
    let total = accumulator.into_total(reducer);
    tracing::debug!(built, skipped = skipped.len(), cells = total.cell_count(), "lane finished");

    LaneOutput {
        total,
        summary: LaneSummary {
            lane,
            records: records.len(),
            built,
            skipped,
        },
    }
}
