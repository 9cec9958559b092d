// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Concurrent build-and-merge pipeline

pub mod coordinator;
pub mod lane;
pub mod run;
pub mod split;
pub mod store;

pub use coordinator::{CoordinatorState, FanOutCoordinator, ForkJoinOutcome};
pub use lane::{
    get_one, run_lane, Lane, LaneOutput, LaneSettings, LaneSummary, PartialAccumulator,
    SkippedRecord,
};
pub use run::{consolidate, run, Consolidation, FoldMode, HullSummary, Pipeline, RunReport};
pub use split::split;
pub use store::{IngestionOutcome, ObjectIngestion, PooledSolid, SharedResultPool};
