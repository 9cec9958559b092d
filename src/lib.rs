// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! BigSolid
//!
//! Consolidates per-building solids from a CityJSON document into one solid.
//! Records are built into lattice solids, optionally offset, and folded with
//! an associative union, either sequentially, on two fork-join lanes, or one
//! task per record into a shared pool. The exterior shell of the result is
//! written back as CityJSON.

pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod kernel;
pub mod pipeline;
pub mod record;

pub use config::PipelineConfig;
pub use error::{BuildError, ConfigError, ParseError, PipelineError, Stage, WriteError};
pub use geometry::{Lattice, Shell, Solid};
pub use io::{parse_and_select, write_shell, CityJsonDocument};
pub use kernel::{ColumnKernel, MergeReducer, SolidBuilder};
pub use pipeline::{consolidate, run, FanOutCoordinator, FoldMode, Pipeline, RunReport};
pub use record::{ObjectRecord, Surface};
