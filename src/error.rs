// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error taxonomy for the build-and-merge pipeline

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single record could not be turned into a solid.
///
/// Recoverable: lanes log it, skip the record and carry on.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    #[error("object {id} has no surfaces")]
    EmptyRecord { id: String },

    #[error("object {id}: surface {surface} has a ring with fewer than 3 vertices")]
    DegenerateSurface { id: String, surface: usize },

    #[error("object {id} is not closed ({open_edges} edges not shared by exactly two rings)")]
    NotClosed { id: String, open_edges: usize },

    #[error("object {id}: surface {surface} is not planar (deviation {deviation:.4})")]
    NonPlanarSurface {
        id: String,
        surface: usize,
        deviation: f64,
    },

    #[error("object {id}: surface {surface} could not be triangulated: {reason}")]
    Triangulation {
        id: String,
        surface: usize,
        reason: String,
    },

    #[error("object {id} does not cover any lattice cell")]
    EmptySolid { id: String },

    #[error("object {id}: {reason}")]
    Rejected { id: String, reason: String },
}

/// The input document is malformed or does not contain what was asked for.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON document")]
    Json(#[from] serde_json::Error),

    #[error("document is not CityJSON (type = {0:?})")]
    NotCityJson(String),

    #[error("object {0} not found in document")]
    ObjectNotFound(String),

    #[error("object {id} has no geometry at lod {lod}")]
    LodNotFound { id: String, lod: f64 },

    #[error("object {id} references vertex {index}, document has {count}")]
    VertexIndex { id: String, index: usize, count: usize },

    #[error("object {id}: malformed {kind} boundaries")]
    Boundaries {
        id: String,
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("object {id}: lod value {value} is not a number")]
    InvalidLod { id: String, value: String },
}

/// The result could not be persisted.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize output document")]
    Json(#[from] serde_json::Error),

    #[error("shell has no faces")]
    EmptyShell,
}

/// Configuration could not be loaded, saved, or is inconsistent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config file {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid value for {key}: {value}")]
    Override { key: &'static str, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Pipeline stage, used to tell the user where a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Config,
    Parse,
    Build,
    Extract,
    ConvexHull,
    Distance,
    Write,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Parse => "parse",
            Stage::Build => "build",
            Stage::Extract => "extract",
            Stage::ConvexHull => "convex hull",
            Stage::Distance => "distance",
            Stage::Write => "write",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal pipeline error. Everything except [`BuildError`] ends up here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("{lane} terminated abnormally: {message}")]
    JoinFailure { lane: String, message: String },

    #[error("failed to spawn {lane}")]
    LaneSpawn {
        lane: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build worker pool")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("coordinator already ran")]
    CoordinatorReused,

    #[error("every record was skipped, nothing to extract")]
    EmptyResult,

    #[error("convex hull failed: {0}")]
    ConvexHull(String),

    #[error("distance query failed: {0}")]
    Distance(String),
}

impl PipelineError {
    /// Stage at which this error stops a run.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Config(_) => Stage::Config,
            PipelineError::Parse(_) => Stage::Parse,
            PipelineError::Write(_) => Stage::Write,
            PipelineError::JoinFailure { .. }
            | PipelineError::LaneSpawn { .. }
            | PipelineError::WorkerPool(_)
            | PipelineError::CoordinatorReused => Stage::Build,
            PipelineError::EmptyResult => Stage::Extract,
            PipelineError::ConvexHull(_) => Stage::ConvexHull,
            PipelineError::Distance(_) => Stage::Distance,
        }
    }
}

/// Turn a panic payload into something printable.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
