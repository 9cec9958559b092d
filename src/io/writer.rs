// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CityJSON writer for extracted shells
//!
//! Shell vertices are lattice corners, so they are written as integers with a
//! transform whose scale is the cell size.

use crate::error::WriteError;
use crate::geometry::{BoundingBox, Lattice, Shell};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

pub const CITYJSON_VERSION: &str = "1.1";

/// Build the CityJSON document for `shell` as a single `Solid` object.
pub fn shell_document(
    shell: &Shell,
    lattice: &Lattice,
    lod: f64,
    object_id: &str,
) -> Result<Value, WriteError> {
    if shell.face_count() == 0 {
        return Err(WriteError::EmptyShell);
    }

    let extent = BoundingBox::from_points(&shell.world_vertices(lattice)).extent();
    let surfaces: Vec<Value> = shell.faces().iter().map(|face| json!([face])).collect();
    let cell = lattice.cell_size();

    Ok(json!({
        "type": "CityJSON",
        "version": CITYJSON_VERSION,
        "transform": {
            "scale": [cell, cell, cell],
            "translate": [0.0, 0.0, 0.0]
        },
        "metadata": {
            "geographicalExtent": extent,
            "referenceDate": chrono::Utc::now().format("%Y-%m-%d").to_string()
        },
        "CityObjects": {
            object_id: {
                "type": "Building",
                "geometry": [{
                    "type": "Solid",
                    "lod": lod.to_string(),
                    "boundaries": [surfaces]
                }]
            }
        },
        "vertices": shell.vertices()
    }))
}

/// Write `shell` to `path`, creating parent directories as needed.
pub fn write_shell(
    path: impl AsRef<Path>,
    shell: &Shell,
    lattice: &Lattice,
    lod: f64,
    object_id: &str,
) -> Result<(), WriteError> {
    let path = path.as_ref();
    let document = shell_document(shell, lattice, lod, object_id)?;
    let text = serde_json::to_string(&document)?;

    let io_error = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, text).map_err(io_error)?;

    tracing::info!(
        path = %path.display(),
        vertices = shell.vertices().len(),
        faces = shell.face_count(),
        "shell written"
    );
    Ok(())
}
