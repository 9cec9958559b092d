// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Object records read from the input document

use nalgebra::Point3;
use serde::Serialize;

/// One boundary surface: an outer ring followed by zero or more inner rings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Surface {
    rings: Vec<Vec<Point3<f64>>>,
}

impl Surface {
    pub fn new(outer: Vec<Point3<f64>>) -> Self {
        Self { rings: vec![outer] }
    }

    pub fn with_holes(outer: Vec<Point3<f64>>, holes: Vec<Vec<Point3<f64>>>) -> Self {
        let mut rings = Vec::with_capacity(holes.len() + 1);
        rings.push(outer);
        rings.extend(holes);
        Self { rings }
    }

    pub fn outer(&self) -> &[Point3<f64>] {
        &self.rings[0]
    }

    /// All rings, outer first.
    pub fn rings(&self) -> &[Vec<Point3<f64>>] {
        &self.rings
    }

    pub fn vertex_count(&self) -> usize {
        self.rings.iter().map(Vec::len).sum()
    }
}

/// A building (or building part) selected for consolidation.
///
/// Records are immutable once read; builders only ever see `&ObjectRecord`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectRecord {
    id: String,
    lod: f64,
    surfaces: Vec<Surface>,
}

impl ObjectRecord {
    pub fn new(id: impl Into<String>, lod: f64, surfaces: Vec<Surface>) -> Self {
        Self {
            id: id.into(),
            lod,
            surfaces,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn lod(&self) -> f64 {
        self.lod
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn vertex_count(&self) -> usize {
        self.surfaces.iter().map(Surface::vertex_count).sum()
    }

    /// One-line summary for progress output.
    pub fn summary(&self) -> String {
        format!(
            "{} (lod {}, {} surfaces, {} vertices)",
            self.id,
            self.lod,
            self.surfaces.len(),
            self.vertex_count()
        )
    }
}
