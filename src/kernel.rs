// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Solid kernel used by the pipeline
//!
//! The pipeline only talks to the kernel through [`SolidBuilder`] and
//! [`MergeReducer`], so tests can swap in their own builders.

use crate::config::{PipelineConfig, DEFAULT_PLANARITY_TOLERANCE};
use crate::error::BuildError;
use crate::geometry::{self, mesh_utils, voxelize, Lattice, PlanarFace, Solid};
use crate::record::ObjectRecord;

/// Turns one object record into a solid.
pub trait SolidBuilder: Sync {
    fn build(&self, record: &ObjectRecord, triangulate: bool) -> Result<Solid, BuildError>;
}

/// Associative combination of solids.
pub trait MergeReducer: Sync {
    /// Identity of [`MergeReducer::union`].
    fn empty(&self) -> Solid {
        Solid::empty()
    }

    fn union(&self, a: Solid, b: Solid) -> Solid;

    /// Grow `solid` by `distance` in every direction.
    fn offset(&self, solid: Solid, distance: f64) -> Solid;
}

/// Lattice kernel: column-span solids on a cubic grid.
#[derive(Debug, Clone)]
pub struct ColumnKernel {
    lattice: Lattice,
    planarity_tolerance: f64,
}

impl ColumnKernel {
    pub fn new(lattice: Lattice) -> Self {
        Self {
            lattice,
            planarity_tolerance: DEFAULT_PLANARITY_TOLERANCE,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(Lattice::new(config.cell_size))
            .with_planarity_tolerance(config.planarity_tolerance)
    }

    pub fn with_planarity_tolerance(mut self, tolerance: f64) -> Self {
        self.planarity_tolerance = tolerance;
        self
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    fn validate(&self, record: &ObjectRecord) -> Result<(), BuildError> {
        let id = || record.id().to_string();

        if record.surfaces().is_empty() {
            return Err(BuildError::EmptyRecord { id: id() });
        }

        for (surface, rings) in record.surfaces().iter().map(|s| s.rings()).enumerate() {
            if rings.iter().any(|ring| ring.len() < 3) {
                return Err(BuildError::DegenerateSurface { id: id(), surface });
            }
            let finite = rings
                .iter()
                .flatten()
                .all(|p| p.coords.iter().all(|c| c.is_finite()));
            if !finite {
                return Err(BuildError::Rejected {
                    id: id(),
                    reason: format!("surface {surface} has a non-finite coordinate"),
                });
            }
        }

        let open_edges = mesh_utils::open_ring_edges(
            record
                .surfaces()
                .iter()
                .flat_map(|surface| surface.rings().iter().map(Vec::as_slice)),
        );
        if open_edges > 0 {
            return Err(BuildError::NotClosed {
                id: id(),
                open_edges,
            });
        }
        Ok(())
    }

    fn faces(&self, record: &ObjectRecord, triangulate: bool) -> Result<Vec<PlanarFace>, BuildError> {
        let mut faces = Vec::with_capacity(record.surfaces().len());

        for (surface, rings) in record.surfaces().iter().map(|s| s.rings()).enumerate() {
            if triangulate {
                let triangles = geometry::triangulate(rings).map_err(|reason| {
                    BuildError::Triangulation {
                        id: record.id().to_string(),
                        surface,
                        reason,
                    }
                })?;
                faces.extend(triangles.iter().filter_map(PlanarFace::from_triangle));
                continue;
            }

            if let Some(deviation) = geometry::planarity_deviation(rings) {
                if deviation > self.planarity_tolerance {
                    return Err(BuildError::NonPlanarSurface {
                        id: record.id().to_string(),
                        surface,
                        deviation,
                    });
                }
            }
            faces.extend(PlanarFace::from_rings(rings));
        }
        Ok(faces)
    }
}

impl SolidBuilder for ColumnKernel {
    fn build(&self, record: &ObjectRecord, triangulate: bool) -> Result<Solid, BuildError> {
        self.validate(record)?;
        let faces = self.faces(record, triangulate)?;
        let solid = voxelize(&faces, &self.lattice);

        if solid.is_empty() {
            return Err(BuildError::EmptySolid {
                id: record.id().to_string(),
            });
        }
        tracing::trace!(
            id = record.id(),
            faces = faces.len(),
            cells = solid.cell_count(),
            "object built"
        );
        Ok(solid)
    }
}

impl MergeReducer for ColumnKernel {
    fn union(&self, a: Solid, b: Solid) -> Solid {
        a.union(b)
    }

    fn offset(&self, solid: Solid, distance: f64) -> Solid {
        let radius = self.lattice.cells_for(distance);
        if radius <= 0 {
            return solid;
        }
        solid.dilate(radius)
    }
}
