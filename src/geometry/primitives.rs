// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Simple building shapes, expressed as boundary surfaces

use crate::record::{ObjectRecord, Surface};
use nalgebra::Point3;

/// Building-like primitives
pub enum Primitive {
    /// Axis-aligned box between two corners
    Block { min: Point3<f64>, max: Point3<f64> },
    /// Counter-clockwise footprint extruded from `base` to `top` (LoD1 style)
    Prism {
        footprint: Vec<[f64; 2]>,
        base: f64,
        top: f64,
    },
}

impl Primitive {
    pub fn block(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self::Block { min, max }
    }

    pub fn prism(footprint: Vec<[f64; 2]>, base: f64, top: f64) -> Self {
        Self::Prism {
            footprint,
            base,
            top,
        }
    }

    pub fn to_surfaces(&self) -> Vec<Surface> {
        match self {
            Self::Block { min, max } => {
                let footprint = vec![
                    [min.x, min.y],
                    [max.x, min.y],
                    [max.x, max.y],
                    [min.x, max.y],
                ];
                extrude(&footprint, min.z, max.z)
            }
            Self::Prism {
                footprint,
                base,
                top,
            } => extrude(footprint, *base, *top),
        }
    }

    pub fn to_record(&self, id: impl Into<String>, lod: f64) -> ObjectRecord {
        ObjectRecord::new(id, lod, self.to_surfaces())
    }
}

fn extrude(footprint: &[[f64; 2]], base: f64, top: f64) -> Vec<Surface> {
    let at = |[x, y]: [f64; 2], z: f64| Point3::new(x, y, z);
    let mut surfaces = Vec::with_capacity(footprint.len() + 2);

    // Floor faces down, roof faces up
    surfaces.push(Surface::new(
        footprint.iter().rev().map(|&p| at(p, base)).collect(),
    ));
    surfaces.push(Surface::new(footprint.iter().map(|&p| at(p, top)).collect()));

    for (i, &current) in footprint.iter().enumerate() {
        let next = footprint[(i + 1) % footprint.len()];
        surfaces.push(Surface::new(vec![
            at(current, base),
            at(next, base),
            at(next, top),
            at(current, top),
        ]));
    }
    surfaces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::mesh_utils::open_ring_edges;

    #[test]
    fn test_block_is_closed() {
        let block = Primitive::block(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 3.0));
        let surfaces = block.to_surfaces();
        assert_eq!(surfaces.len(), 6);
        assert_eq!(
            open_ring_edges(surfaces.iter().map(|surface| surface.outer())),
            0
        );
    }

    #[test]
    fn test_prism_record() {
        let prism = Primitive::prism(vec![[0.0, 0.0], [3.0, 0.0], [0.0, 3.0]], 1.0, 5.0);
        let record = prism.to_record("shed", 1.2);
        assert_eq!(record.surfaces().len(), 5);
        assert_eq!(record.vertex_count(), 3 + 3 + 3 * 4);
    }
}
