// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Conversion of closed planar boundaries into lattice solids
//!
//! A vertical ray is cast through the centre of every column under the
//! boundary. Crossing heights are sorted and paired by parity (odd crossings
//! enter the volume, even ones leave it) and the pairs are snapped to the
//! lattice planes.

use super::{Column, Lattice, PlanarFace, Solid, Span};
use ahash::AHashMap;

/// Fill the volume enclosed by `faces`.
pub fn voxelize(faces: &[PlanarFace], lattice: &Lattice) -> Solid {
    let mut crossings: AHashMap<Column, Vec<f64>> = AHashMap::new();

    for face in faces.iter().filter(|face| !face.is_vertical()) {
        let [min_x, min_y, max_x, max_y] = face.xy_bounds();
        for i in lattice.cell_of(min_x)..=lattice.cell_of(max_x) {
            let x = lattice.center(i);
            if x < min_x || x > max_x {
                continue;
            }
            for j in lattice.cell_of(min_y)..=lattice.cell_of(max_y) {
                let y = lattice.center(j);
                if y < min_y || y > max_y {
                    continue;
                }
                if let Some(z) = face.height_at(x, y) {
                    crossings.entry((i, j)).or_default().push(z);
                }
            }
        }
    }

    let mut solid = Solid::empty();
    for (column, mut heights) in crossings {
        if heights.len() % 2 == 1 {
            tracing::trace!(?column, crossings = heights.len(), "odd crossing count, column dropped");
            continue;
        }
        heights.sort_by(f64::total_cmp);
        for pair in heights.chunks_exact(2) {
            let lo = lattice.snap(pair[0]);
            let hi = lattice.snap(pair[1]);
            if lo < hi {
                solid.insert(column, Span::new(lo, hi));
            }
        }
    }
    solid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::primitives::Primitive;
    use nalgebra::Point3;

    fn faces_of(primitive: &Primitive) -> Vec<PlanarFace> {
        primitive
            .to_surfaces()
            .iter()
            .filter_map(|surface| PlanarFace::from_rings(surface.rings()))
            .collect()
    }

    #[test]
    fn test_block_voxelization() {
        let lattice = Lattice::new(0.5);
        let block = Primitive::block(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 1.0, 3.0));
        let solid = voxelize(&faces_of(&block), &lattice);

        assert_eq!(solid.column_count(), 8);
        assert_eq!(solid.cell_count(), 8 * 6);
        assert_eq!(solid.spans((0, 0)), &[Span::new(0, 6)]);
        assert!(solid.spans((4, 0)).is_empty());
    }

    #[test]
    fn test_offset_block_snaps_to_lattice() {
        let lattice = Lattice::new(1.0);
        let block = Primitive::block(Point3::new(-2.0, 3.0, 0.2), Point3::new(0.0, 4.0, 2.9));
        let solid = voxelize(&faces_of(&block), &lattice);

        assert_eq!(solid.column_count(), 2);
        assert_eq!(solid.spans((-2, 3)), &[Span::new(0, 3)]);
        assert_eq!(solid.spans((-1, 3)), &[Span::new(0, 3)]);
    }

    #[test]
    fn test_prism_voxelization() {
        let lattice = Lattice::new(1.0);
        // L-shaped footprint, 3 cells
        let footprint = vec![
            [0.0, 0.0],
            [2.0, 0.0],
            [2.0, 1.0],
            [1.0, 1.0],
            [1.0, 2.0],
            [0.0, 2.0],
        ];
        let prism = Primitive::prism(footprint, 0.0, 4.0);
        let solid = voxelize(&faces_of(&prism), &lattice);

        assert_eq!(solid.column_count(), 3);
        assert_eq!(solid.cell_count(), 12);
        assert!(solid.spans((1, 1)).is_empty());
    }

    #[test]
    fn test_stacked_volumes_keep_gap() {
        let lattice = Lattice::new(1.0);
        let lower = Primitive::block(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let upper = Primitive::block(Point3::new(0.0, 0.0, 3.0), Point3::new(1.0, 1.0, 5.0));
        let mut faces = faces_of(&lower);
        faces.extend(faces_of(&upper));

        let solid = voxelize(&faces, &lattice);
        assert_eq!(solid.spans((0, 0)), &[Span::new(0, 1), Span::new(3, 5)]);
    }
}
