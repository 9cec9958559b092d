// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Cubic lattice shared by every solid of a run

use nalgebra::Point3;

/// Slack used when converting a distance into a whole number of cells.
const CELL_ROUNDING_SLACK: f64 = 1e-9;

/// Uniform cubic lattice with cells of edge `cell_size`, anchored at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lattice {
    cell_size: f64,
}

impl Lattice {
    pub fn new(cell_size: f64) -> Self {
        debug_assert!(cell_size.is_finite() && cell_size > 0.0);
        Self { cell_size }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Index of the cell containing `coord`.
    pub fn cell_of(&self, coord: f64) -> i64 {
        (coord / self.cell_size).floor() as i64
    }

    /// Centre of cell `index` along one axis.
    pub fn center(&self, index: i64) -> f64 {
        (index as f64 + 0.5) * self.cell_size
    }

    /// Nearest lattice plane to `coord`.
    pub fn snap(&self, coord: f64) -> i64 {
        (coord / self.cell_size).round() as i64
    }

    /// Coordinate of lattice plane `index`.
    pub fn coord(&self, index: i64) -> f64 {
        index as f64 * self.cell_size
    }

    /// Whole cells needed to cover `distance`.
    pub fn cells_for(&self, distance: f64) -> i64 {
        if distance <= 0.0 {
            return 0;
        }
        (distance / self.cell_size - CELL_ROUNDING_SLACK).ceil().max(0.0) as i64
    }

    /// World position of a lattice corner.
    pub fn point(&self, corner: [i64; 3]) -> Point3<f64> {
        Point3::new(
            self.coord(corner[0]),
            self.coord(corner[1]),
            self.coord(corner[2]),
        )
    }

    /// Volume of one cell.
    pub fn cell_volume(&self) -> f64 {
        self.cell_size.powi(3)
    }
}
