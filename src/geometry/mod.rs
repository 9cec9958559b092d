// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - lattice solids, boundary extraction and mesh queries

mod bbox;
mod hull;
mod lattice;
mod mesh;
pub mod mesh_utils;
mod polygon;
mod primitives;
mod shell;
mod solid;
mod voxelize;

pub use bbox::BoundingBox;
pub use hull::{convex_hull, hausdorff_distance, ConvexHull};
pub use lattice::Lattice;
pub use mesh::{Mesh, Triangle, Vertex};
pub use polygon::{newell_normal, planarity_deviation, triangulate, PlanarFace};
pub use primitives::Primitive;
pub use shell::{boundary, extract_shells, topology, Boundary, Shell, Topology};
pub use solid::{CellBounds, Column, Solid, Span};
pub use voxelize::voxelize;
