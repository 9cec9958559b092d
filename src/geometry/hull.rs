// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Convex hull and Hausdorff distance using parry3d
//!
//! parry3d works in `f32`. Coordinates are shifted to a local origin before
//! the conversion so projected (RD-style) coordinates keep their precision.

use super::{mesh_utils, voxelize, Lattice, Mesh, PlanarFace, Solid, Triangle, Vertex};
use crate::error::PipelineError;
use nalgebra::{Point3, Vector3};
use parry3d::math::{Point, Real};
use parry3d::query::PointQuery;
use parry3d::shape::TriMesh;
use parry3d::transformation::try_convex_hull;

/// Convex hull of a solid, as a lattice solid and as a closed triangle mesh.
#[derive(Debug, Clone)]
pub struct ConvexHull {
    pub solid: Solid,
    pub mesh: Mesh,
}

/// Corners of every span in `solid`, in world coordinates.
fn span_corners(solid: &Solid, lattice: &Lattice) -> Vec<Point3<f64>> {
    let mut corners = Vec::new();
    for ((i, j), spans) in solid.columns() {
        for span in spans {
            for z in [span.lo, span.hi] {
                for (di, dj) in [(0, 0), (1, 0), (1, 1), (0, 1)] {
                    corners.push(lattice.point([i + di, j + dj, z]));
                }
            }
        }
    }
    corners
}

fn to_local(point: &Point3<f64>, origin: &Point3<f64>) -> Point<Real> {
    let local = point - origin;
    Point::new(local.x as Real, local.y as Real, local.z as Real)
}

fn to_world(point: &Point<Real>, origin: &Point3<f64>) -> Point3<f64> {
    origin + Vector3::new(point.x as f64, point.y as f64, point.z as f64)
}

/// Compute the convex hull of `solid`.
///
/// The hull mesh is voxelized back onto the lattice and united with the input,
/// so the hull solid always contains every cell of `solid`.
pub fn convex_hull(solid: &Solid, lattice: &Lattice) -> Result<ConvexHull, PipelineError> {
    let corners = span_corners(solid, lattice);
    let Some(origin) = corners.first().copied() else {
        return Err(PipelineError::ConvexHull("solid is empty".to_string()));
    };

    let local: Vec<Point<Real>> = corners.iter().map(|p| to_local(p, &origin)).collect();
    let (points, indices) = try_convex_hull(&local)
        .map_err(|err| PipelineError::ConvexHull(format!("{err:?}")))?;

    let mut mesh = Mesh::with_capacity(points.len(), indices.len());
    for point in &points {
        mesh.add_vertex(Vertex::new(to_world(point, &origin), Vector3::zeros()));
    }
    for [a, b, c] in indices {
        mesh.add_triangle(Triangle::new([a as usize, b as usize, c as usize]));
    }
    if !mesh_utils::is_closed(&mesh) {
        return Err(PipelineError::ConvexHull(
            "hull mesh is not closed".to_string(),
        ));
    }
    assign_normals(&mut mesh);

    let faces: Vec<PlanarFace> = (0..mesh.triangle_count())
        .filter_map(|index| PlanarFace::from_triangle(&mesh.triangle_points(index)))
        .collect();
    let hull = voxelize(&faces, lattice).union(solid.clone());

    tracing::debug!(
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        cells = hull.cell_count(),
        "convex hull computed"
    );

    Ok(ConvexHull { solid: hull, mesh })
}

/// Area-weighted vertex normals.
fn assign_normals(mesh: &mut Mesh) {
    let mut normals = vec![Vector3::<f64>::zeros(); mesh.vertex_count()];
    for index in 0..mesh.triangle_count() {
        let [a, b, c] = mesh.triangle_points(index);
        let normal = (b - a).cross(&(c - a));
        for corner in mesh.triangles[index].indices {
            normals[corner] += normal;
        }
    }
    for (vertex, normal) in mesh.vertices.iter_mut().zip(normals) {
        vertex.normal = normal.try_normalize(f64::EPSILON).unwrap_or(normal);
    }
}

fn to_trimesh(mesh: &Mesh, origin: &Point3<f64>) -> TriMesh {
    let vertices: Vec<Point<Real>> = mesh
        .vertices
        .iter()
        .map(|v| to_local(&v.position, origin))
        .collect();

    let indices: Vec<[u32; 3]> = mesh
        .triangles
        .iter()
        .map(|t| {
            [
                t.indices[0] as u32,
                t.indices[1] as u32,
                t.indices[2] as u32,
            ]
        })
        .collect();

    TriMesh::new(vertices, indices)
}

/// Largest distance from a surface sample of `from` to the surface `to`.
fn directed_distance(from: &Mesh, to: &TriMesh, origin: &Point3<f64>) -> f64 {
    from.surface_samples()
        .iter()
        .map(|sample| to.distance_to_local_point(&to_local(sample, origin), false) as f64)
        .fold(0.0, f64::max)
}

/// Symmetric Hausdorff distance between two surfaces.
///
/// Each surface is sampled at its vertices and triangle centroids.
pub fn hausdorff_distance(a: &Mesh, b: &Mesh) -> Result<f64, PipelineError> {
    if a.is_empty() || b.is_empty() {
        return Err(PipelineError::Distance(
            "cannot measure distance to an empty surface".to_string(),
        ));
    }

    let origin = a.vertices[0].position;
    let mesh_a = to_trimesh(a, &origin);
    let mesh_b = to_trimesh(b, &origin);

    let distance = directed_distance(a, &mesh_b, &origin).max(directed_distance(b, &mesh_a, &origin));
    Ok(distance)
}
