// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Triangle meshes used for hull construction and distance queries

use super::BoundingBox;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Vertex with position and normal
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Vertex {
    pub fn new(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { position, normal }
    }
}

/// Triangle defined by three vertex indices
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [usize; 3],
}

impl Triangle {
    pub fn new(indices: [usize; 3]) -> Self {
        Self { indices }
    }
}

/// Triangular mesh
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity(triangle_count),
        }
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Vertex) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a triangle
    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Compute bounding box
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_vertices(&self.vertices)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Corner positions of triangle `index`.
    pub fn triangle_points(&self, index: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.triangles[index].indices;
        [
            self.vertices[a].position,
            self.vertices[b].position,
            self.vertices[c].position,
        ]
    }

    /// Points used to sample the surface: every vertex plus every triangle centroid.
    pub fn surface_samples(&self) -> Vec<Point3<f64>> {
        let mut samples: Vec<Point3<f64>> = self.vertices.iter().map(|v| v.position).collect();
        samples.extend((0..self.triangles.len()).map(|index| {
            let [a, b, c] = self.triangle_points(index);
            Point3::from((a.coords + b.coords + c.coords) / 3.0)
        }));
        samples
    }

    /// Total surface area
    pub fn surface_area(&self) -> f64 {
        (0..self.triangles.len())
            .map(|index| {
                let [a, b, c] = self.triangle_points(index);
                (b - a).cross(&(c - a)).norm() / 2.0
            })
            .sum()
    }
}
