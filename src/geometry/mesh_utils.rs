// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Closedness checks for meshes and polygon boundaries

use super::Mesh;
use ahash::AHashMap;
use nalgebra::Point3;

/// Quantization step used to identify coincident ring vertices.
const VERTEX_KEY_SCALE: f64 = 1e6;

/// Edge representation for connectivity checking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Edge {
    v0: usize,
    v1: usize,
}

impl Edge {
    fn new(v0: usize, v1: usize) -> Self {
        // Always store edges with smaller index first for consistent hashing
        if v0 < v1 {
            Self { v0, v1 }
        } else {
            Self { v0: v1, v1: v0 }
        }
    }
}

fn count_edges(edges: impl IntoIterator<Item = Edge>) -> AHashMap<Edge, u32> {
    let mut edge_counts: AHashMap<Edge, u32> = AHashMap::new();
    for edge in edges {
        *edge_counts.entry(edge).or_insert(0) += 1;
    }
    edge_counts
}

/// Check if mesh is closed (each edge shared by exactly 2 triangles)
pub fn is_closed(mesh: &Mesh) -> bool {
    if mesh.triangles.is_empty() {
        return false;
    }

    let edge_counts = count_edges(mesh.triangles.iter().flat_map(|triangle| {
        let [a, b, c] = triangle.indices;
        [Edge::new(a, b), Edge::new(b, c), Edge::new(c, a)]
    }));

    edge_counts.values().all(|&count| count == 2)
}

/// Number of ring edges not shared by exactly two rings.
///
/// Vertices are matched by position (quantized to a micrometre), so rings of
/// different surfaces that meet along an edge are recognised as neighbours.
/// Zero means the rings bound a closed volume.
pub fn open_ring_edges<'a>(rings: impl IntoIterator<Item = &'a [Point3<f64>]>) -> usize {
    let mut ids: AHashMap<[i64; 3], usize> = AHashMap::new();
    let mut edges = Vec::new();

    for ring in rings {
        let keys: Vec<usize> = ring
            .iter()
            .map(|p| {
                let key = [
                    (p.x * VERTEX_KEY_SCALE).round() as i64,
                    (p.y * VERTEX_KEY_SCALE).round() as i64,
                    (p.z * VERTEX_KEY_SCALE).round() as i64,
                ];
                let next_id = ids.len();
                *ids.entry(key).or_insert(next_id)
            })
            .collect();

        for (i, &a) in keys.iter().enumerate() {
            let b = keys[(i + 1) % keys.len()];
            if a != b {
                edges.push(Edge::new(a, b));
            }
        }
    }

    count_edges(edges)
        .values()
        .filter(|&&count| count != 2)
        .count()
}
