// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Planar faces, planarity checks and ear-clipping triangulation

use nalgebra::{Point3, Vector3};

/// Faces whose normal has a smaller z component are parallel to vertical rays.
const VERTICAL_NORMAL_Z: f64 = 1e-9;

/// Newell normal of a ring (not normalized). Zero for degenerate rings.
pub fn newell_normal(ring: &[Point3<f64>]) -> Vector3<f64> {
    let mut normal = Vector3::zeros();
    for (i, current) in ring.iter().enumerate() {
        let next = &ring[(i + 1) % ring.len()];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    normal
}

fn centroid(points: &[Point3<f64>]) -> Point3<f64> {
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / points.len() as f64)
}

/// Largest distance of any ring vertex to the best-fit plane of the outer ring.
///
/// Returns `None` when the outer ring has no usable normal.
pub fn planarity_deviation(rings: &[Vec<Point3<f64>>]) -> Option<f64> {
    let outer = rings.first()?;
    let normal = newell_normal(outer).try_normalize(f64::EPSILON)?;
    let origin = centroid(outer);

    let deviation = rings
        .iter()
        .flatten()
        .map(|p| normal.dot(&(p - origin)).abs())
        .fold(0.0, f64::max);
    Some(deviation)
}

/// Triangulate a surface (outer ring plus holes) in its own plane.
pub fn triangulate(rings: &[Vec<Point3<f64>>]) -> Result<Vec<[Point3<f64>; 3]>, String> {
    let outer = rings.first().ok_or("surface has no rings")?;
    let normal = newell_normal(outer);
    if normal.norm() <= f64::EPSILON {
        return Err("degenerate outer ring".to_string());
    }

    // Project onto the coordinate plane the surface is least inclined to.
    let drop_axis = normal.iamax();
    let (u, v) = match drop_axis {
        0 => (1, 2),
        1 => (2, 0),
        _ => (0, 1),
    };

    let points: Vec<Point3<f64>> = rings.iter().flatten().copied().collect();
    let mut flat = Vec::with_capacity(points.len() * 2);
    for p in &points {
        flat.push(p[u]);
        flat.push(p[v]);
    }

    let mut holes = Vec::with_capacity(rings.len().saturating_sub(1));
    let mut start = outer.len();
    for ring in &rings[1..] {
        holes.push(start);
        start += ring.len();
    }

    let indices = earcutr::earcut(&flat, &holes, 2).map_err(|err| format!("{err:?}"))?;
    if indices.is_empty() {
        return Err("ear clipping produced no triangles".to_string());
    }

    Ok(indices
        .chunks_exact(3)
        .map(|tri| [points[tri[0]], points[tri[1]], points[tri[2]]])
        .collect())
}

/// Planar polygon prepared for vertical ray queries.
#[derive(Debug, Clone)]
pub struct PlanarFace {
    normal: Vector3<f64>,
    offset: f64,
    rings: Vec<Vec<[f64; 2]>>,
    bounds: [f64; 4],
}

impl PlanarFace {
    /// Build from rings lying in one plane, outer ring first.
    pub fn from_rings(rings: &[Vec<Point3<f64>>]) -> Option<Self> {
        let outer = rings.first()?;
        if outer.len() < 3 {
            return None;
        }
        let normal = newell_normal(outer).try_normalize(f64::EPSILON)?;
        let offset = normal.dot(&centroid(outer).coords);

        let mut bounds = [
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        ];
        let rings = rings
            .iter()
            .map(|ring| {
                ring.iter()
                    .map(|p| {
                        bounds[0] = bounds[0].min(p.x);
                        bounds[1] = bounds[1].min(p.y);
                        bounds[2] = bounds[2].max(p.x);
                        bounds[3] = bounds[3].max(p.y);
                        [p.x, p.y]
                    })
                    .collect()
            })
            .collect();

        Some(Self {
            normal,
            offset,
            rings,
            bounds,
        })
    }

    pub fn from_triangle(triangle: &[Point3<f64>; 3]) -> Option<Self> {
        Self::from_rings(&[triangle.to_vec()])
    }

    /// Parallel to the z axis; never crossed by a vertical ray.
    pub fn is_vertical(&self) -> bool {
        self.normal.z.abs() < VERTICAL_NORMAL_Z
    }

    /// `[min_x, min_y, max_x, max_y]` of the projection onto the xy plane.
    pub fn xy_bounds(&self) -> [f64; 4] {
        self.bounds
    }

    /// Height where the vertical line through `(x, y)` crosses this face.
    pub fn height_at(&self, x: f64, y: f64) -> Option<f64> {
        if self.is_vertical() || !self.contains_xy(x, y) {
            return None;
        }
        Some((self.offset - self.normal.x * x - self.normal.y * y) / self.normal.z)
    }

    /// Even-odd containment of the xy projection, half-open on edges.
    fn contains_xy(&self, x: f64, y: f64) -> bool {
        self.rings
            .iter()
            .fold(false, |inside, ring| inside ^ ring_crossings_odd(ring, x, y))
    }
}

fn ring_crossings_odd(ring: &[[f64; 2]], x: f64, y: f64) -> bool {
    let mut odd = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];
        if (yi > y) != (yj > y) {
            let x_cross = (xj - xi) * (y - yi) / (yj - yi) + xi;
            if x < x_cross {
                odd = !odd;
            }
        }
        j = i;
    }
    odd
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(z: f64) -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, z),
            Point3::new(2.0, 0.0, z),
            Point3::new(2.0, 2.0, z),
            Point3::new(0.0, 2.0, z),
        ]
    }

    #[test]
    fn test_newell_normal() {
        let normal = newell_normal(&square(1.0)).normalize();
        assert_relative_eq!(normal, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_planarity() {
        assert_relative_eq!(planarity_deviation(&[square(3.0)]).unwrap(), 0.0);

        let mut warped = square(0.0);
        warped[2].z = 0.4;
        assert!(planarity_deviation(&[warped]).unwrap() > 0.05);
    }

    #[test]
    fn test_height_at() {
        let sloped = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 4.0),
            Point3::new(4.0, 4.0, 4.0),
            Point3::new(0.0, 4.0, 0.0),
        ];
        let face = PlanarFace::from_rings(&[sloped]).unwrap();
        assert_relative_eq!(face.height_at(1.0, 2.0).unwrap(), 1.0);
        assert_relative_eq!(face.height_at(3.5, 0.5).unwrap(), 3.5);
        assert!(face.height_at(5.0, 2.0).is_none());
    }

    #[test]
    fn test_holes_excluded() {
        let outer = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(6.0, 0.0, 0.0),
            Point3::new(6.0, 6.0, 0.0),
            Point3::new(0.0, 6.0, 0.0),
        ];
        let hole = vec![
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(2.0, 4.0, 0.0),
            Point3::new(4.0, 4.0, 0.0),
            Point3::new(4.0, 2.0, 0.0),
        ];
        let face = PlanarFace::from_rings(&[outer, hole]).unwrap();
        assert!(face.height_at(1.0, 1.0).is_some());
        assert!(face.height_at(3.0, 3.0).is_none());
    }

    #[test]
    fn test_vertical_face() {
        let wall = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 3.0),
            Point3::new(0.0, 0.0, 3.0),
        ];
        let face = PlanarFace::from_rings(&[wall]).unwrap();
        assert!(face.is_vertical());
        assert!(face.height_at(1.0, 0.0).is_none());
    }

    #[test]
    fn test_triangulate_with_hole() {
        let outer = vec![
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(6.0, 0.0, 1.0),
            Point3::new(6.0, 6.0, 1.0),
            Point3::new(0.0, 6.0, 1.0),
        ];
        let hole = vec![
            Point3::new(2.0, 2.0, 1.0),
            Point3::new(2.0, 4.0, 1.0),
            Point3::new(4.0, 4.0, 1.0),
            Point3::new(4.0, 2.0, 1.0),
        ];
        let triangles = triangulate(&[outer, hole]).unwrap();
        assert_eq!(triangles.len(), 8);

        let area: f64 = triangles
            .iter()
            .map(|[a, b, c]| (b - a).cross(&(c - a)).norm() / 2.0)
            .sum();
        assert_relative_eq!(area, 32.0, epsilon = 1e-9);
    }

    #[test]
    fn test_triangulate_wall() {
        let wall = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 3.0, 0.0),
            Point3::new(0.0, 3.0, 2.0),
            Point3::new(0.0, 0.0, 2.0),
        ];
        assert_eq!(triangulate(&[wall]).unwrap().len(), 2);
    }
}
