// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Shell extraction and topology queries
//!
//! The empty space around a solid (padded by one cell above and below) is
//! split into connected components. The component reaching the padding or an
//! unoccupied column is the outside; each other component is an enclosed void.
//! Every boundary face of the solid belongs to the shell of the empty
//! component it faces: shell 0 is the exterior, interior shells follow in
//! discovery order.

use super::{CellBounds, Column, Lattice, Mesh, Solid, Span, Triangle, Vertex};
use ahash::AHashMap;
use nalgebra::{Point3, Vector3};
use serde::Serialize;

/// Lattice quad, counter-clockwise when seen from the empty side.
type Quad = [[i64; 3]; 4];

/// One connected boundary component, with deduplicated lattice vertices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    vertices: Vec<[i64; 3]>,
    faces: Vec<[usize; 4]>,
    exterior: bool,
}

impl Shell {
    /// Lattice corners of the shell.
    pub fn vertices(&self) -> &[[i64; 3]] {
        &self.vertices
    }

    /// Quads as indices into [`Shell::vertices`].
    pub fn faces(&self) -> &[[usize; 4]] {
        &self.faces
    }

    pub fn is_exterior(&self) -> bool {
        self.exterior
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn world_vertices(&self, lattice: &Lattice) -> Vec<Point3<f64>> {
        self.vertices
            .iter()
            .map(|&corner| lattice.point(corner))
            .collect()
    }

    /// Two triangles per quad, vertices shared.
    pub fn to_mesh(&self, lattice: &Lattice) -> Mesh {
        let positions = self.world_vertices(lattice);
        let mut normals = vec![Vector3::<f64>::zeros(); positions.len()];
        let mut triangles = Vec::with_capacity(self.faces.len() * 2);

        for &[a, b, c, d] in &self.faces {
            let normal = (positions[b] - positions[a]).cross(&(positions[c] - positions[b]));
            for corner in [a, b, c, d] {
                normals[corner] += normal;
            }
            triangles.push(Triangle::new([a, b, c]));
            triangles.push(Triangle::new([a, c, d]));
        }

        let mut mesh = Mesh::with_capacity(positions.len(), triangles.len());
        for (position, normal) in positions.into_iter().zip(normals) {
            let normal = normal.try_normalize(f64::EPSILON).unwrap_or(normal);
            mesh.add_vertex(Vertex::new(position, normal));
        }
        for triangle in triangles {
            mesh.add_triangle(triangle);
        }
        mesh
    }
}

struct ShellBuilder {
    shell: Shell,
    index: AHashMap<[i64; 3], usize>,
}

impl ShellBuilder {
    fn new(exterior: bool) -> Self {
        Self {
            shell: Shell {
                vertices: Vec::new(),
                faces: Vec::new(),
                exterior,
            },
            index: AHashMap::new(),
        }
    }

    fn push(&mut self, quad: Quad) {
        let shell = &mut self.shell;
        let face = quad.map(|corner| {
            *self.index.entry(corner).or_insert_with(|| {
                shell.vertices.push(corner);
                shell.vertices.len() - 1
            })
        });
        shell.faces.push(face);
    }
}

/// Connected-component counts of a solid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Topology {
    /// Face-connected volumes
    pub volumes: usize,
    /// Enclosed empty regions
    pub voids: usize,
}

impl Topology {
    /// One volume, no enclosed rooms.
    pub fn is_simple(&self) -> bool {
        self.volumes == 1 && self.voids == 0
    }
}

impl Solid {
    /// Whether the solid is a single volume without enclosed voids.
    pub fn is_simple(&self) -> bool {
        topology(self).is_simple()
    }
}

struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            let (keep, merge) = if a < b { (a, b) } else { (b, a) };
            self.parent[merge] = keep;
        }
    }

    fn roots(&mut self) -> usize {
        (0..self.parent.len()).filter(|&x| self.find(x) == x).count()
    }
}

/// Union every pair of spans from two neighbouring columns that share z extent.
fn connect_overlapping(
    sets: &mut DisjointSets,
    a: &[Span],
    a_base: usize,
    b: &[Span],
    b_base: usize,
) {
    let (mut x, mut y) = (0, 0);
    while x < a.len() && y < b.len() {
        if a[x].overlap(&b[y]).is_some() {
            sets.union(a_base + x, b_base + y);
        }
        if a[x].hi < b[y].hi {
            x += 1;
        } else {
            y += 1;
        }
    }
}

/// Label of the unbounded empty region.
const OUTSIDE: usize = 0;

/// Labelled empty spans of the occupied columns of a solid.
///
/// An unoccupied column is empty from top to bottom and reaches the outside,
/// so it needs no labels: every lookup that misses maps to [`OUTSIDE`]. Memory
/// follows the occupied columns, not the bounding rectangle.
struct EmptySpace {
    slots: AHashMap<Column, usize>,
    spans: Vec<Vec<Span>>,
    base: Vec<usize>,
    sets: DisjointSets,
}

impl EmptySpace {
    fn new(solid: &Solid, bounds: &CellBounds) -> Self {
        let (z_lo, z_hi) = (bounds.min[2] - 1, bounds.max[2] + 1);
        let count = solid.column_count();

        let mut slots = AHashMap::with_capacity(count);
        let mut spans = Vec::with_capacity(count);
        let mut base = Vec::with_capacity(count);
        let mut next = OUTSIDE + 1;
        for (slot, (column, filled)) in solid.columns().enumerate() {
            let empty = complement(filled, z_lo, z_hi);
            slots.insert(column, slot);
            base.push(next);
            next += empty.len();
            spans.push(empty);
        }

        let mut sets = DisjointSets::new(next);
        for (slot, (column, _)) in solid.columns().enumerate() {
            let own = &spans[slot];
            // The lowest and highest gaps reach the padding layers.
            sets.union(OUTSIDE, base[slot]);
            sets.union(OUTSIDE, base[slot] + own.len() - 1);

            for side in Side::ALL {
                match slots.get(&side.neighbour(column)) {
                    Some(&other) => {
                        connect_overlapping(&mut sets, own, base[slot], &spans[other], base[other])
                    }
                    None => {
                        for k in 0..own.len() {
                            sets.union(OUTSIDE, base[slot] + k);
                        }
                    }
                }
            }
        }

        Self {
            slots,
            spans,
            base,
            sets,
        }
    }

    /// Enclosed empty regions. [`OUTSIDE`] is always its own root.
    fn voids(&mut self) -> usize {
        self.sets.roots().saturating_sub(1)
    }

    /// Sort every boundary face of `solid` into the shell of the region it faces.
    fn shells(&mut self, solid: &Solid) -> Vec<Shell> {
        let Self {
            slots,
            spans: empty_spans,
            base,
            sets,
        } = self;

        let mut builders = vec![ShellBuilder::new(true)];
        let mut shell_of: AHashMap<usize, usize> = AHashMap::new();
        shell_of.insert(OUTSIDE, 0);

        let mut emit = |label: usize, quad: Quad| {
            let root = sets.find(label);
            let index = *shell_of.entry(root).or_insert_with(|| {
                builders.push(ShellBuilder::new(false));
                builders.len() - 1
            });
            builders[index].push(quad);
        };

        for (slot, (column, filled)) in solid.columns().enumerate() {
            let empty = &empty_spans[slot];

            for span in filled {
                let above = empty.partition_point(|e| e.lo < span.hi);
                if empty.get(above).is_some_and(|e| e.lo == span.hi) {
                    emit(base[slot] + above, top_quad(column, span.hi));
                }

                let below = empty.partition_point(|e| e.hi <= span.lo);
                if below > 0 && empty[below - 1].hi == span.lo {
                    emit(base[slot] + below - 1, bottom_quad(column, span.lo));
                }

                for side in Side::ALL {
                    let Some(&other) = slots.get(&side.neighbour(column)) else {
                        emit(OUTSIDE, side.quad(column, span.lo, span.hi));
                        continue;
                    };
                    let neighbour = &empty_spans[other];
                    let first = neighbour.partition_point(|e| e.hi <= span.lo);
                    for (k, e) in neighbour.iter().enumerate().skip(first) {
                        let Some(contact) = span.overlap(e) else {
                            break;
                        };
                        emit(base[other] + k, side.quad(column, contact.lo, contact.hi));
                    }
                }
            }
        }

        builders.into_iter().map(|builder| builder.shell).collect()
    }
}

/// Face-connected volumes of `solid`; `slots` numbers its columns in order.
fn volumes(solid: &Solid, slots: &AHashMap<Column, usize>) -> usize {
    let mut base = Vec::with_capacity(slots.len());
    let mut next = 0;
    for (_, spans) in solid.columns() {
        base.push(next);
        next += spans.len();
    }

    let mut sets = DisjointSets::new(next);
    for (slot, ((i, j), spans)) in solid.columns().enumerate() {
        for neighbour in [(i + 1, j), (i, j + 1)] {
            if let Some(&other) = slots.get(&neighbour) {
                connect_overlapping(&mut sets, spans, base[slot], solid.spans(neighbour), base[other]);
            }
        }
    }
    sets.roots()
}

fn complement(spans: &[Span], lo: i64, hi: i64) -> Vec<Span> {
    let mut empty = Vec::with_capacity(spans.len() + 1);
    let mut cursor = lo;
    for span in spans {
        if span.lo > cursor {
            empty.push(Span::new(cursor, span.lo));
        }
        cursor = span.hi;
    }
    if cursor < hi {
        empty.push(Span::new(cursor, hi));
    }
    empty
}

#[derive(Clone, Copy)]
enum Side {
    PosX,
    NegX,
    PosY,
    NegY,
}

impl Side {
    const ALL: [Side; 4] = [Side::PosX, Side::NegX, Side::PosY, Side::NegY];

    fn neighbour(&self, (i, j): Column) -> Column {
        match self {
            Side::PosX => (i + 1, j),
            Side::NegX => (i - 1, j),
            Side::PosY => (i, j + 1),
            Side::NegY => (i, j - 1),
        }
    }

    fn quad(&self, (i, j): Column, a: i64, b: i64) -> Quad {
        match self {
            Side::PosX => [[i + 1, j, a], [i + 1, j + 1, a], [i + 1, j + 1, b], [i + 1, j, b]],
            Side::NegX => [[i, j, a], [i, j, b], [i, j + 1, b], [i, j + 1, a]],
            Side::PosY => [[i, j + 1, a], [i, j + 1, b], [i + 1, j + 1, b], [i + 1, j + 1, a]],
            Side::NegY => [[i, j, a], [i + 1, j, a], [i + 1, j, b], [i, j, b]],
        }
    }
}

fn top_quad((i, j): Column, z: i64) -> Quad {
    [[i, j, z], [i + 1, j, z], [i + 1, j + 1, z], [i, j + 1, z]]
}

fn bottom_quad((i, j): Column, z: i64) -> Quad {
    [[i, j, z], [i, j + 1, z], [i + 1, j + 1, z], [i + 1, j, z]]
}

/// Shells and topology of a solid, computed from one labelling of its empty space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    /// Exterior shell first, then one shell per void
    pub shells: Vec<Shell>,
    pub topology: Topology,
}

/// Shells and topology of `solid` in a single pass.
pub fn boundary(solid: &Solid) -> Boundary {
    let Some(bounds) = solid.bounds() else {
        return Boundary {
            shells: Vec::new(),
            topology: Topology::default(),
        };
    };

    let mut space = EmptySpace::new(solid, &bounds);
    let shells = space.shells(solid);
    let topology = Topology {
        volumes: volumes(solid, &space.slots),
        voids: space.voids(),
    };
    Boundary { shells, topology }
}

/// Boundary shells of `solid`, exterior first. Empty for the empty solid.
pub fn extract_shells(solid: &Solid) -> Vec<Shell> {
    match solid.bounds() {
        Some(bounds) => EmptySpace::new(solid, &bounds).shells(solid),
        None => Vec::new(),
    }
}

/// Count volumes and enclosed voids of `solid`.
pub fn topology(solid: &Solid) -> Topology {
    let Some(bounds) = solid.bounds() else {
        return Topology::default();
    };

    let mut space = EmptySpace::new(solid, &bounds);
    Topology {
        volumes: volumes(solid, &space.slots),
        voids: space.voids(),
    }
}
