// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Lattice solids stored as vertical spans per column
//!
//! A [`Solid`] is a set of lattice cells. Every column `(i, j)` holds a sorted
//! list of disjoint, non-touching half-open spans `[lo, hi)` along z. The
//! representation is canonical, so two solids covering the same cells compare
//! equal no matter how they were assembled.

use super::Lattice;
use serde::Serialize;
use std::collections::BTreeMap;

/// Lattice column index `(i, j)`.
pub type Column = (i64, i64);

/// Half-open run of cells `[lo, hi)` along z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Span {
    pub lo: i64,
    pub hi: i64,
}

impl Span {
    pub fn new(lo: i64, hi: i64) -> Self {
        debug_assert!(lo < hi, "empty span [{lo}, {hi})");
        Self { lo, hi }
    }

    pub fn len(&self) -> i64 {
        self.hi - self.lo
    }

    /// Common part of two spans, if it has positive length.
    pub fn overlap(&self, other: &Span) -> Option<Span> {
        let lo = self.lo.max(other.lo);
        let hi = self.hi.min(other.hi);
        (lo < hi).then_some(Span { lo, hi })
    }

    fn expanded(&self, radius: i64) -> Span {
        Span {
            lo: self.lo - radius,
            hi: self.hi + radius,
        }
    }
}

/// Inclusive cell bounds of a non-empty solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellBounds {
    pub min: [i64; 3],
    /// Exclusive upper corner.
    pub max: [i64; 3],
}

/// Set of lattice cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Solid {
    columns: BTreeMap<Column, Vec<Span>>,
}

impl Solid {
    /// The empty solid; identity of [`Solid::union`].
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn cell_count(&self) -> u64 {
        self.columns
            .values()
            .flatten()
            .map(|span| span.len() as u64)
            .sum()
    }

    pub fn volume(&self, lattice: &Lattice) -> f64 {
        self.cell_count() as f64 * lattice.cell_volume()
    }

    /// Spans of one column, empty if the column holds no cells.
    pub fn spans(&self, column: Column) -> &[Span] {
        self.columns.get(&column).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Occupied columns in ascending order.
    pub fn columns(&self) -> impl Iterator<Item = (Column, &[Span])> + '_ {
        self.columns
            .iter()
            .map(|(column, spans)| (*column, spans.as_slice()))
    }

    pub fn contains(&self, cell: [i64; 3]) -> bool {
        self.spans((cell[0], cell[1]))
            .iter()
            .any(|span| span.lo <= cell[2] && cell[2] < span.hi)
    }

    /// Add the cells of `span` to `column`.
    pub fn insert(&mut self, column: Column, span: Span) {
        if span.lo >= span.hi {
            return;
        }
        let spans = self.columns.entry(column).or_default();
        spans.push(span);
        normalize(spans);
    }

    /// Cell union. Consumes both operands and reuses the larger one.
    pub fn union(self, other: Solid) -> Solid {
        let (mut base, extra) = if self.columns.len() >= other.columns.len() {
            (self, other)
        } else {
            (other, self)
        };

        for (column, spans) in extra.columns {
            match base.columns.get_mut(&column) {
                Some(existing) => {
                    existing.extend(spans);
                    normalize(existing);
                }
                None => {
                    base.columns.insert(column, spans);
                }
            }
        }
        base
    }

    /// Minkowski sum with a cube of half-extent `radius` cells.
    pub fn dilate(&self, radius: i64) -> Solid {
        if radius <= 0 || self.is_empty() {
            return self.clone();
        }

        let mut columns: BTreeMap<Column, Vec<Span>> = BTreeMap::new();
        for (&(i, j), spans) in &self.columns {
            for di in -radius..=radius {
                for dj in -radius..=radius {
                    columns
                        .entry((i + di, j + dj))
                        .or_default()
                        .extend(spans.iter().map(|span| span.expanded(radius)));
                }
            }
        }

        for spans in columns.values_mut() {
            normalize(spans);
        }
        Solid { columns }
    }

    /// Cell bounds, `None` for the empty solid.
    pub fn bounds(&self) -> Option<CellBounds> {
        let (&(first_i, _), _) = self.columns.iter().next()?;
        let (&(last_i, _), _) = self.columns.iter().next_back()?;

        let mut min = [first_i, i64::MAX, i64::MAX];
        let mut max = [last_i + 1, i64::MIN, i64::MIN];
        for (&(_, j), spans) in &self.columns {
            min[1] = min[1].min(j);
            max[1] = max[1].max(j + 1);
            if let (Some(bottom), Some(top)) = (spans.first(), spans.last()) {
                min[2] = min[2].min(bottom.lo);
                max[2] = max[2].max(top.hi);
            }
        }
        Some(CellBounds { min, max })
    }
}

/// Sort spans and merge the ones that overlap or touch.
fn normalize(spans: &mut Vec<Span>) {
    if spans.len() < 2 {
        return;
    }
    spans.sort_unstable();

    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans.drain(..) {
        match merged.last_mut() {
            Some(last) if span.lo <= last.hi => last.hi = last.hi.max(span.hi),
            _ => merged.push(span),
        }
    }
    *spans = merged;
}
