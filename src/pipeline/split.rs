// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Work splitting for the two-lane fork-join

/// Split `items` into two contiguous halves, the first getting the floor half.
///
/// The halves are disjoint, keep the input order and concatenate back to
/// `items`. Their lengths differ by at most one.
pub fn split<T>(items: &[T]) -> (&[T], &[T]) {
    items.split_at(items.len() / 2)
}
