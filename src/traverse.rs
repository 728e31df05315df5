// Copyright 2024 ndshape developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Index traversal (§4.7): visiting every index tuple a [`crate::shape::Shape`]
//! addresses, in a chosen axis order.
//!
//! Grounded on `rust-ndarray`'s iterator machinery (`src/iterators/mod.rs`),
//! which drives nested index generation with a manually incremented
//! counter array rather than recursion, to keep the hot loop flat and
//! branch-predictable. This module does the same, parameterized by an
//! explicit `Order` (the axis visitation order) instead of a fixed
//! row-major default.

use crate::shape::{Shape, ShapeStatic};

/// The axis visitation order for a traversal: `order[0]` is the
/// slowest-varying axis, `order[RANK - 1]` the fastest. `[0, 1, ..., RANK - 1]`
/// is row-major (C order); reversing it is column-major (Fortran order).
pub type Order<const RANK: usize> = [usize; RANK];

/// The default, row-major order: axis 0 slowest, axis `RANK - 1` fastest.
pub fn row_major<const RANK: usize>() -> Order<RANK> {
    let mut order = [0usize; RANK];
    for (i, o) in order.iter_mut().enumerate() {
        *o = i;
    }
    order
}

/// The reverse, column-major order: axis `RANK - 1` slowest, axis 0 fastest.
pub fn column_major<const RANK: usize>() -> Order<RANK> {
    let mut order = row_major::<RANK>();
    order.reverse();
    order
}

/// Calls `f` once for every index tuple in `shape`'s domain, dim 0 varying
/// fastest — the crate's default traversal order, matching §4.7/§8.3's
/// concrete scenario (`dense_shape<2>(10,4)` visits `(0,0),(1,0),…,(9,0),
/// (0,1),…`). Equivalent to `for_each_index_ordered(shape, column_major(), f)`.
pub fn for_each_index<const RANK: usize, K: ShapeStatic<RANK>>(
    shape: &Shape<RANK, K>,
    f: &mut dyn FnMut([isize; RANK]),
) {
    for_each_index_ordered(shape, column_major(), f)
}

/// Calls `f` once for every index tuple in `shape`'s domain, in the axis
/// order given by `order`. Takes `f` by `&mut` so callers can mutate
/// captured state between calls without `FnMut`'s move-capture getting in
/// the way of reusing the closure afterwards.
pub fn for_each_index_ordered<const RANK: usize, K: ShapeStatic<RANK>>(
    shape: &Shape<RANK, K>,
    order: Order<RANK>,
    f: &mut dyn FnMut([isize; RANK]),
) {
    if RANK == 0 {
        if shape.size() > 0 {
            f([0isize; RANK]);
        }
        return;
    }
    if shape.size() == 0 {
        return;
    }

    let extents: [isize; RANK] = std::array::from_fn(|axis| shape.dim(axis).max() - shape.dim(axis).min() + 1);
    let mins: [isize; RANK] = std::array::from_fn(|axis| shape.dim(axis).min());

    let mut idx = mins;
    loop {
        f(idx);

        // Increment starting from the fastest-varying axis (last in `order`).
        let mut carry = true;
        for &axis in order.iter().rev() {
            if !carry {
                break;
            }
            idx[axis] += 1;
            if idx[axis] > mins[axis] + extents[axis] - 1 {
                idx[axis] = mins[axis];
                carry = true;
            } else {
                carry = false;
            }
        }
        if carry {
            break;
        }
    }
}

/// Calls `f` with every `(index, offset)` pair in `shape`'s domain, dim 0
/// varying fastest. A thin wrapper over [`for_each_index`] that also
/// computes the linear offset, since nearly every caller wants both.
pub fn for_each_index_and_offset<const RANK: usize, K: ShapeStatic<RANK>>(
    shape: &Shape<RANK, K>,
    f: &mut dyn FnMut([isize; RANK], isize),
) {
    for_each_index(shape, &mut |idx| f(idx, shape.offset(idx)));
}

/// Calls `f` with every `(index, offset)` pair in `shape`'s domain, in
/// `order`. A thin wrapper over [`for_each_index_ordered`].
pub fn for_each_index_and_offset_ordered<const RANK: usize, K: ShapeStatic<RANK>>(
    shape: &Shape<RANK, K>,
    order: Order<RANK>,
    f: &mut dyn FnMut([isize; RANK], isize),
) {
    for_each_index_ordered(shape, order, &mut |idx| f(idx, shape.offset(idx)));
}

/// Walks two shapes of the same rank and (assumed) matching extents in
/// lock-step, row-major, calling `f` with each shape's own absolute index
/// for the same local position. Used by `copy`/`move_into`/`equal` (§4.9),
/// which operate over matching extents but not necessarily matching
/// `min`s or strides.
pub fn for_each_index_pair<const RANK: usize, KA: ShapeStatic<RANK>, KB: ShapeStatic<RANK>>(
    a: &Shape<RANK, KA>,
    b: &Shape<RANK, KB>,
    mut f: impl FnMut([isize; RANK], [isize; RANK]),
) {
    if RANK == 0 {
        if a.size() > 0 && b.size() > 0 {
            f([0isize; RANK], [0isize; RANK]);
        }
        return;
    }
    if a.size() == 0 || b.size() == 0 {
        return;
    }
    let a_mins: [isize; RANK] = std::array::from_fn(|axis| a.dim(axis).min());
    let b_mins: [isize; RANK] = std::array::from_fn(|axis| b.dim(axis).min());
    let extents: [isize; RANK] = std::array::from_fn(|axis| a.dim(axis).extent());

    let zero_based = crate::shape::shape_of_rank::<RANK>(extents);
    for_each_index_ordered(&zero_based, row_major(), &mut |local| {
        let a_idx: [isize; RANK] = std::array::from_fn(|axis| a_mins[axis] + local[axis]);
        let b_idx: [isize; RANK] = std::array::from_fn(|axis| b_mins[axis] + local[axis]);
        f(a_idx, b_idx);
    });
}
