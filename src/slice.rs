// Copyright 2024 ndshape developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-axis slicing specifications (§4.8), used by [`crate::view::ArrayView`]
//! and [`crate::array::Array`]'s `crop`/`view_with` family.
//!
//! Grounded on `rust-ndarray`'s `SliceInfo`/`SliceInfoElem`
//! (`src/slice.rs`): there, each axis of an indexing expression is either a
//! single index (drops the axis), a full-range marker, or a `Range` with an
//! optional step. This crate keeps the same three-way split but without
//! the step (§3.1 has no stride-skipping slice syntax) and without the
//! teacher's `NewAxis` variant (inserting axes is out of scope; see
//! SPEC_FULL.md's non-goals).

use crate::dim::{Dim, Dynamic};
use crate::error::ShapeError;
use crate::interval::Interval;
use crate::shape::{Shape, ShapeStatic};

/// One axis's entry in a `view_with`/`crop` call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IndexSpec {
    /// A single index: the axis is removed from the result (it is
    /// addressed, not kept).
    Single(isize),
    /// The whole dimension, unchanged.
    All,
    /// `[lo, lo + extent)`, cropping the dimension but keeping the axis.
    Range(isize, isize),
}

impl IndexSpec {
    fn as_interval(&self, dim: &Dim) -> Interval {
        match *self {
            IndexSpec::Single(i) => Interval::new(i, 1),
            IndexSpec::All => Interval::new(dim.min(), dim.extent()),
            IndexSpec::Range(lo, extent) => Interval::new(lo, extent),
        }
    }

    fn keeps_axis(&self) -> bool {
        !matches!(self, IndexSpec::Single(_))
    }
}

/// Crops and axis-drops `shape` per `specs`, one entry per input axis, and
/// returns the resulting shape (of the reduced rank `M`, the number of
/// `specs` that are not `Single`) plus the flat offset to add to the base
/// pointer of whatever the shape indexes into.
///
/// `M` must match the number of non-`Single` entries in `specs`; this is a
/// caller obligation (checked by a debug assertion), since `M` cannot be
/// computed from `specs` at compile time.
pub fn view_with<const RANK: usize, K: ShapeStatic<RANK>, const M: usize>(
    shape: &Shape<RANK, K>,
    specs: [IndexSpec; RANK],
) -> Result<(Shape<M>, isize), ShapeError> {
    debug_assert_eq!(specs.iter().filter(|s| s.keeps_axis()).count(), M);

    let mut offset = 0isize;
    let mut out = [Dim::<Dynamic>::default(); M];
    let mut out_axis = 0usize;

    for axis in 0..RANK {
        let dim = shape.dim(axis);
        let interval = specs[axis].as_interval(&dim);
        if !dim.is_in_range_interval(interval.min(), interval.extent()) {
            return Err(ShapeError::out_of_range(&[dim.min(), dim.max()], &[interval.min(), interval.max()]));
        }
        offset += dim.offset(interval.min());
        if specs[axis].keeps_axis() {
            if out_axis >= M {
                return Err(ShapeError::incompatible_shape(&[M as isize], &[out_axis as isize + 1]));
            }
            out[out_axis] = Dim::new(0, interval.extent(), dim.stride());
            out_axis += 1;
        }
    }
    if out_axis != M {
        return Err(ShapeError::incompatible_shape(&[M as isize], &[out_axis as isize]));
    }

    Ok((Shape::new_unchecked(out), offset))
}
