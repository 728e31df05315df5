// Copyright 2024 ndshape developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The deterministic auto-stride algorithm of §4.3.
//!
//! A shape may leave some axes' strides unresolved (`Dim::new_unresolved`).
//! `resolve` assigns each of them the smallest stride that packs it next to
//! the dimensions whose strides are already fixed, without overlapping any
//! of them — a tiling problem, not a formula. The approach: sort the fixed
//! dims by ascending `|stride|`; walk them while maintaining a `cursor`,
//! the smallest stride not yet ruled out; the unresolved dim takes `cursor`
//! as soon as it fits in the gap before the next fixed dim, i.e.
//! `cursor * extent <= next.stride`. If it never fits, it ends up outside
//! all of them, stacked on top at `cursor`.
//!
//! When more than one axis is unresolved, they are resolved in axis order,
//! each one joining the "known" set for the next.

use crate::dim::{Dim, Dynamic, DYNAMIC};

use super::{Shape, ShapeStatic};

pub fn resolve<const RANK: usize, K: ShapeStatic<RANK>>(shape: &Shape<RANK, K>) -> Shape<RANK, K> {
    let mut dims = *shape.raw_dims();

    for axis in 0..RANK {
        if !dims[axis].is_stride_unresolved() {
            continue;
        }
        let extent = dims[axis].extent();
        let stride = resolve_one(&dims, axis, extent);
        dims[axis] = dims[axis].with_stride(stride);
    }

    Shape::new_unchecked(dims)
}

/// Computes the stride for the unresolved dim at `axis`, given every other
/// dim in `dims` whose stride is already fixed (axes still unresolved are
/// ignored; they haven't been assigned yet and so don't constrain anyone).
fn resolve_one<const RANK: usize>(dims: &[Dim<Dynamic>; RANK], axis: usize, extent: isize) -> isize {
    let mut known: Vec<(isize, isize)> = dims
        .iter()
        .enumerate()
        .filter(|&(i, d)| i != axis && !d.is_stride_unresolved())
        .map(|(_, d)| (d.stride().abs(), d.extent()))
        .collect();
    known.sort_by_key(|&(stride, _)| stride);

    let mut cursor = 1isize;
    for (stride, next_extent) in known {
        if cursor * extent <= stride {
            return cursor;
        }
        cursor = stride * next_extent;
    }
    cursor
}

/// Clears every axis `K` doesn't statically pin a stride for, then resolves
/// from scratch — producing the smallest compact layout consistent with the
/// shape's extents and whatever strides `K` does fix (§4.5).
pub fn make_compact<const RANK: usize, K: ShapeStatic<RANK>>(shape: &Shape<RANK, K>) -> Shape<RANK, K> {
    let mut dims = *shape.raw_dims();
    for axis in 0..RANK {
        if K::DIMS[axis].stride == DYNAMIC {
            dims[axis] = dims[axis].with_stride(DYNAMIC);
        }
    }
    resolve(&Shape::new_unchecked(dims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dim::dim;
    use crate::shape::shape;

    #[test]
    fn single_unresolved_axis_takes_the_gap_below_the_only_known_dim() {
        // gap below stride 20 is [1, 20); extent 4 fits (4 <= 20).
        let s = shape([Dim::new_unresolved(0, 4), dim(0, 4, 20)]);
        let r = resolve(&s);
        assert_eq!(r.dim(0).stride(), 1);
    }

    #[test]
    fn unresolved_axis_fuses_past_a_known_dim_that_leaves_no_room() {
        // gap below stride 2 is [1, 2); extent 4 does not fit (4 > 2), so
        // the known dim is fused into the cursor (cursor = 2 * 4 = 8) and
        // the unresolved axis stacks on top of it.
        let s = shape([Dim::new_unresolved(0, 4), dim(0, 4, 2)]);
        let r = resolve(&s);
        assert_eq!(r.dim(0).stride(), 8);
    }

    #[test]
    fn unresolved_axis_fuses_one_known_dim_then_fits_in_the_next_gap() {
        let s = shape([Dim::new_unresolved(0, 3), dim(0, 2, 1), dim(0, 4, 16)]);
        let r = resolve(&s);
        // dim(0,2,1) fuses first (cursor = 1*2 = 2), then extent 3 fits
        // below stride 16 (2*3 = 6 <= 16).
        assert_eq!(r.dim(0).stride(), 2);
    }

    #[test]
    fn unresolved_axis_stacks_above_every_known_dim_when_nothing_fits() {
        let s = shape([Dim::new_unresolved(0, 5), dim(0, 4, 2), dim(0, 2, 8)]);
        let r = resolve(&s);
        // neither gap fits extent 5: cursor fuses through both known dims,
        // 1 -> 2*4=8 -> 8*2=16.
        assert_eq!(r.dim(0).stride(), 16);
    }

    #[test]
    fn resolve_is_idempotent() {
        let s = shape([Dim::new_unresolved(0, 4), dim(0, 4, 20)]);
        let once = resolve(&s);
        let twice = resolve(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn make_compact_reassigns_dynamic_strides_only() {
        let s = shape([dim(0, 4, 1), dim(0, 4, 100)]);
        let c = make_compact(&s);
        // both axes are dynamic under AllDynamic, so both get re-resolved
        // from a clean slate: smallest extent-compatible run is dense.
        assert!(c.is_compact());
        assert!(c.is_one_to_one());
    }

    #[test]
    fn interleaved_layout_seed_scenarios() {
        // {5, {0,4,20}, {0,3,1}} -> dim-0 stride 3
        let s = shape([Dim::new_unresolved(0, 5), dim(0, 4, 20), dim(0, 3, 1)]);
        assert_eq!(resolve(&s).dim(0).stride(), 3);

        // {5, {0,4,15}, {0,3,1}} -> dim-0 stride 3
        let s = shape([Dim::new_unresolved(0, 5), dim(0, 4, 15), dim(0, 3, 1)]);
        assert_eq!(resolve(&s).dim(0).stride(), 3);

        // {5, {0,4,14}, {0,3,1}} -> dim-0 stride 56 (doesn't fit, stacks above both)
        let s = shape([Dim::new_unresolved(0, 5), dim(0, 4, 14), dim(0, 3, 1)]);
        assert_eq!(resolve(&s).dim(0).stride(), 56);
    }

    #[test]
    fn row_major_auto_stride_seed_scenario() {
        // shape_of_rank<2>(5,10).resolve() has strides {1, 5}.
        let s = crate::shape::shape_of_rank::<2>([5, 10]);
        let r = resolve(&s);
        assert_eq!(r.dim(0).stride(), 1);
        assert_eq!(r.dim(1).stride(), 5);
    }

    #[test]
    fn make_compact_seed_scenario() {
        // shape(dim(3,5,8), dim(1,4,1)) -> shape(dim(3,5,1), dim(1,4,5))
        let s = shape([dim(3, 5, 8), dim(1, 4, 1)]);
        let c = make_compact(&s);
        assert_eq!(c.dim(0), dim(3, 5, 1));
        assert_eq!(c.dim(1), dim(1, 4, 5));
    }
}
