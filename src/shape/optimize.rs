// Copyright 2024 ndshape developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shape optimization (§4.4): collapsing a shape to the smallest-rank
//! equivalent that still addresses the same offsets for the same indices,
//! for shapes that happen to be contiguous runs stacked on each other.
//!
//! Three passes:
//! 1. Any axis of extent 1 contributes a fixed offset (`min * stride`) to
//!    every index and nothing else; fold it into a running constant and
//!    drop the axis from further consideration.
//! 2. Sort the remaining ("active") axes by ascending `|stride|` and fuse
//!    adjacent ones where the outer axis's stride equals the inner axis's
//!    `stride * extent` — i.e. the outer axis is just "more of the same
//!    run". A fused axis's own `min * stride` also folds into the running
//!    constant.
//! 3. The constant has nowhere else to live, so it is folded into the
//!    `min` of the surviving axis with the smallest stride (dividing by
//!    that axis's stride, which is always exact for a run built this
//!    way). The result is padded back out to `RANK` with trivial
//!    `Dim(0, 1, reach)` axes, `reach` being the total stride span of the
//!    last fused run, so further fusion against the padding is impossible.

use crate::dim::{Dim, Dynamic};

use super::{Shape, ShapeStatic};

pub fn dynamic_optimize_shape<const RANK: usize, K: ShapeStatic<RANK>>(
    shape: &Shape<RANK, K>,
) -> Shape<RANK, K> {
    let dims = *shape.raw_dims();

    let mut offset = 0isize;
    let mut active: Vec<(isize, isize, isize)> = Vec::new(); // (stride, extent, min)
    for d in dims.iter() {
        if d.extent() <= 1 {
            offset += d.min() * d.stride();
        } else {
            active.push((d.stride(), d.extent(), d.min()));
        }
    }
    active.sort_by_key(|&(stride, _, _)| stride.abs());

    let mut groups: Vec<(isize, isize, isize)> = Vec::new();
    for (stride, extent, min) in active {
        if let Some(&(gstride, gextent, _)) = groups.last() {
            if stride.abs() == gstride.abs() * gextent {
                offset += min * stride;
                let last = groups.last_mut().unwrap();
                last.1 = gextent * extent;
                continue;
            }
        }
        groups.push((stride, extent, min));
    }

    if groups.is_empty() {
        let mut out = [Dim::<Dynamic>::default(); RANK];
        for o in out.iter_mut() {
            *o = Dim::new(0, 1, 1);
        }
        if RANK > 0 {
            out[0] = Dim::new(offset, 1, 1);
        }
        return Shape::new_unchecked(out);
    }

    let (lead_stride, lead_extent, lead_min) = groups[0];
    groups[0] = (
        lead_stride,
        lead_extent,
        if lead_stride != 0 { lead_min + offset / lead_stride } else { lead_min },
    );

    let (reach_stride, reach_extent, _) = *groups.last().unwrap();
    let pad_stride = reach_stride * reach_extent;

    let mut out: Vec<Dim<Dynamic>> = groups.iter().map(|&(s, e, m)| Dim::new(m, e, s)).collect();
    while out.len() < RANK {
        out.push(Dim::new(0, 1, pad_stride));
    }
    let mut arr = [Dim::<Dynamic>::default(); RANK];
    arr.copy_from_slice(&out[..RANK]);
    Shape::new_unchecked(arr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dim::{dim, dim_of_extent};
    use crate::shape::shape;

    #[test]
    fn adjacent_dense_runs_fuse_into_one() {
        let s = shape([dim(0, 3, 4), dim(0, 4, 1)]);
        let opt = dynamic_optimize_shape(&s);
        assert_eq!(opt.dim(0), dim(0, 12, 1));
        assert_eq!(opt.dim(1), dim(0, 1, 12));
    }

    #[test]
    fn unit_extent_axis_folds_its_min_into_the_offset() {
        let s = shape([dim(5, 1, 100), dim(0, 4, 1)]);
        let opt = dynamic_optimize_shape(&s);
        // min*stride = 500 folds into the leading (stride-1) axis's min.
        assert_eq!(opt.dim(0), dim(500, 4, 1));
    }

    #[test]
    fn non_adjacent_strides_are_left_unfused() {
        let s = shape([dim(0, 3, 100), dim(0, 4, 1)]);
        let opt = dynamic_optimize_shape(&s);
        assert_eq!(opt.dim(0), dim(0, 4, 1));
        assert_eq!(opt.dim(1), dim(0, 3, 100));
    }

    #[test]
    fn optimize_seed_scenarios() {
        // {{0,5,21},{0,7,3},{5,3,1}} -> {{5,105,1},{0,1,105},{0,1,105}}
        let s = shape([dim(0, 5, 21), dim(0, 7, 3), dim(5, 3, 1)]);
        let opt = dynamic_optimize_shape(&s);
        assert_eq!(opt.dim(0), dim(5, 105, 1));
        assert_eq!(opt.dim(1), dim(0, 1, 105));
        assert_eq!(opt.dim(2), dim(0, 1, 105));

        // {{0,5,40},{0,7,3},{0,2,1}} -> {{0,2,1},{0,7,3},{0,5,40}} (no fusion)
        let s = shape([dim(0, 5, 40), dim(0, 7, 3), dim(0, 2, 1)]);
        let opt = dynamic_optimize_shape(&s);
        assert_eq!(opt.dim(0), dim(0, 2, 1));
        assert_eq!(opt.dim(1), dim(0, 7, 3));
        assert_eq!(opt.dim(2), dim(0, 5, 40));

        // {{0,5,28},{0,7,4},{0,3,1}} -> {{0,3,1},{0,35,4},{0,1,140}}
        let s = shape([dim(0, 5, 28), dim(0, 7, 4), dim(0, 3, 1)]);
        let opt = dynamic_optimize_shape(&s);
        assert_eq!(opt.dim(0), dim(0, 3, 1));
        assert_eq!(opt.dim(1), dim(0, 35, 4));
        assert_eq!(opt.dim(2), dim(0, 1, 140));
    }

    #[test]
    fn optimized_shape_addresses_the_same_offsets() {
        let s = shape([dim(0, 3, 4), dim(0, 4, 1)]);
        let opt = dynamic_optimize_shape(&s);
        // fused into one dense run: the collapsed axis's offset at the
        // flattened row-major index matches the original's offset.
        for i in 0..3 {
            for j in 0..4 {
                let linear = i * 4 + j;
                assert_eq!(opt.dim(0).offset(linear), s.offset([i, j]));
            }
        }
    }

    quickcheck::quickcheck! {
        fn prop_optimize_preserves_flat_bounds_and_cardinality(a: u8, b: u8, c: u8) -> bool {
            let s = shape([
                dim_of_extent(a as isize % 6 + 1),
                dim_of_extent(b as isize % 6 + 1),
                dim_of_extent(c as isize % 6 + 1),
            ])
            .resolve();
            let opt = dynamic_optimize_shape(&s);
            opt.flat_min() == s.flat_min()
                && opt.flat_max() == s.flat_max()
                && opt.size() == s.size()
                && opt.flat_extent() == s.flat_extent()
                && opt.is_compact() == s.is_compact()
                && opt.is_one_to_one() == s.is_one_to_one()
        }
    }
}
