// Copyright 2024 ndshape developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `Shape<const RANK: usize, K>`: a fixed-rank tuple of [`Dim`]s.
//!
//! Grounded on `rust-ndarray`'s dimension module (`src/dimension/mod.rs`,
//! `dimension_trait.rs`): there, a `Dimension` is a runtime index tuple
//! (`Dim<[Ix; N]>` or `IxDyn`) with no per-axis compile-time information
//! beyond its rank. This crate's `Shape` keeps that same runtime-array
//! backing (`[Dim<Dynamic>; RANK]`, so all dims have one uniform runtime
//! layout — see the "heterogeneous-tuple shape vs uniform shape" design
//! note) but adds a second, optional compile-time channel: a zero-sized `K:
//! ShapeStatic<RANK>` tag supplying a `const` array of per-axis
//! `StaticDimSpec`s. Construction validates the runtime dims against `K`;
//! afterwards, `K` is read wherever a per-axis compile-time fact changes
//! behavior (principally, whether an axis is a broadcast dimension).

use std::fmt;
use std::marker::PhantomData;

use crate::dim::{compatible_scalar, Dim, Dynamic, DYNAMIC};
use crate::error::ShapeError;
use crate::interval::Interval;

pub mod optimize;
pub mod resolve;

pub use optimize::dynamic_optimize_shape;
pub use resolve::resolve;

/// Compile-time description of one axis of a [`Shape`].
///
/// Any field left at [`DYNAMIC`] is only known at runtime. `broadcast`
/// marks the axis as a broadcast dimension (§4.1): `Shape` methods that
/// touch bounds-checking or offset computation special-case such axes by
/// consulting this flag rather than the axis's runtime fields.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StaticDimSpec {
    pub min: isize,
    pub extent: isize,
    pub stride: isize,
    pub broadcast: bool,
}

impl StaticDimSpec {
    /// An axis with nothing known at compile time.
    pub const DYNAMIC: StaticDimSpec =
        StaticDimSpec { min: DYNAMIC, extent: DYNAMIC, stride: DYNAMIC, broadcast: false };

    /// An axis whose stride is statically fixed to 1 (a dense dimension).
    pub const fn dense() -> Self {
        StaticDimSpec { min: DYNAMIC, extent: DYNAMIC, stride: 1, broadcast: false }
    }

    /// An axis that is a broadcast dimension: stride statically 0, always in range.
    pub const fn broadcast() -> Self {
        StaticDimSpec { min: DYNAMIC, extent: DYNAMIC, stride: 0, broadcast: true }
    }
}

/// A compile-time tag describing the per-axis static information of a
/// [`Shape`]. Implement this on a zero-sized marker type; see
/// [`AllDynamic`] for the fully-dynamic fallback used by default.
pub trait ShapeStatic<const RANK: usize>: Copy + Clone + fmt::Debug + 'static {
    /// Per-axis compile-time facts, in axis order.
    const DIMS: [StaticDimSpec; RANK];
}

/// The fully-dynamic shape tag: no axis has anything fixed at compile time.
#[derive(Copy, Clone, Debug, Default)]
pub struct AllDynamic<const RANK: usize>;

impl<const RANK: usize> ShapeStatic<RANK> for AllDynamic<RANK> {
    const DIMS: [StaticDimSpec; RANK] = [StaticDimSpec::DYNAMIC; RANK];
}

/// A fixed-rank tuple of dimensions. `RANK` is the rank (always known at
/// compile time, per §3.2's "rank is immutable after construction" and the
/// "no dynamic-rank arrays" non-goal). `K` optionally pins some axes'
/// fields at compile time; the default, [`AllDynamic`], pins none.
#[derive(Copy, Clone)]
pub struct Shape<const RANK: usize, K: ShapeStatic<RANK> = AllDynamic<RANK>> {
    dims: [Dim<Dynamic>; RANK],
    _static: PhantomData<K>,
}

impl<const RANK: usize, K: ShapeStatic<RANK>> Shape<RANK, K> {
    /// Builds a shape from `RANK` dims, validating each against `K::DIMS`.
    pub fn new(dims: [Dim<Dynamic>; RANK]) -> Result<Self, ShapeError> {
        for (axis, d) in dims.iter().enumerate() {
            let spec = K::DIMS[axis];
            if !compatible_scalar(spec.min, d.min())
                || !compatible_scalar(spec.extent, d.extent())
                || !compatible_scalar(spec.stride, d.stride())
            {
                let expected: Vec<isize> = K::DIMS.iter().map(|s| s.extent).collect();
                return Err(ShapeError::incompatible_shape(&expected, &dims_to_extents(&dims)));
            }
        }
        Ok(Shape { dims, _static: PhantomData })
    }

    /// Builds a shape without validating against `K::DIMS`. Only used
    /// internally where the dims are already known-compatible (e.g. the
    /// output of `resolve`, which only ever fills in axes `K` marks
    /// dynamic).
    pub(crate) fn new_unchecked(dims: [Dim<Dynamic>; RANK]) -> Self {
        Shape { dims, _static: PhantomData }
    }

    /// The rank of this shape.
    #[inline]
    pub const fn rank(&self) -> usize {
        RANK
    }

    /// The dim at `axis`.
    #[inline]
    pub fn dim(&self, axis: usize) -> Dim<Dynamic> {
        self.dims[axis]
    }

    pub(crate) fn raw_dims(&self) -> &[Dim<Dynamic>; RANK] {
        &self.dims
    }

    fn is_broadcast_axis(axis: usize) -> bool {
        K::DIMS[axis].broadcast
    }

    /// The number of elements addressed: the product of extents.
    pub fn size(&self) -> isize {
        self.dims.iter().map(Dim::extent).product()
    }

    /// The minimum offset reached over the whole index domain.
    pub fn flat_min(&self) -> isize {
        if self.size() == 0 {
            return 0;
        }
        self.dims.iter().map(Dim::flat_min).sum()
    }

    /// The maximum offset reached over the whole index domain.
    pub fn flat_max(&self) -> isize {
        if self.size() == 0 {
            return 0;
        }
        self.dims.iter().map(Dim::flat_max).sum()
    }

    /// `flat_max - flat_min + 1`: the span of offsets the shape could
    /// possibly produce. Always `>= size()` (§8.1).
    pub fn flat_extent(&self) -> isize {
        if self.size() == 0 {
            return 0;
        }
        self.flat_max() - self.flat_min() + 1
    }

    /// Every integer in `[flat_min, flat_max]` is the offset of some index.
    ///
    /// An empty shape (`size() == 0`) is vacuously compact.
    pub fn is_compact(&self) -> bool {
        if self.size() == 0 {
            return true;
        }
        nesting(&self.dims).gapless
    }

    /// No two distinct index tuples produce the same offset.
    ///
    /// An empty shape (`size() == 0`) is vacuously one-to-one.
    pub fn is_one_to_one(&self) -> bool {
        if self.size() == 0 {
            return true;
        }
        nesting(&self.dims).non_overlapping
    }

    /// Whether every coordinate of `idx` lies in its dimension's `[min, max]`
    /// (broadcast axes are always in range).
    pub fn is_in_range(&self, idx: [isize; RANK]) -> bool {
        (0..RANK).all(|axis| Self::is_broadcast_axis(axis) || self.dims[axis].is_in_range(idx[axis]))
    }

    /// Whether every axis's cropping interval lies within the shape's
    /// corresponding dimension.
    pub fn is_in_range_intervals(&self, intervals: &[Interval; RANK]) -> bool {
        (0..RANK).all(|axis| {
            Self::is_broadcast_axis(axis)
                || self.dims[axis].is_in_range_interval(intervals[axis].min(), intervals[axis].extent())
        })
    }

    /// The linear offset of index tuple `idx`: `sum_k dim[k].stride * idx[k]`.
    #[inline]
    pub fn offset(&self, idx: [isize; RANK]) -> isize {
        (0..RANK).map(|axis| self.dims[axis].offset(idx[axis])).sum()
    }

    /// Like [`Shape::offset`], but first checks `is_in_range`.
    pub fn checked_offset(&self, idx: [isize; RANK]) -> Result<isize, ShapeError> {
        if self.is_in_range(idx) {
            Ok(self.offset(idx))
        } else {
            Err(ShapeError::out_of_range(
                &self.dims.iter().map(Dim::max).collect::<Vec<_>>(),
                &idx,
            ))
        }
    }

    /// Converts `self` to a shape typed `K2` of rank `RANK2`, per §4.2's
    /// compatibility rule: every axis of `K2` that fixes a field statically
    /// must agree with `self`'s runtime value for that axis. When
    /// `RANK2 > RANK` the extra trailing axes are padded with
    /// `Dim(0, 1, 0)` (a unit dimension).
    pub fn convert_shape<const RANK2: usize, K2: ShapeStatic<RANK2>>(
        &self,
    ) -> Result<Shape<RANK2, K2>, ShapeError> {
        if RANK2 < RANK {
            return Err(ShapeError::incompatible_shape(&dims_to_extents(&self.dims), &[RANK2 as isize]));
        }
        let mut out = [Dim::<Dynamic>::default(); RANK2];
        for axis in 0..RANK2 {
            let d = if axis < RANK { self.dims[axis] } else { Dim::new(0, 1, 0) };
            let spec = K2::DIMS[axis];
            if !compatible_scalar(spec.min, d.min())
                || !compatible_scalar(spec.extent, d.extent())
                || !compatible_scalar(spec.stride, d.stride())
            {
                return Err(ShapeError::incompatible_shape(
                    &dims_to_extents(&self.dims),
                    &[d.min(), d.extent(), d.stride()],
                ));
            }
            out[axis] = d;
        }
        Ok(Shape::new_unchecked(out))
    }

    /// Whether `convert_shape::<RANK2, K2>` would succeed.
    pub fn is_compatible<const RANK2: usize, K2: ShapeStatic<RANK2>>(&self) -> bool {
        self.convert_shape::<RANK2, K2>().is_ok()
    }

    /// Returns a shape whose axis `k` is `self`'s axis `perm[k]` — a pure
    /// index permutation; strides and storage are untouched (§4.6).
    pub fn transpose(&self, perm: [usize; RANK]) -> Shape<RANK> {
        let mut out = [Dim::<Dynamic>::default(); RANK];
        for (k, &p) in perm.iter().enumerate() {
            out[k] = self.dims[p];
        }
        Shape::new_unchecked(out)
    }

    /// Returns a shape of rank `M` selecting `self`'s axes `perm[0..M]`
    /// (§4.6). `M` is ordinarily `<= RANK`; every index in `perm` must be a
    /// valid axis of `self`.
    pub fn reorder<const M: usize>(&self, perm: [usize; M]) -> Shape<M> {
        let mut out = [Dim::<Dynamic>::default(); M];
        for (k, &p) in perm.iter().enumerate() {
            out[k] = self.dims[p];
        }
        Shape::new_unchecked(out)
    }

    /// Fills in unresolved strides via the deterministic auto-stride
    /// algorithm of §4.3. Idempotent: resolving an already-resolved shape
    /// returns it unchanged.
    pub fn resolve(&self) -> Shape<RANK, K> {
        resolve::resolve(self)
    }

    /// Returns a shape with the same `min`/`extent` fields but strides
    /// reassigned so the result is compact (§4.5). Axes whose stride `K`
    /// fixes statically keep that stride; the rest are cleared and
    /// resolved from scratch.
    pub fn make_compact(&self) -> Shape<RANK, K> {
        resolve::make_compact(self)
    }
}

impl<const RANK: usize, K: ShapeStatic<RANK>> fmt::Debug for Shape<RANK, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.dims.iter()).finish()
    }
}

impl<const RANK: usize, K: ShapeStatic<RANK>, K2: ShapeStatic<RANK>> PartialEq<Shape<RANK, K2>>
    for Shape<RANK, K>
{
    fn eq(&self, other: &Shape<RANK, K2>) -> bool {
        self.dims == other.dims
    }
}

impl<const RANK: usize, K: ShapeStatic<RANK>> Eq for Shape<RANK, K> {}

fn dims_to_extents(dims: &[Dim<Dynamic>]) -> Vec<isize> {
    dims.iter().map(Dim::extent).collect()
}

/// The outcome of sorting a dim list by `|stride|` and checking adjacent
/// nesting, shared by `is_compact`/`is_one_to_one` and by the optimizer's
/// fusion pass.
pub(crate) struct Nesting {
    pub gapless: bool,
    pub non_overlapping: bool,
}

pub(crate) fn nesting(dims: &[Dim<Dynamic>]) -> Nesting {
    let mut active: Vec<(isize, isize)> = dims
        .iter()
        .filter(|d| d.extent() > 1)
        .map(|d| (d.stride().abs(), d.extent()))
        .collect();
    active.sort_by_key(|&(stride, _)| stride);

    let mut gapless = true;
    let mut non_overlapping = true;
    let mut next_expected = 1isize;
    let mut covered = 0isize;
    for &(stride, extent) in &active {
        if stride <= covered {
            non_overlapping = false;
        }
        if stride != next_expected {
            gapless = false;
        }
        covered = covered.max(stride * (extent - 1) + stride);
        next_expected = stride * extent;
    }
    Nesting { gapless, non_overlapping }
}

/// Builds a shape from `RANK` dims — the fully-dynamic default shape
/// constructor from the external interface table.
pub fn shape<const RANK: usize>(dims: [Dim<Dynamic>; RANK]) -> Shape<RANK> {
    Shape::new(dims).expect("fully dynamic shape construction is infallible")
}

/// Builds a shape of rank `RANK` whose dims have the given extents and
/// unresolved strides, `min = 0` (`shape_of_rank<R>(...)`).
pub fn shape_of_rank<const RANK: usize>(extents: [isize; RANK]) -> Shape<RANK> {
    let mut dims = [Dim::<Dynamic>::default(); RANK];
    for (d, &e) in dims.iter_mut().zip(extents.iter()) {
        *d = Dim::new_unresolved(0, e);
    }
    Shape::new_unchecked(dims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dim::{dim, dim_of_extent};

    #[test]
    fn rank0_shape_has_size_one() {
        let s: Shape<0> = shape([]);
        assert_eq!(s.size(), 1);
        assert_eq!(s.offset([]), 0);
    }

    #[test]
    fn one_d_strided_offset() {
        let s = shape([dim(0, 10, 2)]);
        for i in 0..10 {
            assert_eq!(s.offset([i]), 2 * i);
        }
    }

    #[test]
    fn size_never_exceeds_flat_extent() {
        let s = shape([dim(0, 5, 21), dim(0, 7, 3), dim(5, 3, 1)]);
        assert!(s.size() <= s.flat_extent());
    }

    #[test]
    fn convert_shape_is_identity_on_itself() {
        let s = shape([dim(0, 4, 1), dim(0, 3, 4)]);
        let converted = s.convert_shape::<2, AllDynamic<2>>().unwrap();
        assert_eq!(s, converted);
    }

    #[test]
    fn convert_shape_pads_with_unit_dim() {
        let s = shape([dim(0, 4, 1)]);
        let converted = s.convert_shape::<2, AllDynamic<2>>().unwrap();
        assert_eq!(converted.dim(1), dim(0, 1, 0));
    }

    #[test]
    fn transpose_is_involution_under_inverse_permutation() {
        let s = shape([dim(0, 4, 1), dim(0, 3, 4), dim(0, 2, 12)]);
        let t = s.transpose([2, 0, 1]);
        let back = t.transpose([1, 2, 0]);
        assert_eq!(s, back);
    }

    #[test]
    fn transpose_preserves_size_under_every_permutation_of_rank_three() {
        use itertools::Itertools;

        let s = shape([dim(0, 2, 12), dim(0, 3, 4), dim(0, 4, 1)]);
        for perm in (0..3).permutations(3) {
            let p: [usize; 3] = perm.try_into().unwrap();
            let t = s.transpose(p);
            assert_eq!(t.size(), s.size());
        }
    }

    quickcheck::quickcheck! {
        fn prop_size_never_exceeds_flat_extent(a: u8, b: u8, c: u8) -> bool {
            let s = shape([
                dim_of_extent(a as isize % 8),
                dim_of_extent(b as isize % 8),
                dim_of_extent(c as isize % 8),
            ])
            .resolve();
            s.size() <= s.flat_extent()
        }

        fn prop_resolve_is_idempotent(a: u8, b: u8) -> bool {
            let s = shape([dim_of_extent(a as isize % 8), dim_of_extent(b as isize % 8)]);
            let once = s.resolve();
            let twice = once.resolve();
            once == twice
        }
    }
}
