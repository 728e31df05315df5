// Copyright 2024 ndshape developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Owning storage (§3.3): a buffer paired with a [`Shape`] describing how
//! to walk it, plus the construction/assignment/copy operations of §4.9.
//!
//! Grounded on `rust-ndarray`'s `Array`/`OwnedRepr` (`src/lib.rs`,
//! `src/data_repr.rs`), which backs owned storage with a plain `Vec<A>`
//! and derives views from it via a dimension+strides pair. A shape's
//! `flat_extent()` can exceed its `size()` (a non-compact shape built with
//! explicit strides has gaps no index ever addresses), and §4.8/§8.2 pin
//! exact construction/destruction counts of `size()`, not `flat_extent()`,
//! for such shapes — so the backing buffer here is `Vec<MaybeUninit<T>>`
//! sized to `flat_extent()`, with only the in-domain slots ever
//! initialized. Gap slots are allocated space but never constructed,
//! touched, or dropped.

use std::mem::MaybeUninit;

use crate::dim::dim_of_extent;
use crate::error::ShapeError;
use crate::shape::{shape_of_rank, AllDynamic, Shape, ShapeStatic};
use crate::slice::{view_with as slice_view_with, IndexSpec};
use crate::view::ArrayView;

/// Owning, dense-by-default multidimensional storage.
pub struct Array<T, const RANK: usize, K: ShapeStatic<RANK> = AllDynamic<RANK>> {
    data: Vec<MaybeUninit<T>>,
    shape: Shape<RANK, K>,
    /// `data[i]` holds the element at flat offset `i + base_offset`,
    /// i.e. the Vec is indexed by `offset - shape.flat_min()`.
    base_offset: isize,
}

impl<T, const RANK: usize, K: ShapeStatic<RANK>> Array<T, RANK, K> {
    /// Allocates `shape.flat_extent()` uninitialized slots and calls
    /// `make()` once per in-domain cell to fill them, in traversal order.
    /// Shared by every constructor that needs to value-initialize a fresh
    /// buffer (`new`, `from_elem`).
    fn with_domain_init(shape: Shape<RANK, K>, mut make: impl FnMut() -> T) -> Self {
        let shape = shape.resolve();
        let len = shape.flat_extent().max(0) as usize;
        let mut data: Vec<MaybeUninit<T>> = (0..len).map(|_| MaybeUninit::uninit()).collect();
        let base_offset = shape.flat_min();
        crate::traverse::for_each_index(&shape, &mut |idx| {
            let offset = shape.offset(idx);
            data[(offset - base_offset) as usize] = MaybeUninit::new(make());
        });
        Array { data, shape, base_offset }
    }

    /// The shape this array walks.
    pub fn shape(&self) -> &Shape<RANK, K> {
        &self.shape
    }

    #[inline]
    fn data_index(&self, offset: isize) -> usize {
        (offset - self.base_offset) as usize
    }

    /// Writes `value` into an already-uninitialized slot without dropping
    /// whatever was there, i.e. the slot must not currently hold a live
    /// `T` (used only by constructors and `assign`, right after every
    /// previously-live cell has been dropped).
    fn raw_init(&mut self, offset: isize, value: T) {
        let i = self.data_index(offset);
        self.data[i] = MaybeUninit::new(value);
    }

    /// Reads the element at `idx`.
    ///
    /// # Panics
    ///
    /// Panics (in debug builds; see the `unchecked` feature) if `idx` is
    /// out of range.
    pub fn get(&self, idx: [isize; RANK]) -> &T {
        #[cfg(not(feature = "unchecked"))]
        debug_assert!(self.shape.is_in_range(idx), "Array::get: index out of range");
        let offset = self.shape.offset(idx);
        unsafe { self.data[self.data_index(offset)].assume_init_ref() }
    }

    /// Writes `value` at `idx`, dropping whatever was previously there.
    ///
    /// # Panics
    ///
    /// Panics (in debug builds; see the `unchecked` feature) if `idx` is
    /// out of range.
    pub fn set(&mut self, idx: [isize; RANK], value: T) {
        #[cfg(not(feature = "unchecked"))]
        debug_assert!(self.shape.is_in_range(idx), "Array::set: index out of range");
        let offset = self.shape.offset(idx);
        let i = self.data_index(offset);
        *unsafe { self.data[i].assume_init_mut() } = value;
    }

    /// Checked element read.
    pub fn try_get(&self, idx: [isize; RANK]) -> Result<&T, ShapeError> {
        let offset = self.shape.checked_offset(idx)?;
        Ok(unsafe { self.data[self.data_index(offset)].assume_init_ref() })
    }

    /// Checked element write.
    pub fn try_set(&mut self, idx: [isize; RANK], value: T) -> Result<(), ShapeError> {
        let offset = self.shape.checked_offset(idx)?;
        let i = self.data_index(offset);
        *unsafe { self.data[i].assume_init_mut() } = value;
        Ok(())
    }

    /// Resets every in-domain cell to `value` (§4.9's `fill`). Gap cells of
    /// a sparse shape are never touched.
    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        let shape = self.shape;
        crate::traverse::for_each_index(&shape, &mut |idx| self.set(idx, value.clone()));
    }

    /// Calls `f` once per in-domain cell and stores its result there
    /// (§4.9's `generate`). Gap cells of a sparse shape are never touched.
    pub fn generate<F: FnMut() -> T>(&mut self, mut f: F) {
        let shape = self.shape;
        crate::traverse::for_each_index(&shape, &mut |idx| self.set(idx, f()));
    }

    /// A read-only view over this array's full storage.
    pub fn view(&self) -> ArrayView<'_, T, RANK, K> {
        // The view indexes with `self.shape`'s own (possibly non-zero)
        // `min`s, so its base pointer must sit at absolute flat offset 0,
        // i.e. `-base_offset` Vec slots from `data`'s start. `MaybeUninit<T>`
        // is guaranteed the same size and alignment as `T`, so this cast is
        // valid as long as every offset the view actually reads is
        // in-domain (and therefore initialized) — which it is, since the
        // view shares this array's own shape.
        let base_ptr = self.data.as_ptr() as *mut T;
        let base = unsafe { std::ptr::NonNull::new_unchecked(base_ptr.offset(-self.base_offset)) };
        unsafe { ArrayView::from_raw_parts(base, self.shape) }
    }

    /// A cropped/axis-dropped view, per §4.8.
    pub fn view_with<const M: usize>(&self, specs: [IndexSpec; RANK]) -> Result<ArrayView<'_, T, M>, ShapeError> {
        let (sub_shape, offset) = slice_view_with(&self.shape, specs)?;
        let base_ptr = self.data.as_ptr() as *mut T;
        let base = unsafe { std::ptr::NonNull::new_unchecked(base_ptr.offset(offset - self.base_offset)) };
        Ok(unsafe { ArrayView::from_raw_parts(base, sub_shape) })
    }

    /// A view of this array's storage reinterpreted as holding `U` instead
    /// of `T` (§4.8), provided `U` is the same size as `T`.
    pub fn reinterpret<U>(&self) -> Result<ArrayView<'_, U, RANK, K>, ShapeError> {
        self.view().reinterpret::<U>()
    }

    /// Drops every element this array currently addresses, leaving `data`'s
    /// slots logically uninitialized (though still allocated, at their
    /// prior length). Shared by `clear`, `assign`, and this type's `Drop`.
    fn drop_domain(&mut self) {
        let shape = self.shape;
        let base_offset = self.base_offset;
        crate::traverse::for_each_index(&shape, &mut |idx| {
            let offset = shape.offset(idx);
            unsafe { self.data[(offset - base_offset) as usize].assume_init_drop() };
        });
    }

    /// Drops every element (exactly `size()` of them, never `flat_extent()`)
    /// and leaves the array addressing zero elements (§4.9's `clear`).
    pub fn clear(&mut self) {
        self.drop_domain();
        self.data.clear();
        self.shape = shape_of_rank::<RANK>([0; RANK])
            .resolve()
            .convert_shape::<RANK, K>()
            .unwrap_or_else(|_| panic!("clear: zero shape incompatible with this array's static tag"));
        self.base_offset = 0;
    }
}

impl<T, const RANK: usize, K: ShapeStatic<RANK>> Drop for Array<T, RANK, K> {
    fn drop(&mut self) {
        self.drop_domain();
    }
}

impl<T: Clone + Default, const RANK: usize, K: ShapeStatic<RANK>> Array<T, RANK, K> {
    /// Builds an array of the given `shape`, resolved and default-filled
    /// (§4.8's "default construct").
    pub fn new(shape: Shape<RANK, K>) -> Self {
        Self::with_domain_init(shape, T::default)
    }
}

impl<T: Clone, const RANK: usize, K: ShapeStatic<RANK>> Array<T, RANK, K> {
    /// Builds an array of the given `shape`, resolved and copy-filled with
    /// `value` (§4.8's "shape+value construct"). Grounded on
    /// `rust-ndarray`'s `Array::from_elem`.
    pub fn from_elem(shape: Shape<RANK, K>, value: T) -> Self {
        Self::with_domain_init(shape, || value.clone())
    }

    /// Reshapes this array to `shape`, copy-filling every in-domain cell
    /// with `value` (§4.8's `assign(shape, value)`). Reallocates only if
    /// `shape`'s `flat_extent()` exceeds the current buffer's length;
    /// otherwise the existing buffer is reused. Whatever this array held
    /// before is dropped first — `assign` replaces the array wholesale, it
    /// does not merge old and new domains. Cells outside the new shape's
    /// domain (for a sparse shape) are left untouched, never read or
    /// constructed.
    pub fn assign(&mut self, shape: Shape<RANK, K>, value: T) {
        let shape = shape.resolve();
        let new_extent = shape.flat_extent().max(0) as usize;

        self.drop_domain();
        if new_extent > self.data.len() {
            self.data.resize_with(new_extent, MaybeUninit::uninit);
        }
        self.shape = shape;
        self.base_offset = self.shape.flat_min();

        let shape = self.shape;
        crate::traverse::for_each_index(&shape, &mut |idx| {
            let offset = shape.offset(idx);
            self.raw_init(offset, value.clone());
        });
    }

    /// Copies `src(i)` into `self(i)` for every index `i` in `self`'s own
    /// domain (backs the `copy`/`move_into` free functions below). `src`
    /// and `self` address the same coordinate space — unlike [`equal`],
    /// which compares by position, this uses the literal index, so a crop
    /// of `src` can be copied straight into the matching region of a
    /// larger `self` (or vice versa) without either side's `min` lining up
    /// with the other's. Fails with `out_of_range` the first time a `self`
    /// index isn't also in `src`'s domain, before anything is written.
    fn copy_from_view<KS: ShapeStatic<RANK>>(&mut self, src: &ArrayView<'_, T, RANK, KS>) -> Result<(), ShapeError> {
        let dst_shape = self.shape;

        // §4.11: `unchecked` skips this scan entirely, trading the
        // `out_of_range` error for undefined behavior on a missing index.
        #[cfg(not(feature = "unchecked"))]
        {
            let mut missing: Option<[isize; RANK]> = None;
            crate::traverse::for_each_index(&dst_shape, &mut |idx| {
                if missing.is_none() && !src.shape().is_in_range(idx) {
                    missing = Some(idx);
                }
            });
            if let Some(idx) = missing {
                return Err(ShapeError::out_of_range(
                    &(0..RANK).map(|a| src.shape().dim(a).max()).collect::<Vec<_>>(),
                    &idx,
                ));
            }
        }

        let mut indices: Vec<[isize; RANK]> = Vec::new();
        crate::traverse::for_each_index(&dst_shape, &mut |idx| indices.push(idx));
        for idx in indices {
            let value = src.get(idx).clone();
            self.set(idx, value);
        }
        Ok(())
    }
}

impl<T, const RANK: usize, K: ShapeStatic<RANK>> Clone for Array<T, RANK, K>
where
    T: Clone,
{
    /// Deep-copies in-domain cells only (`copy_constructs == size()`, per
    /// §8.2) — gap cells of a sparse shape are never read.
    fn clone(&self) -> Self {
        let shape = self.shape;
        let base_offset = self.base_offset;
        let mut data: Vec<MaybeUninit<T>> = (0..self.data.len()).map(|_| MaybeUninit::uninit()).collect();
        crate::traverse::for_each_index(&shape, &mut |idx| {
            let offset = shape.offset(idx);
            let i = (offset - base_offset) as usize;
            let value = unsafe { self.data[i].assume_init_ref() }.clone();
            data[i] = MaybeUninit::new(value);
        });
        Array { data, shape, base_offset }
    }
}

/// Builds a dense array filled with `T::default()`, one element per index
/// of a row-major shape with the given extents — the free constructor in
/// the external interface table (`array<T,Shape>(shape)` without a value).
pub fn dense<T: Clone + Default, const RANK: usize>(extents: [isize; RANK]) -> Array<T, RANK> {
    let shape = shape_of_rank::<RANK>(extents);
    Array::new(shape)
}

/// Builds a one-dimensional array of the given extent, unresolved stride.
pub fn vector<T: Clone + Default>(extent: isize) -> Array<T, 1> {
    let shape = Shape::new([dim_of_extent(extent)]).expect("dynamic dim always compatible with AllDynamic");
    Array::new(shape)
}

/// Copies every element of `src` into the matching index of `dst`
/// (§4.9's `copy`): for each literal index in `dst`'s domain, `dst`
/// and `src` must address that same index, and `dst(i) = src(i)`.
/// `src` may be a strict superset of `dst`'s domain (e.g. `dst` a
/// cropped view sharing `src`'s coordinate space); it fails with
/// `out_of_range` if any of `dst`'s indices fall outside `src`.
pub fn copy<T: Clone, const RANK: usize, KS: ShapeStatic<RANK>, KD: ShapeStatic<RANK>>(
    src: &Array<T, RANK, KS>,
    dst: &mut Array<T, RANK, KD>,
) -> Result<(), ShapeError> {
    dst.copy_from_view(&src.view())
}

/// Copies every element of `src` into `dst`, then empties `src` (§4.9's
/// `move`, renamed to avoid the Rust keyword).
pub fn move_into<T: Clone, const RANK: usize, KS: ShapeStatic<RANK>, KD: ShapeStatic<RANK>>(
    src: &mut Array<T, RANK, KS>,
    dst: &mut Array<T, RANK, KD>,
) -> Result<(), ShapeError> {
    dst.copy_from_view(&src.view())?;
    src.clear();
    Ok(())
}

/// Structural element-wise equality over two views of matching shape,
/// per §4.9's `equal`.
pub fn equal<T: PartialEq, const RANK: usize, KA: ShapeStatic<RANK>, KB: ShapeStatic<RANK>>(
    a: &ArrayView<'_, T, RANK, KA>,
    b: &ArrayView<'_, T, RANK, KB>,
) -> bool {
    for axis in 0..RANK {
        if a.shape().dim(axis).extent() != b.shape().dim(axis).extent() {
            return false;
        }
    }
    let mut ok = true;
    crate::traverse::for_each_index_pair(a.shape(), b.shape(), |ia, ib| {
        if a.get(ia) != b.get(ib) {
            ok = false;
        }
    });
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::shape;
    use std::cell::Cell;

    #[test]
    fn new_array_is_zero_filled() {
        let a: Array<i32, 2> = Array::new(shape([dim_of_extent(3), dim_of_extent(4)]));
        assert_eq!(*a.get([2, 3]), 0);
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut a: Array<i32, 2> = Array::new(shape([dim_of_extent(3), dim_of_extent(4)]));
        a.set([1, 2], 99);
        assert_eq!(*a.get([1, 2]), 99);
    }

    #[test]
    fn fill_overwrites_every_element() {
        let mut a: Array<i32, 1> = Array::new(shape([dim_of_extent(5)]));
        a.fill(7);
        for i in 0..5 {
            assert_eq!(*a.get([i]), 7);
        }
    }

    #[test]
    fn fill_only_touches_in_domain_cells_of_a_sparse_shape() {
        // size=20, flat_extent=88 (dim(0,5,21) × dim(0,4,1)): a sparse
        // shape where `fill` must not reach outside the 20 addressed cells.
        use crate::dim::dim;
        let mut a: Array<i32, 2> = Array::new(shape([dim(0, 5, 21), dim(0, 4, 1)]));
        assert_eq!(a.shape().size(), 20);
        assert_eq!(a.shape().flat_extent(), 88);
        a.fill(9);
        for i in 0..5isize {
            for j in 0..4isize {
                assert_eq!(*a.get([i, j]), 9);
            }
        }
    }

    #[test]
    fn generate_assigns_successive_callback_results() {
        let counter = Cell::new(0);
        let mut a: Array<i32, 1> = Array::new(shape([dim_of_extent(4)]));
        a.generate(|| {
            let v = counter.get();
            counter.set(v + 1);
            v
        });
        assert_eq!(*a.get([0]), 0);
        assert_eq!(*a.get([3]), 3);
    }

    #[test]
    fn from_elem_copy_fills_every_in_domain_cell() {
        let a: Array<i32, 2> = Array::from_elem(shape([dim_of_extent(2), dim_of_extent(3)]), 5);
        for i in 0..2isize {
            for j in 0..3isize {
                assert_eq!(*a.get([i, j]), 5);
            }
        }
    }

    #[test]
    fn assign_reshapes_and_fills_the_new_domain() {
        let mut a: Array<i32, 2> = Array::new(shape([dim_of_extent(2), dim_of_extent(2)]));
        a.fill(1);
        a.assign(shape([dim_of_extent(3), dim_of_extent(3)]), 8);
        assert_eq!(a.shape().size(), 9);
        for i in 0..3isize {
            for j in 0..3isize {
                assert_eq!(*a.get([i, j]), 8);
            }
        }
    }

    #[test]
    fn assign_does_not_reallocate_when_the_new_shape_is_no_larger() {
        let mut a: Array<i32, 1> = Array::new(shape([dim_of_extent(4)]));
        a.fill(1);
        let old_capacity = a.data.len();
        a.assign(shape([dim_of_extent(2)]), 3);
        assert_eq!(a.data.len(), old_capacity);
        assert_eq!(*a.get([0]), 3);
        assert_eq!(*a.get([1]), 3);
    }

    #[test]
    fn copy_copies_matching_shapes() {
        let mut src_data: Array<i32, 2> = Array::new(shape([dim_of_extent(2), dim_of_extent(2)]));
        src_data.set([0, 0], 1);
        src_data.set([0, 1], 2);
        src_data.set([1, 0], 3);
        src_data.set([1, 1], 4);

        let mut dst: Array<i32, 2> = Array::new(shape([dim_of_extent(2), dim_of_extent(2)]));
        copy(&src_data, &mut dst).unwrap();
        assert_eq!(*dst.get([1, 1]), 4);
    }

    #[test]
    fn copy_accepts_a_destination_cropped_within_the_source_domain() {
        // a_shape{10,20}, b_shape{(1,9),(1,19)} (§8.3 scenario 7): b's
        // domain is fully contained in a's, so the copy succeeds even
        // though the extents differ (9 vs 10, 19 vs 20).
        use crate::dim::Dim;
        let mut a: Array<i32, 2> = Array::new(shape_of_rank::<2>([10, 20]));
        a.fill(7);
        let mut b: Array<i32, 2> = Array::new(shape([Dim::new_unresolved(1, 9), Dim::new_unresolved(1, 19)]));
        assert!(copy(&a, &mut b).is_ok());
        assert_eq!(*b.get([1, 1]), 7);
    }

    #[test]
    fn copy_rejects_a_destination_index_outside_the_source_domain() {
        // Shifting b_shape one step further (min 2 instead of 1) pushes its
        // max index to 10, outside a's domain of 0..9 — out_of_range.
        use crate::dim::Dim;
        let a: Array<i32, 2> = Array::new(shape_of_rank::<2>([10, 20]));
        let mut b: Array<i32, 2> = Array::new(shape([Dim::new_unresolved(2, 9), Dim::new_unresolved(1, 19)]));
        assert!(copy(&a, &mut b).is_err());
    }

    #[test]
    fn move_into_empties_the_source() {
        let mut src_data: Array<i32, 1> = Array::new(shape([dim_of_extent(3)]));
        src_data.fill(4);
        let mut dst: Array<i32, 1> = Array::new(shape([dim_of_extent(3)]));
        move_into(&mut src_data, &mut dst).unwrap();
        assert_eq!(*dst.get([0]), 4);
        assert_eq!(src_data.shape().size(), 0);
    }

    #[test]
    fn equal_detects_differing_elements() {
        let mut a: Array<i32, 1> = Array::new(shape([dim_of_extent(3)]));
        let mut b: Array<i32, 1> = Array::new(shape([dim_of_extent(3)]));
        a.fill(1);
        b.fill(1);
        assert!(equal(&a.view(), &b.view()));
        b.set([1], 2);
        assert!(!equal(&a.view(), &b.view()));
    }

    #[test]
    fn clear_empties_the_array() {
        let mut a: Array<i32, 1> = Array::new(shape([dim_of_extent(4)]));
        a.clear();
        assert_eq!(a.shape().size(), 0);
    }

    #[test]
    fn reinterpret_reads_back_the_same_bits_under_a_different_type() {
        let mut a: Array<i32, 1> = Array::new(shape([dim_of_extent(1)]));
        // 0x40000000 is the IEEE-754 single-precision bit pattern for 2.0.
        a.set([0], 0x4000_0000);
        let view = a.reinterpret::<f32>().unwrap();
        assert_eq!(*view.get([0]), 2.0f32);
    }

    #[test]
    fn reinterpret_rejects_a_size_mismatch() {
        let a: Array<i32, 1> = Array::new(shape([dim_of_extent(1)]));
        let err = a.reinterpret::<i64>().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::IncompatibleLayout);
    }

    // §8.2's counting-constructor scenario: a custom element type that
    // counts its own constructions and destructions, checked against a
    // sparse shape's `size()` rather than its `flat_extent()`.
    thread_local! {
        static CONSTRUCTS: Cell<usize> = Cell::new(0);
        static DESTRUCTS: Cell<usize> = Cell::new(0);
    }

    fn reset_counts() {
        CONSTRUCTS.with(|c| c.set(0));
        DESTRUCTS.with(|c| c.set(0));
    }

    #[derive(Clone)]
    struct Counted(#[allow(dead_code)] i32);

    impl Default for Counted {
        fn default() -> Self {
            CONSTRUCTS.with(|c| c.set(c.get() + 1));
            Counted(0)
        }
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            DESTRUCTS.with(|c| c.set(c.get() + 1));
        }
    }

    #[test]
    fn default_construct_touches_exactly_size_elements_for_a_sparse_shape() {
        use crate::dim::dim;
        reset_counts();
        let a: Array<Counted, 2> = Array::new(shape([dim(0, 5, 21), dim(0, 4, 1)]));
        assert_eq!(a.shape().size(), 20);
        assert_eq!(a.shape().flat_extent(), 88);
        assert_eq!(CONSTRUCTS.with(Cell::get), 20);
    }

    #[test]
    fn clear_destroys_exactly_size_elements_for_a_sparse_shape() {
        use crate::dim::dim;
        let mut a: Array<Counted, 2> = Array::new(shape([dim(0, 5, 21), dim(0, 4, 1)]));
        reset_counts();
        a.clear();
        assert_eq!(DESTRUCTS.with(Cell::get), 20);
    }
}
