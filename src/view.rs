// Copyright 2024 ndshape developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Non-owning views into existing storage (§3.3): a pointer plus a
//! [`Shape`] describing how to walk it.
//!
//! Grounded on `rust-ndarray`'s `ArrayBase`/`RawArrayView`
//! (`src/lib.rs`, `src/impl_raw_views.rs`), which also pairs a raw
//! pointer with a dimension+strides pair and lets the dimension type decide
//! in-bounds checks. `ArrayView` here does the same but delegates entirely
//! to `Shape` for bounds and offset logic instead of duplicating it, since
//! `Shape` already owns that responsibility.

use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::error::ShapeError;
use crate::shape::{Shape, ShapeStatic};
use crate::slice::{view_with as slice_view_with, IndexSpec};

/// A read/write view of borrowed storage: a base pointer plus a shape.
///
/// `ArrayView` never allocates or frees; its lifetime bound `'a` ties it to
/// the storage it points into. Mutation through `&self` methods like
/// [`ArrayView::set`] mirrors `rust-ndarray`'s `ArrayViewMut` — this type
/// does not distinguish the two, since §3.3 does not ask for the
/// `&`/`&mut` split `rust-ndarray` makes for borrow-checker reasons that
/// don't apply to a raw-pointer-backed view.
pub struct ArrayView<'a, T, const RANK: usize, K: ShapeStatic<RANK> = crate::shape::AllDynamic<RANK>> {
    ptr: NonNull<T>,
    shape: Shape<RANK, K>,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T, const RANK: usize, K: ShapeStatic<RANK>> ArrayView<'a, T, RANK, K> {
    /// Builds a view over `base`, offset 0, per `shape`.
    ///
    /// # Safety
    ///
    /// `base` must be valid for reads and writes at every offset `shape`
    /// can produce, for the lifetime `'a`.
    pub unsafe fn from_raw_parts(base: NonNull<T>, shape: Shape<RANK, K>) -> Self {
        ArrayView { ptr: base, shape, _marker: PhantomData }
    }

    /// The shape this view walks.
    pub fn shape(&self) -> &Shape<RANK, K> {
        &self.shape
    }

    /// Reads the element at `idx`.
    ///
    /// # Panics
    ///
    /// Panics (in debug builds; see the `unchecked` feature) if `idx` is
    /// out of range.
    pub fn get(&self, idx: [isize; RANK]) -> &T {
        #[cfg(not(feature = "unchecked"))]
        debug_assert!(self.shape.is_in_range(idx), "ArrayView::get: index out of range");
        let offset = self.shape.offset(idx);
        unsafe { &*self.ptr.as_ptr().offset(offset) }
    }

    /// Writes `value` at `idx`.
    ///
    /// # Panics
    ///
    /// Panics (in debug builds; see the `unchecked` feature) if `idx` is
    /// out of range.
    pub fn set(&mut self, idx: [isize; RANK], value: T) {
        #[cfg(not(feature = "unchecked"))]
        debug_assert!(self.shape.is_in_range(idx), "ArrayView::set: index out of range");
        let offset = self.shape.offset(idx);
        unsafe { *self.ptr.as_ptr().offset(offset) = value };
    }

    /// Checked element read; returns an error instead of panicking when
    /// `idx` is out of range (used when the `unchecked` feature is off and
    /// callers want the checked path explicitly rather than via a panic).
    pub fn try_get(&self, idx: [isize; RANK]) -> Result<&T, ShapeError> {
        let offset = self.shape.checked_offset(idx)?;
        Ok(unsafe { &*self.ptr.as_ptr().offset(offset) })
    }

    /// Builds a cropped/axis-dropped sub-view, per §4.8.
    pub fn view_with<const M: usize>(&self, specs: [IndexSpec; RANK]) -> Result<ArrayView<'a, T, M>, ShapeError> {
        let (sub_shape, offset) = slice_view_with(&self.shape, specs)?;
        let base = unsafe { NonNull::new_unchecked(self.ptr.as_ptr().offset(offset)) };
        Ok(unsafe { ArrayView::from_raw_parts(base, sub_shape) })
    }

    /// Re-tags this view under a different static tag `K2` of the same
    /// rank, per §4.2 (fails if the runtime shape disagrees with anything
    /// `K2` fixes). Same element type, same storage — only the compile-time
    /// description of the shape changes.
    pub fn retag<K2: ShapeStatic<RANK>>(&self) -> Result<ArrayView<'a, T, RANK, K2>, ShapeError> {
        let shape = self.shape.convert_shape::<RANK, K2>()?;
        Ok(unsafe { ArrayView::from_raw_parts(self.ptr, shape) })
    }

    /// Reinterprets this view's storage as holding `U` instead of `T`, per
    /// §4.8 — the same bytes, addressed by the same shape, read back under a
    /// different element type (e.g. viewing an `i32` array's bit patterns as
    /// `f32`). Fails if `U` and `T` aren't the same size; alignment is the
    /// caller's responsibility, same as a raw pointer cast.
    pub fn reinterpret<U>(&self) -> Result<ArrayView<'a, U, RANK, K>, ShapeError> {
        if std::mem::size_of::<U>() != std::mem::size_of::<T>() {
            return Err(ShapeError::incompatible_layout());
        }
        let ptr = unsafe { NonNull::new_unchecked(self.ptr.as_ptr() as *mut U) };
        Ok(unsafe { ArrayView::from_raw_parts(ptr, self.shape) })
    }
}

impl<'a, T, const RANK: usize, K: ShapeStatic<RANK>> Copy for ArrayView<'a, T, RANK, K> {}
impl<'a, T, const RANK: usize, K: ShapeStatic<RANK>> Clone for ArrayView<'a, T, RANK, K> {
    fn clone(&self) -> Self {
        *self
    }
}
