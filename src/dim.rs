// Copyright 2024 ndshape developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Single-dimension descriptors: `min`, `extent`, `stride`, each either
//! fixed at compile time or bound at runtime.
//!
//! Grounded on `rust-ndarray`'s `Dim<I>` (`src/dimension/dim.rs`), but where
//! that `Dim` is a plain runtime index tuple, this crate's `Dim`
//! additionally carries a zero-sized tag type (`S: DimStatic`) that pins
//! zero or more of its three fields at compile time. The tag is read at
//! construction time to validate the runtime value and is otherwise
//! side-channel information for `Shape` — see the "static/dynamic
//! unification" design note.

use std::fmt;
use std::marker::PhantomData;

/// Sentinel runtime value meaning "this field is dynamic / unresolved".
///
/// Chosen as the minimum signed value, exactly as spec.md §3.1 prescribes
/// ("some reserved extremal integer, e.g. the minimum signed value of the
/// index type").
pub const DYNAMIC: isize = isize::MIN;

/// Compile-time information about a [`Dim`]'s three fields.
///
/// Implement this on a zero-sized marker type to describe a dimension whose
/// `min`, `extent`, and/or `stride` are known at compile time. Any constant
/// left at [`DYNAMIC`] (the default) means that field is only known at
/// runtime. `BROADCAST` additionally marks a dimension as a broadcast
/// dimension (§4.1): its stride never contributes to an offset and its
/// range check always succeeds.
pub trait DimStatic: Copy + Clone + fmt::Debug + Default + 'static {
    /// Compile-time `min`, or [`DYNAMIC`].
    const MIN: isize = DYNAMIC;
    /// Compile-time `extent`, or [`DYNAMIC`].
    const EXTENT: isize = DYNAMIC;
    /// Compile-time `stride`, or [`DYNAMIC`].
    const STRIDE: isize = DYNAMIC;
    /// Whether this is a broadcast dimension.
    const BROADCAST: bool = false;
}

/// Fully dynamic dimension: all three fields are runtime-only.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Dynamic;
impl DimStatic for Dynamic {}

/// A dimension whose stride is statically fixed to 1.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DenseStatic;
impl DimStatic for DenseStatic {
    const STRIDE: isize = 1;
}

/// A dimension whose stride is statically fixed to 0 and whose extent is
/// unbounded; see [`Dim::is_in_range`] and §4.1.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastStatic;
impl DimStatic for BroadcastStatic {
    const STRIDE: isize = 0;
    const BROADCAST: bool = true;
}

/// A single-dimension descriptor: `min`, `extent`, `stride`.
///
/// `S` pins zero or more fields at compile time (see [`DimStatic`]); the
/// default, [`Dynamic`], pins none of them. `min`/`extent`/`stride` are
/// always readable as runtime `isize` values regardless of `S` — the
/// compile-time information is only used to validate construction and to
/// let `Shape` fast-path statically-known fields.
#[derive(Copy, Clone)]
pub struct Dim<S: DimStatic = Dynamic> {
    min: isize,
    extent: isize,
    stride: isize,
    _static: PhantomData<S>,
}

impl<S: DimStatic> Dim<S> {
    /// Builds a `Dim` with all three fields specified, asserting they agree
    /// with whatever `S` pins statically.
    ///
    /// # Panics
    ///
    /// Panics if a statically-fixed field of `S` disagrees with the runtime
    /// value supplied (a programming error per §3.2's invariants).
    pub fn new(min: isize, extent: isize, stride: isize) -> Self {
        assert!(
            compatible_scalar(S::MIN, min),
            "Dim::new: static min {} incompatible with runtime min {}",
            S::MIN,
            min
        );
        assert!(
            compatible_scalar(S::EXTENT, extent),
            "Dim::new: static extent {} incompatible with runtime extent {}",
            S::EXTENT,
            extent
        );
        assert!(
            compatible_scalar(S::STRIDE, stride),
            "Dim::new: static stride {} incompatible with runtime stride {}",
            S::STRIDE,
            stride
        );
        Dim { min, extent, stride, _static: PhantomData }
    }

    /// Builds a `Dim` whose stride is left unresolved (see [`crate::shape::resolve`]).
    ///
    /// Only valid when `S::STRIDE` is [`DYNAMIC`]; panics otherwise, since a
    /// statically dense or broadcast dim's stride can never be "unresolved".
    pub fn new_unresolved(min: isize, extent: isize) -> Self {
        assert!(
            S::STRIDE == DYNAMIC,
            "Dim::new_unresolved: S fixes stride statically, nothing to resolve"
        );
        Dim { min, extent, stride: DYNAMIC, _static: PhantomData }
    }

    /// `min`, the lowest valid index.
    #[inline]
    pub fn min(&self) -> isize {
        self.min
    }

    /// `extent`, the number of valid indices.
    #[inline]
    pub fn extent(&self) -> isize {
        self.extent
    }

    /// The per-index linear offset increment.
    #[inline]
    pub fn stride(&self) -> isize {
        self.stride
    }

    /// Whether this dimension's stride has not yet been assigned.
    #[inline]
    pub fn is_stride_unresolved(&self) -> bool {
        self.stride == DYNAMIC
    }

    /// `max = min + extent - 1`, the highest valid index.
    #[inline]
    pub fn max(&self) -> isize {
        self.min + self.extent - 1
    }

    /// `true` iff `S` marks this a broadcast dimension.
    #[inline]
    pub fn is_broadcast(&self) -> bool {
        S::BROADCAST
    }

    /// The minimum offset reached over the index domain `[min, max]`.
    pub fn flat_min(&self) -> isize {
        if S::BROADCAST {
            return 0;
        }
        if self.stride >= 0 {
            self.stride * self.min
        } else {
            self.stride * self.max()
        }
    }

    /// The maximum offset reached over the index domain `[min, max]`.
    pub fn flat_max(&self) -> isize {
        if S::BROADCAST {
            return 0;
        }
        if self.stride >= 0 {
            self.stride * self.max()
        } else {
            self.stride * self.min
        }
    }

    /// `is_in_range(i) == min <= i <= max`, except a broadcast dimension is
    /// always in range (§4.1).
    #[inline]
    pub fn is_in_range(&self, i: isize) -> bool {
        S::BROADCAST || (self.min <= i && i <= self.max())
    }

    /// `is_in_range` over a whole interval: both endpoints must be in range.
    pub fn is_in_range_interval(&self, lo: isize, extent: isize) -> bool {
        if extent <= 0 {
            return true;
        }
        self.is_in_range(lo) && self.is_in_range(lo + extent - 1)
    }

    /// The linear-offset contribution of index `i`: `stride * i`, or 0 for
    /// a broadcast dimension.
    #[inline]
    pub fn offset(&self, i: isize) -> isize {
        if S::BROADCAST {
            0
        } else {
            self.stride * i
        }
    }

    /// `max(min(i, dim.max()), dim.min())` (§4.1).
    pub fn clamp(&self, i: isize) -> isize {
        i.min(self.max()).max(self.min)
    }

    /// Re-tags this `Dim` with a different static descriptor, checking the
    /// runtime fields are compatible with it. This is `convert_shape`'s
    /// per-dimension building block (§4.2).
    pub fn convert<T: DimStatic>(&self) -> Option<Dim<T>> {
        if compatible_scalar(T::MIN, self.min)
            && compatible_scalar(T::EXTENT, self.extent)
            && compatible_scalar(T::STRIDE, self.stride)
        {
            Some(Dim { min: self.min, extent: self.extent, stride: self.stride, _static: PhantomData })
        } else {
            None
        }
    }

    /// Drops the static tag, yielding a fully dynamic `Dim` with the same
    /// runtime fields.
    pub fn to_dynamic(&self) -> Dim<Dynamic> {
        Dim { min: self.min, extent: self.extent, stride: self.stride, _static: PhantomData }
    }

    /// Returns a copy with the stride replaced (used by `resolve`/`make_compact`).
    pub(crate) fn with_stride(&self, stride: isize) -> Self {
        Dim { stride, ..*self }
    }

    /// Returns a copy with `min` replaced (used by the shape optimizer's
    /// constant-folding of `extent == 1` dims).
    pub(crate) fn with_min(&self, min: isize) -> Self {
        Dim { min, ..*self }
    }
}

pub(crate) fn compatible_scalar(static_val: isize, runtime_val: isize) -> bool {
    static_val == DYNAMIC || static_val == runtime_val
}

/// Builds a `Dim(min, extent, stride)` — fully dynamic.
pub fn dim(min: isize, extent: isize, stride: isize) -> Dim<Dynamic> {
    Dim::new(min, extent, stride)
}

/// Builds a `Dim(extent)` = `Dim(0, extent, unresolved)` (§4.1).
pub fn dim_of_extent(extent: isize) -> Dim<Dynamic> {
    Dim::new_unresolved(0, extent)
}

/// Builds a dense dim (stride statically 1) with the given `min`/`extent`.
pub fn dense_dim(min: isize, extent: isize) -> Dim<DenseStatic> {
    Dim::new(min, extent, 1)
}

/// Builds a broadcast dim: stride statically 0, `is_in_range` always true.
/// `extent` is recorded for bookkeeping (e.g. display) but never bounds
/// `is_in_range`.
pub fn broadcast_dim(extent: isize) -> Dim<BroadcastStatic> {
    Dim::new(0, extent, 0)
}

impl<S: DimStatic> fmt::Debug for Dim<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dim")
            .field("min", &self.min)
            .field("extent", &self.extent)
            .field("stride", &self.stride)
            .finish()
    }
}

impl<S: DimStatic> Default for Dim<S> {
    fn default() -> Self {
        Dim::new(
            if S::MIN == DYNAMIC { 0 } else { S::MIN },
            if S::EXTENT == DYNAMIC { 0 } else { S::EXTENT },
            if S::STRIDE == DYNAMIC { 0 } else { S::STRIDE },
        )
    }
}

/// Dims compare by their runtime fields only — the static tag is
/// compile-time bookkeeping, not observable state.
impl<S: DimStatic, T: DimStatic> PartialEq<Dim<T>> for Dim<S> {
    fn eq(&self, other: &Dim<T>) -> bool {
        self.min == other.min && self.extent == other.extent && self.stride == other.stride
    }
}

impl<S: DimStatic> Eq for Dim<S> {}
