// Copyright 2024 ndshape developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors related to shape and offset computation.
//!
//! The error type here is deliberately small and allocation-free, in the
//! same spirit as `rust-ndarray`'s `ShapeError`: shapes are fixed-rank, so
//! the offending shapes can be copied into a small stack array instead of
//! going through the heap.

use std::error::Error;
use std::fmt;

/// Maximum rank for which `ShapeError` can carry the full offending shapes
/// in its `Display`/`Debug` output. Above this the shapes are simply elided.
const MAX_DISPLAYED_RANK: usize = 8;

/// Error code for an error related to shape, stride, or layout.
///
/// This enumeration is not exhaustive — new kinds may be added as the crate
/// grows without that being a breaking change.
#[non_exhaustive]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// `copy`/`move_into` where the destination addresses an index the
    /// source shape does not cover.
    OutOfRange,
    /// `convert_shape` where a statically-fixed field disagrees with the
    /// runtime value being converted.
    IncompatibleShape,
    /// a shape does not have the memory layout an operation requires
    /// (e.g. `reinterpret::<U>` where `U` isn't the same size as `T`).
    IncompatibleLayout,
    /// `size()` or an offset computation would overflow `isize`.
    Overflow,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            ErrorKind::OutOfRange => "index out of range",
            ErrorKind::IncompatibleShape => "incompatible shape",
            ErrorKind::IncompatibleLayout => "incompatible memory layout",
            ErrorKind::Overflow => "arithmetic overflow computing shape",
        };
        f.write_str(description)
    }
}

/// An error produced while building, resolving, or indexing a shape.
///
/// Carries the [`ErrorKind`] plus (when it fits in [`MAX_DISPLAYED_RANK`]
/// entries) the expected/actual extents so `Display` can show a useful
/// message without allocating.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeError {
    kind: ErrorKind,
    expected: Option<[isize; MAX_DISPLAYED_RANK]>,
    expected_len: usize,
    actual: Option<[isize; MAX_DISPLAYED_RANK]>,
    actual_len: usize,
}

impl ShapeError {
    /// Returns the [`ErrorKind`] of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Creates a `ShapeError` carrying no extra shape information.
    pub fn from_kind(kind: ErrorKind) -> Self {
        ShapeError { kind, expected: None, expected_len: 0, actual: None, actual_len: 0 }
    }

    pub(crate) fn out_of_range(expected: &[isize], actual: &[isize]) -> Self {
        Self::with_shapes(ErrorKind::OutOfRange, expected, actual)
    }

    pub(crate) fn incompatible_shape(expected: &[isize], actual: &[isize]) -> Self {
        Self::with_shapes(ErrorKind::IncompatibleShape, expected, actual)
    }

    pub(crate) fn incompatible_layout() -> Self {
        Self::from_kind(ErrorKind::IncompatibleLayout)
    }

    pub(crate) fn overflow() -> Self {
        Self::from_kind(ErrorKind::Overflow)
    }

    fn with_shapes(kind: ErrorKind, expected: &[isize], actual: &[isize]) -> Self {
        let mut err = Self::from_kind(kind);
        if expected.len() <= MAX_DISPLAYED_RANK {
            let mut buf = [0isize; MAX_DISPLAYED_RANK];
            buf[..expected.len()].copy_from_slice(expected);
            err.expected = Some(buf);
            err.expected_len = expected.len();
        }
        if actual.len() <= MAX_DISPLAYED_RANK {
            let mut buf = [0isize; MAX_DISPLAYED_RANK];
            buf[..actual.len()].copy_from_slice(actual);
            err.actual = Some(buf);
            err.actual_len = actual.len();
        }
        err
    }
}

impl Error for ShapeError {}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(expected) = &self.expected {
            write!(f, "; expected: {:?}", &expected[..self.expected_len])?;
        }
        if let Some(actual) = &self.actual {
            write!(f, ", got: {:?}", &actual[..self.actual_len])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_has_no_extra_info_by_default() {
        let err = ShapeError::from_kind(ErrorKind::Overflow);
        assert_eq!(err.to_string(), "arithmetic overflow computing shape");
    }

    #[test]
    fn display_includes_shapes_when_small_enough() {
        let err = ShapeError::out_of_range(&[10, 20], &[11, 20]);
        assert_eq!(
            err.to_string(),
            "index out of range; expected: [10, 20], got: [11, 20]"
        );
    }

    #[test]
    fn display_elides_oversized_shapes() {
        let big = [0isize; MAX_DISPLAYED_RANK + 1];
        let err = ShapeError::incompatible_shape(&big, &[1]);
        assert_eq!(err.to_string(), "incompatible shape, got: [1]");
    }
}
