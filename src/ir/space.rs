//! Coordinate space marker types.
//!
//! Box payloads carry no unit tag in the annotation text, so the space a box
//! lives in is tracked with zero-sized type parameters instead.

use std::fmt;

/// Marker type for pixel coordinates in the original image.
///
/// Values lie in `[0, max(height, width))` after restoration; the lower bound
/// is enforced by clamping, the upper bound is not.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker type for the fixed square grid `[0, scale)` used in annotation text.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {} // This is unreachable since Pixel has no variants
    }
}

impl fmt::Debug for Normalized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {} // This is unreachable since Normalized has no variants
    }
}
