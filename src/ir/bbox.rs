//! Integer bounding boxes in `[x1, y1, x2, y2]` order.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// An axis-aligned bounding box with integer corners `[x1, y1, x2, y2]`.
///
/// The `TSpace` parameter is either [`Pixel`](super::Pixel) or
/// [`Normalized`](super::Normalized). Ordering (`x1 <= x2`) is not enforced;
/// annotation text is taken as authored.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BBox<TSpace> {
    coords: [i64; 4],
    _space: PhantomData<TSpace>,
}

impl<TSpace> BBox<TSpace> {
    /// Creates a box from explicit corner coordinates.
    #[inline]
    pub fn from_xyxy(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self::from_array([x1, y1, x2, y2])
    }

    /// Creates a box from a raw `[x1, y1, x2, y2]` array.
    #[inline]
    pub fn from_array(coords: [i64; 4]) -> Self {
        Self {
            coords,
            _space: PhantomData,
        }
    }

    /// Returns the raw `[x1, y1, x2, y2]` array.
    #[inline]
    pub fn to_array(&self) -> [i64; 4] {
        self.coords
    }

    #[inline]
    pub fn x1(&self) -> i64 {
        self.coords[0]
    }

    #[inline]
    pub fn y1(&self) -> i64 {
        self.coords[1]
    }

    #[inline]
    pub fn x2(&self) -> i64 {
        self.coords[2]
    }

    #[inline]
    pub fn y2(&self) -> i64 {
        self.coords[3]
    }

    /// Returns true if the box is properly ordered (x1 <= x2 and y1 <= y2).
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.x1() <= self.x2() && self.y1() <= self.y2()
    }

    /// Applies `f` to every coordinate, keeping the space unchanged.
    pub(crate) fn map(&self, mut f: impl FnMut(usize, i64) -> i64) -> Self {
        let mut coords = self.coords;
        for (i, c) in coords.iter_mut().enumerate() {
            *c = f(i, *c);
        }
        Self::from_array(coords)
    }

    /// Reinterprets the coordinates in another space.
    ///
    /// Only the coordinate transform in [`super::frame`] should need this.
    pub(crate) fn cast<TOther>(&self) -> BBox<TOther> {
        BBox::from_array(self.coords)
    }
}

impl<TSpace> std::fmt::Debug for BBox<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BBox").field(&self.coords).finish()
    }
}

impl<TSpace> From<[i64; 4]> for BBox<TSpace> {
    fn from(coords: [i64; 4]) -> Self {
        Self::from_array(coords)
    }
}

// Custom serde implementation to avoid TSpace: Serialize/Deserialize bounds
impl<TSpace> Serialize for BBox<TSpace> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.coords.serialize(serializer)
    }
}

impl<'de, TSpace> Deserialize<'de> for BBox<TSpace> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let coords = <[i64; 4]>::deserialize(deserializer)?;
        Ok(BBox::from_array(coords))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Normalized, Pixel};

    #[test]
    fn test_bbox_accessors() {
        let bbox: BBox<Pixel> = BBox::from_xyxy(10, 20, 100, 80);
        assert_eq!(bbox.x1(), 10);
        assert_eq!(bbox.y1(), 20);
        assert_eq!(bbox.x2(), 100);
        assert_eq!(bbox.y2(), 80);
        assert_eq!(bbox.to_array(), [10, 20, 100, 80]);
    }

    #[test]
    fn test_bbox_ordering() {
        let ordered: BBox<Normalized> = BBox::from_xyxy(10, 20, 100, 80);
        assert!(ordered.is_ordered());

        let unordered: BBox<Normalized> = BBox::from_xyxy(100, 80, 10, 20);
        assert!(!unordered.is_ordered());
    }

    #[test]
    fn test_bbox_serializes_as_bare_array() {
        let bbox: BBox<Pixel> = BBox::from_xyxy(1, 2, 3, 4);
        assert_eq!(serde_json::to_string(&bbox).unwrap(), "[1,2,3,4]");

        let back: BBox<Pixel> = serde_json::from_str("[5, 6, 7, 8]").unwrap();
        assert_eq!(back, BBox::from_xyxy(5, 6, 7, 8));
    }

    #[test]
    fn test_bbox_rejects_wrong_arity() {
        assert!(serde_json::from_str::<BBox<Pixel>>("[1,2,3]").is_err());
        assert!(serde_json::from_str::<BBox<Pixel>>("[1,2,3,4,5]").is_err());
    }
}
