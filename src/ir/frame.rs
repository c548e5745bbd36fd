//! Mapping boxes between the normalized square grid and image pixels.
//!
//! Annotation text stores boxes on a fixed `[0, scale)` square grid that was
//! built against the image's longer side, with the shorter side centered by
//! letterbox padding. Restoring pixel coordinates therefore scales by the
//! longer side and then removes half the padding from the padded axis.
//!
//! All arithmetic is integer and truncates toward zero, so a round trip is
//! only exact to within one unit per coordinate (for images whose longer side
//! does not exceed the scale).

use super::bbox::BBox;
use super::space::{Normalized, Pixel};
use crate::error::GroundkitError;

/// Default upper bound of the normalized coordinate grid.
pub const DEFAULT_BOX_SCALE: u32 = 999;

/// Upper bound of the normalized square grid (coordinates lie in `[0, scale)`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoxScale(u32);

impl BoxScale {
    /// Creates a scale, rejecting zero.
    pub fn new(scale: u32) -> Result<Self, GroundkitError> {
        if scale == 0 {
            return Err(GroundkitError::InvalidBoxScale);
        }
        Ok(Self(scale))
    }

    /// Returns the underlying value.
    #[inline]
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for BoxScale {
    fn default() -> Self {
        Self(DEFAULT_BOX_SCALE)
    }
}

/// Height and width of the original image, in pixels.
///
/// Both dimensions are guaranteed non-zero, which keeps the per-axis division
/// in [`to_normalized_space`] well defined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageFrame {
    height: u32,
    width: u32,
}

impl ImageFrame {
    /// Creates a frame, rejecting zero-sized images.
    pub fn new(height: u32, width: u32) -> Result<Self, GroundkitError> {
        if height == 0 || width == 0 {
            return Err(GroundkitError::InvalidImageDimensions { height, width });
        }
        Ok(Self { height, width })
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The longer side, which the normalized grid was built against.
    #[inline]
    pub fn longer_side(&self) -> u32 {
        self.height.max(self.width)
    }

    /// Returns the letterbox padding removed during restoration.
    pub fn letterbox_offset(&self) -> LetterboxOffset {
        use std::cmp::Ordering;

        match self.height.cmp(&self.width) {
            Ordering::Equal => LetterboxOffset::None,
            Ordering::Less => LetterboxOffset::Vertical(i64::from((self.width - self.height) / 2)),
            Ordering::Greater => {
                LetterboxOffset::Horizontal(i64::from((self.height - self.width) / 2))
            }
        }
    }
}

/// Which axis was padded when the image was squared, and by how much.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LetterboxOffset {
    /// Square image, no padding.
    None,
    /// Wide image (`height < width`): top/bottom padding, applies to y.
    Vertical(i64),
    /// Tall image (`height > width`): left/right padding, applies to x.
    Horizontal(i64),
}

impl LetterboxOffset {
    /// Offset to subtract from coordinate index `i` (0..4 in xyxy order).
    #[inline]
    fn for_index(&self, i: usize) -> i64 {
        let is_y = i % 2 == 1;
        match *self {
            LetterboxOffset::None => 0,
            LetterboxOffset::Vertical(delta) if is_y => delta,
            LetterboxOffset::Horizontal(delta) if !is_y => delta,
            _ => 0,
        }
    }
}

/// Scales a normalized box onto the longer side without letterbox correction.
///
/// This is the first half of [`to_pixel_space`], exposed for diagnostics.
pub fn scale_to_longer_side(
    bbox: &BBox<Normalized>,
    frame: ImageFrame,
    scale: BoxScale,
) -> BBox<Pixel> {
    let longer = i64::from(frame.longer_side());
    let scale = i64::from(scale.get());
    bbox.map(|_, c| c.saturating_mul(longer) / scale).cast()
}

/// Restores a normalized box to pixel coordinates of the original image.
///
/// Coordinates are scaled by `longer_side / scale`, the letterbox offset is
/// subtracted from the padded axis, and every coordinate is clamped to `>= 0`.
/// There is no upper clamp: extreme inputs may land past the image edge.
pub fn to_pixel_space(bbox: &BBox<Normalized>, frame: ImageFrame, scale: BoxScale) -> BBox<Pixel> {
    let offset = frame.letterbox_offset();
    scale_to_longer_side(bbox, frame, scale)
        .map(|i, c| c.saturating_sub(offset.for_index(i)).max(0))
}

/// Normalizes a pixel box per axis (x by width, y by height) onto the grid.
///
/// Letterbox padding is not re-applied here, so this is not the exact inverse
/// of [`to_pixel_space`] for non-square images.
pub fn to_normalized_space(
    bbox: &BBox<Pixel>,
    frame: ImageFrame,
    scale: BoxScale,
) -> BBox<Normalized> {
    let scale = i64::from(scale.get());
    let width = i64::from(frame.width());
    let height = i64::from(frame.height());
    bbox.map(|i, c| {
        let dim = if i % 2 == 0 { width } else { height };
        c.saturating_mul(scale) / dim
    })
    .cast()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(height: u32, width: u32) -> ImageFrame {
        ImageFrame::new(height, width).expect("valid frame")
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(matches!(
            ImageFrame::new(0, 10),
            Err(GroundkitError::InvalidImageDimensions { height: 0, width: 10 })
        ));
        assert!(ImageFrame::new(10, 0).is_err());
        assert!(BoxScale::new(0).is_err());
        assert_eq!(BoxScale::default().get(), 999);
    }

    #[test]
    fn square_image_has_no_offset() {
        let f = frame(999, 999);
        assert_eq!(f.letterbox_offset(), LetterboxOffset::None);

        let b = BBox::<Normalized>::from_xyxy(10, 20, 300, 400);
        let px = to_pixel_space(&b, f, BoxScale::default());
        assert_eq!(px.to_array(), [10, 20, 300, 400]);
    }

    #[test]
    fn wide_image_shifts_y() {
        // height 100, width 200: padded top/bottom by 50
        let f = frame(100, 200);
        assert_eq!(f.letterbox_offset(), LetterboxOffset::Vertical(50));

        let b = BBox::<Normalized>::from_xyxy(400, 400, 600, 600);
        let unshifted = scale_to_longer_side(&b, f, BoxScale::default());
        let px = to_pixel_space(&b, f, BoxScale::default());

        assert_eq!(px.x1(), unshifted.x1());
        assert_eq!(px.x2(), unshifted.x2());
        assert_eq!(unshifted.y1() - px.y1(), 50);
        assert_eq!(unshifted.y2() - px.y2(), 50);
    }

    #[test]
    fn tall_image_shifts_x() {
        let f = frame(301, 100);
        assert_eq!(f.letterbox_offset(), LetterboxOffset::Horizontal(100));

        let b = BBox::<Normalized>::from_xyxy(500, 500, 999, 999);
        let px = to_pixel_space(&b, f, BoxScale::default());
        // 500 * 301 / 999 = 150, minus 100
        assert_eq!(px.to_array(), [50, 150, 201, 301]);
    }

    #[test]
    fn negative_results_clamp_to_zero() {
        let f = frame(100, 200);
        let b = BBox::<Normalized>::from_xyxy(0, 0, 100, 100);
        let px = to_pixel_space(&b, f, BoxScale::default());
        // y: 0 - 50 and 20 - 50 both clamp
        assert_eq!(px.to_array(), [0, 0, 20, 0]);
    }

    #[test]
    fn huge_coordinates_saturate() {
        let f = frame(100, 200);
        let b = BBox::<Normalized>::from_xyxy(i64::MAX, i64::MIN, 0, 0);
        let px = to_pixel_space(&b, f, BoxScale::default());
        assert_eq!(px.x1(), i64::MAX / 999);
        assert_eq!(px.y1(), 0);
    }

    #[test]
    fn normalization_divides_per_axis() {
        let f = frame(100, 200);
        let b = BBox::<Pixel>::from_xyxy(100, 50, 200, 100);
        let n = to_normalized_space(&b, f, BoxScale::default());
        assert_eq!(n.to_array(), [499, 499, 999, 999]);
    }

    #[test]
    fn square_round_trip_is_within_one_unit() {
        let f = frame(640, 640);
        let scale = BoxScale::default();
        let original = BBox::<Pixel>::from_xyxy(13, 77, 401, 639);
        let back = to_pixel_space(&to_normalized_space(&original, f, scale), f, scale);
        for (a, b) in original.to_array().iter().zip(back.to_array()) {
            assert!((a - b).abs() <= 1, "{:?} vs {:?}", original, back);
        }
    }
}
