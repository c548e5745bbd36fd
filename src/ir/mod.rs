//! Data model for groundkit.
//!
//! Two record shapes flow through the pipeline: the [`RawConversationRecord`]
//! authored by annotators and the [`UnifiedRecord`] consumed by the trainer.
//! Boxes are typed by coordinate space so that normalized grid coordinates and
//! restored pixel coordinates cannot be mixed by accident.
//!
//! # Example
//!
//! ```
//! use groundkit::ir::{to_pixel_space, BBox, BoxScale, ImageFrame, Normalized};
//!
//! let frame = ImageFrame::new(100, 200).unwrap();
//! let normalized = BBox::<Normalized>::from_xyxy(400, 400, 600, 600);
//! let pixel = to_pixel_space(&normalized, frame, BoxScale::default());
//! assert_eq!(pixel.to_array(), [80, 30, 120, 70]);
//! ```

mod bbox;
mod frame;
pub mod io_json;
mod model;
mod space;

// Re-export core types for convenient access
pub use bbox::BBox;
pub use frame::{
    scale_to_longer_side, to_normalized_space, to_pixel_space, BoxScale, ImageFrame,
    LetterboxOffset, DEFAULT_BOX_SCALE,
};
pub use model::{BoxType, RawConversationRecord, Role, TargetObject, Turn, UnifiedRecord};
pub use space::{Normalized, Pixel};
