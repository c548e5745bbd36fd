//! Raw conversation records and the unified training-record schema.
//!
//! Raw records are what annotators author: one image, its dimensions, and an
//! ordered list of question/answer turns. Unified records are what the
//! trainer consumes; every raw input shape converges onto this one type.

use serde::{Deserialize, Serialize};

use super::bbox::BBox;
use super::frame::ImageFrame;
use super::space::Pixel;
use crate::error::GroundkitError;

/// One annotated sample as authored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawConversationRecord {
    /// Image identifier or path, as written by the annotator.
    pub image: String,

    /// Image height in pixels.
    #[serde(default)]
    pub height: u32,

    /// Image width in pixels.
    #[serde(default)]
    pub width: u32,

    /// Alternating question/answer turns.
    pub conversations: Vec<Turn>,
}

impl RawConversationRecord {
    /// Creates a record with no turns.
    pub fn new(image: impl Into<String>, height: u32, width: u32) -> Self {
        Self {
            image: image.into(),
            height,
            width,
            conversations: Vec::new(),
        }
    }

    /// Appends a turn.
    pub fn with_turn(mut self, from: Role, value: impl Into<String>) -> Self {
        self.conversations.push(Turn::new(from, value));
        self
    }

    /// Returns the validated image frame for coordinate restoration.
    pub fn frame(&self) -> Result<ImageFrame, GroundkitError> {
        ImageFrame::new(self.height, self.width)
    }

    /// Iterates positional (question, answer) pairs.
    ///
    /// An unmatched trailing turn is ignored.
    pub fn qa_pairs(&self) -> impl Iterator<Item = (&Turn, &Turn)> {
        self.conversations
            .chunks_exact(2)
            .map(|pair| (&pair[0], &pair[1]))
    }

    /// Returns the first (question, answer) pair, if the record has one.
    pub fn first_pair(&self) -> Option<(&Turn, &Turn)> {
        self.qa_pairs().next()
    }
}

/// A single utterance in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who is speaking.
    pub from: Role,

    /// Free text, possibly carrying inline `<ref>`/`<box>`/`<pred>` spans.
    pub value: String,
}

impl Turn {
    pub fn new(from: Role, value: impl Into<String>) -> Self {
        Self {
            from,
            value: value.into(),
        }
    }
}

/// Speaker role of a turn.
///
/// Annotation files spell the assistant as `gpt`; `assistant` is accepted too.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "human", alias = "user")]
    Human,
    #[serde(rename = "gpt", alias = "assistant")]
    Assistant,
}

/// The output record consumed by the trainer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnifiedRecord {
    pub query: String,

    pub response: String,

    /// Image paths; records produced here always carry exactly one.
    pub images: Vec<String>,

    /// Present only for grounding records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<TargetObject>>,
}

impl UnifiedRecord {
    /// Creates a plain QA record for a single image.
    pub fn qa(
        query: impl Into<String>,
        response: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
            images: vec![image.into()],
            objects: None,
        }
    }

    /// Creates a grounding record for a single image.
    pub fn grounding(
        query: impl Into<String>,
        response: impl Into<String>,
        image: impl Into<String>,
        objects: Vec<TargetObject>,
    ) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
            images: vec![image.into()],
            objects: Some(objects),
        }
    }

    /// Returns true if this record carries target objects.
    pub fn is_grounding(&self) -> bool {
        self.objects.is_some()
    }
}

/// One referenced target in a grounding record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetObject {
    /// The reference key, e.g. `cat`.
    pub caption: String,

    /// Pixel-space boxes in the order they appeared in the answer text.
    pub bbox: Vec<BBox<Pixel>>,

    pub bbox_type: BoxType,

    /// Index into [`UnifiedRecord::images`].
    pub image: usize,
}

impl TargetObject {
    /// Creates a target on the first (and only) image of a record.
    pub fn new(caption: impl Into<String>, bbox: Vec<BBox<Pixel>>) -> Self {
        Self {
            caption: caption.into(),
            bbox,
            bbox_type: BoxType::Real,
            image: 0,
        }
    }
}

/// Box representation tag expected by the trainer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxType {
    /// Absolute pixel coordinates.
    #[default]
    Real,
}
