use std::path::PathBuf;
use thiserror::Error;

use crate::validation::{GroundingRejection, ValidationReport};

/// The main error type for groundkit operations.
#[derive(Debug, Error)]
pub enum GroundkitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read annotation file {path}: {source}")]
    AnnotationRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse annotation file {path}: {source}")]
    AnnotationParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed box payload '{payload}': {source}")]
    MalformedBoxPayload {
        payload: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Inconsistent grounding answer: {rejection}")]
    InconsistentGroundingAnswer { rejection: GroundingRejection },

    #[error("Invalid image dimensions {height}x{width} (must be positive)")]
    InvalidImageDimensions { height: u32, width: u32 },

    #[error("Record has no question/answer pair")]
    MissingAnswerTurn,

    #[error("First answer of a grounding record localizes no reference")]
    EmptyGroundingAnswer,

    #[error("Failed to write JSONL to {path}: {source}")]
    JsonlWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize report: {0}")]
    ReportSerialize(#[source] serde_json::Error),

    #[error("Invalid split ratio {ratio} (must be in the open interval (0, 1))")]
    InvalidSplitRatio { ratio: f64 },

    #[error("Invalid box scale (must be greater than 0)")]
    InvalidBoxScale,

    #[error("Invalid tag delimiters: {0}")]
    TagPattern(#[from] regex::Error),

    #[error("Invalid dataset layout at {path}: {message}")]
    DatasetLayout { path: PathBuf, message: String },

    #[error("Check failed with {error_count} error(s) and {warning_count} warning(s)")]
    CheckFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },
}

impl GroundkitError {
    /// True for failures confined to a single annotation file.
    ///
    /// Batch conversion records these as skips and keeps going; anything else
    /// aborts the run.
    pub fn is_record_scoped(&self) -> bool {
        matches!(
            self,
            GroundkitError::AnnotationRead { .. }
                | GroundkitError::AnnotationParse { .. }
                | GroundkitError::MalformedBoxPayload { .. }
                | GroundkitError::InconsistentGroundingAnswer { .. }
                | GroundkitError::InvalidImageDimensions { .. }
                | GroundkitError::MissingAnswerTurn
                | GroundkitError::EmptyGroundingAnswer
        )
    }
}
