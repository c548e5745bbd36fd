//! Conversion report types for tracking skips and policy decisions.
//!
//! This module provides structured reporting for batch conversion,
//! similar to how `validation::ValidationReport` tracks file issues.

use serde::Serialize;
use std::fmt;

use crate::error::GroundkitError;

/// A report generated while converting one dataset.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ConversionReport {
    /// Dataset name (empty for ad hoc batches).
    pub dataset: String,
    /// Record counts.
    pub counts: ConversionCounts,
    /// Skips and notes, in the order they occurred.
    pub issues: Vec<ConversionIssue>,
}

impl ConversionReport {
    /// Create a new empty report for a dataset.
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            ..Default::default()
        }
    }

    /// Add an issue to the report.
    pub fn add(&mut self, issue: ConversionIssue) {
        self.issues.push(issue);
    }

    /// Count of warning-level issues (skipped files).
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == ConversionSeverity::Warning)
            .count()
    }

    /// Count of info-level issues (policy decisions, notes).
    pub fn info_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == ConversionSeverity::Info)
            .count()
    }

    /// Returns true if any input file was dropped.
    pub fn has_skips(&self) -> bool {
        self.warning_count() > 0
    }

    /// Iterate over skipped file identities.
    pub fn skipped_sources(&self) -> impl Iterator<Item = &str> {
        self.issues
            .iter()
            .filter(|i| i.severity == ConversionSeverity::Warning)
            .filter_map(|i| i.source.as_deref())
    }
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.counts;
        if !self.dataset.is_empty() {
            writeln!(f, "{}:", self.dataset)?;
        }
        writeln!(
            f,
            "  {} file(s): {} grounding, {} plain QA, {} skipped",
            c.files, c.grounding_records, c.plain_qa_records, c.skipped_files
        )?;
        writeln!(
            f,
            "  {} record(s): {} train, {} val",
            c.emitted_records, c.train_records, c.val_records
        )?;

        let warnings = self.warning_count();
        if warnings > 0 {
            writeln!(f)?;
            writeln!(f, "Skipped ({}):", warnings)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == ConversionSeverity::Warning)
            {
                writeln!(f, "  - {}", issue)?;
            }
        }

        let infos = self.info_count();
        if infos > 0 {
            writeln!(f)?;
            writeln!(f, "Notes ({}):", infos)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == ConversionSeverity::Info)
            {
                writeln!(f, "  - {}", issue)?;
            }
        }

        Ok(())
    }
}

/// Counts for one conversion batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConversionCounts {
    /// Annotation files attempted.
    pub files: usize,
    /// Files converted as grounding records.
    pub grounding_records: usize,
    /// Files converted as plain QA records.
    pub plain_qa_records: usize,
    /// Unified records produced.
    pub emitted_records: usize,
    /// Files that produced no output.
    pub skipped_files: usize,
    /// Records assigned to the training split.
    pub train_records: usize,
    /// Records assigned to the validation split.
    pub val_records: usize,
}

/// A single issue recorded during conversion.
#[derive(Clone, Debug, Serialize)]
pub struct ConversionIssue {
    pub severity: ConversionSeverity,
    pub code: ConversionIssueCode,
    /// Annotation file identity, if the issue concerns one file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub message: String,
}

impl ConversionIssue {
    /// Create a warning-level issue for a skipped file.
    pub fn skip(
        code: ConversionIssueCode,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: ConversionSeverity::Warning,
            code,
            source: Some(source.into()),
            message: message.into(),
        }
    }

    /// Create an info-level issue (policy note, does not drop anything).
    pub fn info(code: ConversionIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: ConversionSeverity::Info,
            code,
            source: None,
            message: message.into(),
        }
    }

    /// Builds a skip issue from a record-scoped error.
    pub fn from_error(source: impl Into<String>, err: &GroundkitError) -> Self {
        Self::skip(ConversionIssueCode::for_error(err), source, err.to_string())
    }
}

impl fmt::Display for ConversionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", source, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Severity level for conversion issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionSeverity {
    /// A file was skipped and is absent from the output.
    Warning,
    /// An info note describes policy decisions; nothing was dropped.
    Info,
}

/// Stable issue codes for programmatic consumption.
///
/// These codes are part of the JSON report schema and should remain stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionIssueCode {
    // Skips (Warning level)
    /// A box payload did not parse.
    MalformedBoxPayload,
    /// The grounding answer was rejected by the consistency check.
    InconsistentGroundingAnswer,
    /// The file could not be read or decoded.
    UnreadableAnnotationFile,
    /// The record needs coordinate restoration but has a zero dimension.
    InvalidImageDimensions,
    /// A grounding record has no (question, answer) pair.
    MissingAnswerTurn,
    /// The first answer of a grounding record has no reference groups.
    EmptyGroundingAnswer,
    /// Any other record-scoped failure.
    Other,

    // Policy decisions (Info level)
    /// Region boxes in plain QA turns were re-normalized per axis.
    RegionBoxesRescaled,
    /// The train/val shuffle used an unseeded random source.
    UnseededShuffle,
}

impl ConversionIssueCode {
    /// Maps a record-scoped error onto its report code.
    pub fn for_error(err: &GroundkitError) -> Self {
        match err {
            GroundkitError::MalformedBoxPayload { .. } => Self::MalformedBoxPayload,
            GroundkitError::InconsistentGroundingAnswer { .. } => {
                Self::InconsistentGroundingAnswer
            }
            GroundkitError::AnnotationRead { .. } | GroundkitError::AnnotationParse { .. } => {
                Self::UnreadableAnnotationFile
            }
            GroundkitError::InvalidImageDimensions { .. } => Self::InvalidImageDimensions,
            GroundkitError::MissingAnswerTurn => Self::MissingAnswerTurn,
            GroundkitError::EmptyGroundingAnswer => Self::EmptyGroundingAnswer,
            _ => Self::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_has_no_skips() {
        let report = ConversionReport::new("ds");
        assert!(!report.has_skips());
        assert_eq!(report.warning_count(), 0);
        assert_eq!(report.info_count(), 0);
    }

    #[test]
    fn skip_is_counted_and_listed() {
        let mut report = ConversionReport::new("ds");
        report.add(ConversionIssue::from_error(
            "bad.json",
            &GroundkitError::MissingAnswerTurn,
        ));
        report.add(ConversionIssue::info(
            ConversionIssueCode::UnseededShuffle,
            "shuffle not reproducible",
        ));

        assert!(report.has_skips());
        assert_eq!(report.skipped_sources().collect::<Vec<_>>(), vec!["bad.json"]);
        assert_eq!(report.issues[0].code, ConversionIssueCode::MissingAnswerTurn);
        assert_eq!(report.info_count(), 1);
    }

    #[test]
    fn report_serializes_to_json() {
        let mut report = ConversionReport::new("ds");
        report.counts.files = 2;
        report.add(ConversionIssue::skip(
            ConversionIssueCode::MalformedBoxPayload,
            "a.json",
            "bad payload",
        ));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"dataset\":\"ds\""));
        assert!(json.contains("\"severity\":\"warning\""));
        assert!(json.contains("\"code\":\"malformed_box_payload\""));
        assert!(json.contains("\"files\":2"));
    }

    #[test]
    fn display_lists_skips() {
        let mut report = ConversionReport::new("ds");
        report.add(ConversionIssue::skip(
            ConversionIssueCode::InconsistentGroundingAnswer,
            "a.json",
            "answer contains absence marker 'None'",
        ));
        let text = report.to_string();
        assert!(text.contains("Skipped (1):"));
        assert!(text.contains("a.json: answer contains absence marker 'None'"));
    }
}
