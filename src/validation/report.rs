//! Validation report types for structured error reporting.
//!
//! This module provides rich, structured validation results that can be
//! displayed to users, written to files, or processed programmatically.

use serde::Serialize;
use std::fmt;

/// The result of checking a set of annotation files.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationReport {
    /// Number of annotation files examined.
    pub files_checked: usize,

    /// All issues found during validation.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Creates a new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an issue to the report.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Appends every issue of `other`.
    pub fn merge(&mut self, other: ValidationReport) {
        self.files_checked += other.files_checked;
        self.issues.extend(other.issues);
    }

    /// Returns the number of errors in the report.
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    /// Returns the number of warnings in the report.
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// Returns true if there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(
                f,
                "Check passed: {} file(s), no issues found",
                self.files_checked
            );
        }

        writeln!(
            f,
            "Checked {} file(s) with {} error(s) and {} warning(s):",
            self.files_checked,
            self.error_count(),
            self.warning_count()
        )?;
        writeln!(f)?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// A single validation issue (error or warning).
#[derive(Clone, Debug, Serialize)]
pub struct ValidationIssue {
    /// The severity of the issue.
    pub severity: Severity,

    /// A stable code for the issue type.
    pub code: IssueCode,

    /// A human-readable description of the issue.
    pub message: String,

    /// Where the issue occurred.
    pub context: IssueContext,
}

impl ValidationIssue {
    /// Creates a new validation issue.
    pub fn new(
        severity: Severity,
        code: IssueCode,
        message: impl Into<String>,
        context: IssueContext,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            context,
        }
    }

    /// Creates a new error.
    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Error, code, message, context)
    }

    /// Creates a new warning.
    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Warning, code, message, context)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

/// The severity of a validation issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The file converts, but something in it will be filtered or looks off.
    Warning,
    /// The file cannot be converted at all.
    Error,
}

/// A stable code identifying the type of validation issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    // File issues
    /// The file could not be read or decoded as a record.
    UnreadableAnnotationFile,
    /// A record that needs coordinate restoration has a zero dimension.
    InvalidImageDimensions,

    // Grounding consistency
    /// The answer contains an absence marker such as `None`.
    AbsenceMarker,
    /// The answer references a target the question never mentions.
    UnmatchedReference,
    /// A grounding record has no (question, answer) pair.
    MissingAnswerTurn,
    /// The first answer of a grounding record localizes no reference.
    EmptyGroundingAnswer,

    // Box issues
    /// A box payload is not an array of 4-integer arrays.
    MalformedBoxPayload,
    /// A box has x1 > x2 or y1 > y2.
    UnorderedBox,
    /// A box coordinate lies outside `[0, scale)`.
    BoxOutsideGrid,
}

/// Where a validation issue occurred.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueContext {
    /// The annotation file as a whole.
    File { source: String },
    /// One turn within the file.
    Turn { source: String, turn: usize },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::File { source } => write!(f, "{}", source),
            IssueContext::Turn { source, turn } => write!(f, "{} turn {}", source, turn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(source: &str) -> IssueContext {
        IssueContext::File {
            source: source.to_string(),
        }
    }

    #[test]
    fn counts_by_severity() {
        let mut report = ValidationReport::new();
        report.add(ValidationIssue::error(
            IssueCode::MalformedBoxPayload,
            "bad payload",
            file("a.json"),
        ));
        report.add(ValidationIssue::warning(
            IssueCode::AbsenceMarker,
            "answer says None",
            file("b.json"),
        ));

        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 1);
        assert!(!report.is_ok());
        assert!(!report.is_clean());
    }

    #[test]
    fn display_includes_code_and_context() {
        let issue = ValidationIssue::warning(
            IssueCode::UnmatchedReference,
            "'cat' not in question",
            IssueContext::Turn {
                source: "x.json".to_string(),
                turn: 1,
            },
        );
        assert_eq!(
            issue.to_string(),
            "[WARN ] UnmatchedReference in x.json turn 1: 'cat' not in question"
        );
    }

    #[test]
    fn serializes_with_snake_case_codes() {
        let mut report = ValidationReport::new();
        report.files_checked = 3;
        report.add(ValidationIssue::error(
            IssueCode::UnreadableAnnotationFile,
            "bad json",
            file("c.json"),
        ));
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"files_checked\":3"));
        assert!(json.contains("\"code\":\"unreadable_annotation_file\""));
        assert!(json.contains("\"kind\":\"file\""));
    }
}
