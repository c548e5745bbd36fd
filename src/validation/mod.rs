//! Grounding consistency checks.
//!
//! A grounding answer is only usable if it actually localizes something the
//! question asked for. [`check_grounding_pair`] rejects answers that contain an
//! absence marker, and answers that reference a target the question never
//! mentions. The check is pure: the rejection reason is returned to the
//! caller, which decides how to log it.
//!
//! [`validate_record`] runs the same check plus box-payload checks over a
//! whole record and collects the findings into a [`ValidationReport`].

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::fmt;

use serde::Serialize;

use crate::conversion::{classify_record, RecordKind};
use crate::error::GroundkitError;
use crate::ir::{BoxScale, Normalized, RawConversationRecord};
use crate::tags::TagScanner;

/// Phrases that mark an answer as "nothing found".
pub const DEFAULT_ABSENCE_MARKERS: [&str; 2] = ["None", "不存在此类别"];

/// Options for the grounding consistency check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroundingCheckOptions {
    /// Literal substrings; an answer containing any of them is rejected.
    pub absence_markers: Vec<String>,
}

impl Default for GroundingCheckOptions {
    fn default() -> Self {
        Self {
            absence_markers: DEFAULT_ABSENCE_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

/// Why a (question, answer) pair was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum GroundingRejection {
    /// The answer contains an absence marker.
    AbsenceMarker { marker: String },
    /// The answer references a key that does not occur in the question.
    UnmatchedReference { reference: String },
}

impl GroundingRejection {
    /// The report code for this rejection.
    pub fn issue_code(&self) -> IssueCode {
        match self {
            GroundingRejection::AbsenceMarker { .. } => IssueCode::AbsenceMarker,
            GroundingRejection::UnmatchedReference { .. } => IssueCode::UnmatchedReference,
        }
    }
}

impl fmt::Display for GroundingRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroundingRejection::AbsenceMarker { marker } => {
                write!(f, "answer contains absence marker '{}'", marker)
            }
            GroundingRejection::UnmatchedReference { reference } => {
                write!(f, "answer target '{}' is not mentioned in the question", reference)
            }
        }
    }
}

/// Checks one (question, answer) pair with the standard tag delimiters.
pub fn check_grounding_pair(
    question: &str,
    answer: &str,
    opts: &GroundingCheckOptions,
) -> Result<(), GroundingRejection> {
    check_grounding_pair_with(TagScanner::standard(), question, answer, opts)
}

/// Checks one (question, answer) pair.
///
/// The absence check runs first; otherwise every reference key in the answer
/// must occur as a literal substring of the question.
pub fn check_grounding_pair_with(
    scanner: &TagScanner,
    question: &str,
    answer: &str,
    opts: &GroundingCheckOptions,
) -> Result<(), GroundingRejection> {
    if let Some(marker) = opts
        .absence_markers
        .iter()
        .find(|m| !m.is_empty() && answer.contains(m.as_str()))
    {
        return Err(GroundingRejection::AbsenceMarker {
            marker: marker.clone(),
        });
    }

    if let Some(reference) = scanner
        .references(answer)
        .into_iter()
        .find(|r| !question.contains(r))
    {
        return Err(GroundingRejection::UnmatchedReference {
            reference: reference.to_string(),
        });
    }

    Ok(())
}

/// Returns true if the pair passes [`check_grounding_pair`] with default options.
pub fn is_valid_grounding_pair(question: &str, answer: &str) -> bool {
    check_grounding_pair(question, answer, &GroundingCheckOptions::default()).is_ok()
}

/// Checks one record and appends its findings to `report`.
///
/// `source` identifies the file in issue contexts.
pub fn validate_record(
    source: &str,
    record: &RawConversationRecord,
    scanner: &TagScanner,
    opts: &GroundingCheckOptions,
    scale: BoxScale,
    report: &mut ValidationReport,
) {
    let file = || IssueContext::File {
        source: source.to_string(),
    };

    if classify_record(record, scanner) == RecordKind::Grounding {
        match record.first_pair() {
            None => report.add(ValidationIssue::warning(
                IssueCode::MissingAnswerTurn,
                "grounding record has no question/answer pair",
                file(),
            )),
            Some((question, answer)) => {
                if let Err(rejection) =
                    check_grounding_pair_with(scanner, &question.value, &answer.value, opts)
                {
                    report.add(ValidationIssue::warning(
                        rejection.issue_code(),
                        rejection.to_string(),
                        IssueContext::Turn {
                            source: source.to_string(),
                            turn: 1,
                        },
                    ));
                } else if scanner
                    .extract_objects::<Normalized>(&answer.value)
                    .is_ok_and(|groups| groups.is_empty())
                {
                    report.add(ValidationIssue::warning(
                        IssueCode::EmptyGroundingAnswer,
                        "first answer of a grounding record localizes no reference",
                        IssueContext::Turn {
                            source: source.to_string(),
                            turn: 1,
                        },
                    ));
                }
            }
        }
    }

    let mut has_boxes = false;
    for (index, turn) in record.conversations.iter().enumerate() {
        if !scanner.has_boxes(&turn.value) {
            continue;
        }
        has_boxes = true;
        let context = || IssueContext::Turn {
            source: source.to_string(),
            turn: index,
        };

        let extraction = match scanner.extract::<Normalized>(&turn.value) {
            Ok(extraction) => extraction,
            Err(err) => {
                report.add(ValidationIssue::error(
                    IssueCode::MalformedBoxPayload,
                    err.to_string(),
                    context(),
                ));
                continue;
            }
        };

        let grid = i64::from(scale.get());
        let boxes = extraction
            .objects
            .iter()
            .chain(extraction.relations.iter())
            .flat_map(|g| g.boxes.iter().map(move |b| (g.key.as_str(), b)));
        for (key, bbox) in boxes {
            if !bbox.is_ordered() {
                report.add(ValidationIssue::warning(
                    IssueCode::UnorderedBox,
                    format!("box {:?} for '{}' has min > max", bbox.to_array(), key),
                    context(),
                ));
            }
            if bbox.to_array().iter().any(|c| *c < 0 || *c >= grid) {
                report.add(ValidationIssue::warning(
                    IssueCode::BoxOutsideGrid,
                    format!(
                        "box {:?} for '{}' lies outside [0, {})",
                        bbox.to_array(),
                        key,
                        grid
                    ),
                    context(),
                ));
            }
        }
    }

    if has_boxes {
        if let Err(GroundkitError::InvalidImageDimensions { height, width }) = record.frame() {
            report.add(ValidationIssue::error(
                IssueCode::InvalidImageDimensions,
                format!("cannot restore boxes for a {}x{} image", height, width),
                file(),
            ));
        }
    }

    report.files_checked += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Role;

    #[test]
    fn answer_reference_missing_from_question_is_rejected() {
        assert!(!is_valid_grounding_pair(
            "find the dog",
            "<ref>cat</ref><box>[[0,0,1,1]]</box>"
        ));
        assert_eq!(
            check_grounding_pair(
                "find the dog",
                "<ref>cat</ref><box>[[0,0,1,1]]</box>",
                &GroundingCheckOptions::default()
            ),
            Err(GroundingRejection::UnmatchedReference {
                reference: "cat".to_string()
            })
        );
    }

    #[test]
    fn absence_marker_is_rejected() {
        assert!(!is_valid_grounding_pair("find the dog", "不存在此类别"));
        assert!(!is_valid_grounding_pair("find the dog", "<ref>dog</ref>None"));
    }

    #[test]
    fn matching_references_pass() {
        assert!(is_valid_grounding_pair(
            "find the dog and the cat",
            "<ref>dog</ref><box>[[0,0,1,1]]</box><ref>cat</ref><box>[[1,1,2,2]]</box>"
        ));
    }

    #[test]
    fn absence_check_is_case_sensitive_substring() {
        // "none" in lower case is not the configured marker
        assert!(is_valid_grounding_pair("is there none?", "<ref>none</ref>"));
    }

    #[test]
    fn custom_markers_replace_defaults() {
        let opts = GroundingCheckOptions {
            absence_markers: vec!["not found".to_string()],
        };
        assert!(check_grounding_pair("q", "not found", &opts).is_err());
        assert!(check_grounding_pair("q", "None", &opts).is_ok());
    }

    fn grounding_record(answer: &str) -> RawConversationRecord {
        RawConversationRecord::new("img.jpg", 100, 200)
            .with_turn(Role::Human, "<image>\nfind the cat")
            .with_turn(Role::Assistant, answer)
    }

    fn check(record: &RawConversationRecord) -> ValidationReport {
        let mut report = ValidationReport::new();
        validate_record(
            "r.json",
            record,
            TagScanner::standard(),
            &GroundingCheckOptions::default(),
            BoxScale::default(),
            &mut report,
        );
        report
    }

    #[test]
    fn clean_record_has_no_issues() {
        let report = check(&grounding_record("<ref>cat</ref><box>[[10,20,30,40]]</box>"));
        assert!(report.is_clean(), "{}", report);
        assert_eq!(report.files_checked, 1);
    }

    #[test]
    fn reports_rejection_and_box_problems() {
        let report = check(&grounding_record(
            "<ref>dog</ref><box>[[30,20,10,40]]</box><box>[[0,0,1000,5]]</box>",
        ));
        let codes: Vec<_> = report.issues.iter().map(|i| i.code).collect();
        assert!(codes.contains(&IssueCode::UnmatchedReference));
        assert!(codes.contains(&IssueCode::UnorderedBox));
        assert!(codes.contains(&IssueCode::BoxOutsideGrid));
        assert!(report.is_ok());
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let report = check(&grounding_record("<ref>cat</ref><box>[[1,2]]</box>"));
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.issues[0].code, IssueCode::MalformedBoxPayload);
    }

    #[test]
    fn grounding_only_in_later_turn_is_a_warning() {
        let record = RawConversationRecord::new("img.jpg", 100, 200)
            .with_turn(Role::Human, "<image>\nwhat is this?")
            .with_turn(Role::Assistant, "a cat")
            .with_turn(Role::Human, "where is the cat?")
            .with_turn(Role::Assistant, "<ref>cat</ref><box>[[400,400,600,600]]</box>");
        let report = check(&record);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.issues[0].code, IssueCode::EmptyGroundingAnswer);
        assert!(report.is_ok());
    }

    #[test]
    fn zero_sized_image_with_boxes_is_an_error() {
        let mut record = grounding_record("<ref>cat</ref><box>[[1,2,3,4]]</box>");
        record.height = 0;
        let report = check(&record);
        assert!(report
            .issues
            .iter()
            .any(|i| i.code == IssueCode::InvalidImageDimensions));
    }
}
