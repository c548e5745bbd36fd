//! Conversion of raw conversation records into unified training records.
//!
//! Each raw record is first classified:
//!
//! - **Grounding**: some assistant turn carries both a reference span and a
//!   box span. The first (question, answer) pair must pass the consistency
//!   check; the answer's boxes are then restored to pixel space and become
//!   the record's `objects`. Exactly one unified record is produced, with
//!   placeholder query/response strings.
//! - **Plain QA**: everything else. Each positional (question, answer) pair
//!   becomes one unified record; a trailing question without an answer is
//!   dropped.
//!
//! Every failure is scoped to the record that caused it. [`RecordConverter::convert_batch`]
//! turns failures into report entries and keeps going.

pub mod report;

pub use report::{
    ConversionCounts, ConversionIssue, ConversionIssueCode, ConversionReport, ConversionSeverity,
};

use crate::error::GroundkitError;
use crate::ir::{
    to_normalized_space, to_pixel_space, BoxScale, ImageFrame, Normalized, Pixel,
    RawConversationRecord, Role, TargetObject, UnifiedRecord,
};
use crate::tags::{TagDelimiters, TagScanner};
use crate::validation::{check_grounding_pair_with, GroundingCheckOptions};

/// Image placeholder stripped from the start of questions.
pub const DEFAULT_IMAGE_MARKER: &str = "<image>";
/// Query of every grounding record.
pub const DEFAULT_GROUNDING_QUERY: &str = "找到 <ref-object>";
/// Response of every grounding record; the answer lives in `objects`.
pub const DEFAULT_GROUNDING_RESPONSE: &str = "<bbox>";

/// How a raw record will be converted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Grounding,
    PlainQa,
}

/// Options for record conversion.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvertOptions {
    /// Upper bound of the normalized grid used in annotation text.
    pub box_scale: BoxScale,
    /// Consistency check settings for grounding answers.
    pub grounding: GroundingCheckOptions,
    /// Tag delimiters recognized in turn text.
    pub delimiters: TagDelimiters,
    /// Marker stripped from the start of plain QA questions.
    pub image_marker: String,
    pub grounding_query: String,
    pub grounding_response: String,
    /// Re-normalize box spans in plain QA turns per axis.
    pub rescale_region_boxes: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            box_scale: BoxScale::default(),
            grounding: GroundingCheckOptions::default(),
            delimiters: TagDelimiters::default(),
            image_marker: DEFAULT_IMAGE_MARKER.to_string(),
            grounding_query: DEFAULT_GROUNDING_QUERY.to_string(),
            grounding_response: DEFAULT_GROUNDING_RESPONSE.to_string(),
            rescale_region_boxes: true,
        }
    }
}

/// Result of converting one raw record.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvertedRecord {
    pub kind: RecordKind,
    pub records: Vec<UnifiedRecord>,
    /// Box spans in paired plain QA turns were re-normalized.
    pub rescaled_region_boxes: bool,
}

/// One loaded (or failed) annotation file.
#[derive(Debug)]
pub struct SourcedRecord {
    /// File identity used in logs and reports.
    pub source: String,
    pub record: Result<RawConversationRecord, GroundkitError>,
}

impl SourcedRecord {
    pub fn new(
        source: impl Into<String>,
        record: Result<RawConversationRecord, GroundkitError>,
    ) -> Self {
        Self {
            source: source.into(),
            record,
        }
    }
}

/// Converted records of a batch and what happened along the way.
#[derive(Clone, Debug, Default)]
pub struct BatchOutput {
    pub records: Vec<UnifiedRecord>,
    pub report: ConversionReport,
}

/// Classifies a record as grounding or plain QA.
pub fn classify_record(record: &RawConversationRecord, scanner: &TagScanner) -> RecordKind {
    let grounding = record
        .conversations
        .iter()
        .any(|turn| turn.from == Role::Assistant && scanner.has_grounding(&turn.value));
    if grounding {
        RecordKind::Grounding
    } else {
        RecordKind::PlainQa
    }
}

/// Converts one record with the given options.
pub fn convert_record(
    record: &RawConversationRecord,
    opts: &ConvertOptions,
) -> Result<Vec<UnifiedRecord>, GroundkitError> {
    RecordConverter::new(opts.clone())?.convert(record)
}

/// Strips a leading image marker and surrounding whitespace from a question.
pub fn strip_image_marker<'a>(text: &'a str, marker: &str) -> &'a str {
    let trimmed = text.trim();
    if marker.is_empty() {
        return trimmed;
    }
    trimmed.strip_prefix(marker).unwrap_or(trimmed).trim()
}

/// Converts raw records using a fixed set of options.
#[derive(Clone, Debug)]
pub struct RecordConverter {
    options: ConvertOptions,
    scanner: TagScanner,
}

impl RecordConverter {
    /// Builds a converter, compiling the tag scanner once.
    pub fn new(options: ConvertOptions) -> Result<Self, GroundkitError> {
        let scanner = TagScanner::new(options.delimiters.clone())?;
        Ok(Self { options, scanner })
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    pub fn scanner(&self) -> &TagScanner {
        &self.scanner
    }

    pub fn classify(&self, record: &RawConversationRecord) -> RecordKind {
        classify_record(record, &self.scanner)
    }

    /// Converts one raw record into unified records.
    ///
    /// # Errors
    /// Returns a record-scoped error (see [`GroundkitError::is_record_scoped`])
    /// when the record must be skipped.
    pub fn convert(
        &self,
        record: &RawConversationRecord,
    ) -> Result<Vec<UnifiedRecord>, GroundkitError> {
        Ok(self.convert_detailed(record)?.records)
    }

    /// Like [`RecordConverter::convert`], also reporting how the record was handled.
    pub fn convert_detailed(
        &self,
        record: &RawConversationRecord,
    ) -> Result<ConvertedRecord, GroundkitError> {
        let kind = self.classify(record);
        let (records, rescaled_region_boxes) = match kind {
            RecordKind::Grounding => (vec![self.convert_grounding(record)?], false),
            RecordKind::PlainQa => self.convert_plain_qa(record)?,
        };

        Ok(ConvertedRecord {
            kind,
            records,
            rescaled_region_boxes,
        })
    }

    /// Rewrites the first answer's box payloads into pixel space.
    ///
    /// The answer becomes comma-joined `<ref>key</ref><box>[[..]]</box>`
    /// segments; surrounding prose and relation spans are not kept. Records
    /// whose first answer has no reference groups are returned unchanged.
    pub fn restore_answer_text(
        &self,
        record: &RawConversationRecord,
        frame: ImageFrame,
    ) -> Result<RawConversationRecord, GroundkitError> {
        let mut restored = record.clone();

        if let Some(answer) = restored.conversations.get_mut(1) {
            let normalized = self.scanner.extract_objects::<Normalized>(&answer.value)?;
            if !normalized.is_empty() {
                let scale = self.options.box_scale;
                let pixel = normalized.map_boxes(|b| to_pixel_space(b, frame, scale));
                answer.value = self.scanner.render_objects(&pixel);
            }
        }

        Ok(restored)
    }

    fn convert_grounding(
        &self,
        record: &RawConversationRecord,
    ) -> Result<UnifiedRecord, GroundkitError> {
        let (question, answer) = record.first_pair().ok_or(GroundkitError::MissingAnswerTurn)?;

        check_grounding_pair_with(
            &self.scanner,
            &question.value,
            &answer.value,
            &self.options.grounding,
        )
        .map_err(|rejection| GroundkitError::InconsistentGroundingAnswer { rejection })?;

        let frame = record.frame()?;
        let restored = self.restore_answer_text(record, frame)?;
        let restored_answer = restored
            .first_pair()
            .map(|(_, a)| a.value.as_str())
            .unwrap_or_default();

        let objects: Vec<TargetObject> = self
            .scanner
            .extract_objects::<Pixel>(restored_answer)?
            .into_groups()
            .into_iter()
            .map(|group| TargetObject::new(group.key, group.boxes))
            .collect();
        if objects.is_empty() {
            return Err(GroundkitError::EmptyGroundingAnswer);
        }

        Ok(UnifiedRecord::grounding(
            self.options.grounding_query.clone(),
            self.options.grounding_response.clone(),
            record.image.clone(),
            objects,
        ))
    }

    fn convert_plain_qa(
        &self,
        record: &RawConversationRecord,
    ) -> Result<(Vec<UnifiedRecord>, bool), GroundkitError> {
        let mut cached_frame: Option<ImageFrame> = None;
        let mut rescaled = false;
        let mut out = Vec::new();

        for (question, answer) in record.qa_pairs() {
            let mut question_text = question.value.clone();
            let mut answer_text = answer.value.clone();

            if self.options.rescale_region_boxes {
                for text in [&mut question_text, &mut answer_text] {
                    if !self.scanner.has_boxes(text) {
                        continue;
                    }
                    let frame = match cached_frame {
                        Some(frame) => frame,
                        None => *cached_frame.insert(record.frame()?),
                    };
                    *text = self.rescale_region_boxes(text, frame)?;
                    rescaled = true;
                }
            }

            out.push(UnifiedRecord::qa(
                strip_image_marker(&question_text, &self.options.image_marker),
                answer_text.trim(),
                record.image.clone(),
            ));
        }

        Ok((out, rescaled))
    }

    /// Restores every box span to pixels, then re-normalizes it per axis.
    fn rescale_region_boxes(
        &self,
        text: &str,
        frame: ImageFrame,
    ) -> Result<String, GroundkitError> {
        let scale = self.options.box_scale;
        self.scanner
            .rewrite_box_spans::<Normalized, Normalized>(text, |b| {
                to_normalized_space(&to_pixel_space(b, frame, scale), frame, scale)
            })
    }

    /// Converts a batch of loaded files, isolating failures per file.
    ///
    /// Every failure is logged with the file identity, recorded in the
    /// report, and the file is omitted from the output.
    pub fn convert_batch(&self, inputs: impl IntoIterator<Item = SourcedRecord>) -> BatchOutput {
        let mut output = BatchOutput::default();
        let mut rescaled = 0usize;

        for input in inputs {
            output.report.counts.files += 1;

            let result = input
                .record
                .and_then(|record| self.convert_detailed(&record));

            match result {
                Ok(converted) => {
                    match converted.kind {
                        RecordKind::Grounding => output.report.counts.grounding_records += 1,
                        RecordKind::PlainQa => output.report.counts.plain_qa_records += 1,
                    }
                    if converted.rescaled_region_boxes {
                        rescaled += 1;
                    }
                    output.report.counts.emitted_records += converted.records.len();
                    output.records.extend(converted.records);
                }
                Err(err) => {
                    tracing::warn!(source = %input.source, "skipping annotation file: {}", err);
                    output.report.counts.skipped_files += 1;
                    output
                        .report
                        .add(ConversionIssue::from_error(&input.source, &err));
                }
            }
        }

        if rescaled > 0 {
            output.report.add(ConversionIssue::info(
                ConversionIssueCode::RegionBoxesRescaled,
                format!(
                    "{} plain QA file(s) had region boxes re-normalized per axis",
                    rescaled
                ),
            ));
        }

        output
    }
}
