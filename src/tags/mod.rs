//! Inline tag parsing for grounding annotations.
//!
//! Answer text marks objects with three delimiter pairs:
//!
//! - `<ref>cat</ref>` names a reference,
//! - `<box>[[x1,y1,x2,y2], ...]</box>` carries one or more boxes,
//! - `<pred>on</pred>` names a relation.
//!
//! A box span belongs to the most recently seen reference or relation span;
//! boxes seen before any name go to the sentinel key [`SENTINEL_KEY`]. So
//! `<ref>A</ref><box>..</box><box>..</box>` attaches both boxes to `A`.
//!
//! [`render_objects`] is the inverse used to write restored boxes back into
//! text form.

use std::marker::PhantomData;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::GroundkitError;
use crate::ir::BBox;

pub const REF_START_TAG: &str = "<ref>";
pub const REF_END_TAG: &str = "</ref>";
pub const BOX_START_TAG: &str = "<box>";
pub const BOX_END_TAG: &str = "</box>";
pub const REL_START_TAG: &str = "<pred>";
pub const REL_END_TAG: &str = "</pred>";

/// Key for boxes that appear before any reference span.
pub const SENTINEL_KEY: &str = "obj";

/// Separator between segments in rendered text.
const RENDER_SEPARATOR: &str = ",";

static DEFAULT_SCANNER: LazyLock<TagScanner> = LazyLock::new(|| {
    TagScanner::new(TagDelimiters::default()).expect("valid default tag regex")
});

/// An opening and closing delimiter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagPair {
    pub open: String,
    pub close: String,
}

impl TagPair {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// Wraps `content` in this pair.
    pub fn wrap(&self, content: &str) -> String {
        format!("{}{}{}", self.open, content, self.close)
    }
}

/// The delimiter pairs recognized by the scanner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagDelimiters {
    pub reference: TagPair,
    pub bbox: TagPair,
    pub relation: TagPair,
}

impl Default for TagDelimiters {
    fn default() -> Self {
        Self {
            reference: TagPair::new(REF_START_TAG, REF_END_TAG),
            bbox: TagPair::new(BOX_START_TAG, BOX_END_TAG),
            relation: TagPair::new(REL_START_TAG, REL_END_TAG),
        }
    }
}

/// Kind of a tagged span.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpanKind {
    Reference,
    Box,
    Relation,
}

/// One delimited span found in a text blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaggedSpan<'a> {
    pub kind: SpanKind,
    /// Text between the delimiters.
    pub content: &'a str,
    /// Byte range of the whole span, delimiters included.
    pub range: Range<usize>,
}

impl TaggedSpan<'_> {
    /// Returns the span content as an unresolved box payload.
    pub fn box_payload(&self) -> Option<RawBoxPayload> {
        (self.kind == SpanKind::Box).then(|| RawBoxPayload::Text(self.content.to_string()))
    }
}

/// A box payload, either still textual or already structured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawBoxPayload {
    Text(String),
    Parsed(Vec<[i64; 4]>),
}

impl RawBoxPayload {
    /// Resolves the payload into boxes of the caller's coordinate space.
    ///
    /// # Errors
    /// Returns [`GroundkitError::MalformedBoxPayload`] if textual content is not
    /// a JSON array of 4-integer arrays.
    pub fn resolve<TSpace>(self) -> Result<Vec<BBox<TSpace>>, GroundkitError> {
        let parsed = match self {
            RawBoxPayload::Parsed(boxes) => boxes,
            RawBoxPayload::Text(text) => match serde_json::from_str::<Vec<[i64; 4]>>(&text) {
                Ok(boxes) => boxes,
                Err(source) => {
                    return Err(GroundkitError::MalformedBoxPayload {
                        payload: text,
                        source,
                    })
                }
            },
        };
        Ok(parsed.into_iter().map(BBox::from_array).collect())
    }
}

/// A reference key and its boxes, in textual order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectGroup<TSpace> {
    pub key: String,
    pub boxes: Vec<BBox<TSpace>>,
}

/// Ordered mapping from reference key to boxes.
///
/// Keys keep the order of their first appearance; boxes keep textual order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectGroups<TSpace> {
    groups: Vec<ObjectGroup<TSpace>>,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Default for ObjectGroups<TSpace> {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            _space: PhantomData,
        }
    }
}

impl<TSpace> ObjectGroups<TSpace> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends boxes to `key`, creating the group on first use.
    pub fn extend(&mut self, key: &str, boxes: impl IntoIterator<Item = BBox<TSpace>>) {
        match self.groups.iter_mut().find(|g| g.key == key) {
            Some(group) => group.boxes.extend(boxes),
            None => self.groups.push(ObjectGroup {
                key: key.to_string(),
                boxes: boxes.into_iter().collect(),
            }),
        }
    }

    /// Boxes for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&[BBox<TSpace>]> {
        self.groups
            .iter()
            .find(|g| g.key == key)
            .map(|g| g.boxes.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectGroup<TSpace>> {
        self.groups.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of boxes across all groups.
    pub fn box_count(&self) -> usize {
        self.groups.iter().map(|g| g.boxes.len()).sum()
    }

    /// Maps every box, possibly into another coordinate space.
    pub fn map_boxes<TOther>(
        &self,
        mut f: impl FnMut(&BBox<TSpace>) -> BBox<TOther>,
    ) -> ObjectGroups<TOther> {
        ObjectGroups {
            groups: self
                .groups
                .iter()
                .map(|g| ObjectGroup {
                    key: g.key.clone(),
                    boxes: g.boxes.iter().map(&mut f).collect(),
                })
                .collect(),
            _space: PhantomData,
        }
    }

    pub fn into_groups(self) -> Vec<ObjectGroup<TSpace>> {
        self.groups
    }
}

/// Reference and relation groupings extracted from one text blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extraction<TSpace> {
    pub objects: ObjectGroups<TSpace>,
    pub relations: ObjectGroups<TSpace>,
}

/// Regex-backed scanner for tagged spans.
#[derive(Clone, Debug)]
pub struct TagScanner {
    delimiters: TagDelimiters,
    pattern: Regex,
}

impl TagScanner {
    /// Builds a scanner for the given delimiters.
    pub fn new(delimiters: TagDelimiters) -> Result<Self, GroundkitError> {
        let alt = |name: &str, pair: &TagPair| {
            format!(
                "{}(?P<{}>.*?){}",
                regex::escape(&pair.open),
                name,
                regex::escape(&pair.close)
            )
        };
        let source = [
            alt("ref", &delimiters.reference),
            alt("box", &delimiters.bbox),
            alt("pred", &delimiters.relation),
        ]
        .join("|");
        let pattern = Regex::new(&source)?;

        Ok(Self {
            delimiters,
            pattern,
        })
    }

    /// Returns the scanner for the standard `<ref>`/`<box>`/`<pred>` tags.
    pub fn standard() -> &'static TagScanner {
        &DEFAULT_SCANNER
    }

    pub fn delimiters(&self) -> &TagDelimiters {
        &self.delimiters
    }

    /// Scans `text` left to right for tagged spans.
    pub fn spans<'t>(
        &self,
        text: &'t str,
    ) -> impl Iterator<Item = TaggedSpan<'t>> + use<'_, 't> {
        self.pattern.captures_iter(text).filter_map(|caps| {
            let range = caps.get(0)?.range();
            let (kind, m) = if let Some(m) = caps.name("ref") {
                (SpanKind::Reference, m)
            } else if let Some(m) = caps.name("box") {
                (SpanKind::Box, m)
            } else {
                (SpanKind::Relation, caps.name("pred")?)
            };
            Some(TaggedSpan {
                kind,
                content: m.as_str(),
                range,
            })
        })
    }

    /// Returns every reference key in textual order.
    pub fn references<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.spans(text)
            .filter(|s| s.kind == SpanKind::Reference)
            .map(|s| s.content)
            .collect()
    }

    /// True if `text` has at least one reference span and one box span.
    pub fn has_grounding(&self, text: &str) -> bool {
        let (mut has_ref, mut has_box) = (false, false);
        for span in self.spans(text) {
            match span.kind {
                SpanKind::Reference => has_ref = true,
                SpanKind::Box => has_box = true,
                SpanKind::Relation => {}
            }
            if has_ref && has_box {
                return true;
            }
        }
        false
    }

    /// True if `text` has any box span.
    pub fn has_boxes(&self, text: &str) -> bool {
        self.spans(text).any(|s| s.kind == SpanKind::Box)
    }

    /// Groups box spans under the reference or relation preceding them.
    ///
    /// # Errors
    /// Returns [`GroundkitError::MalformedBoxPayload`] on the first box span
    /// whose payload does not parse.
    pub fn extract<TSpace>(&self, text: &str) -> Result<Extraction<TSpace>, GroundkitError> {
        let mut objects = ObjectGroups::new();
        let mut relations = ObjectGroups::new();
        let mut last_name: Option<(SpanKind, &str)> = None;

        for span in self.spans(text) {
            let Some(payload) = span.box_payload() else {
                last_name = Some((span.kind, span.content));
                continue;
            };
            let boxes = payload.resolve::<TSpace>()?;
            match last_name {
                Some((SpanKind::Relation, key)) => relations.extend(key, boxes),
                Some((_, key)) => objects.extend(key, boxes),
                None => objects.extend(SENTINEL_KEY, boxes),
            }
        }

        Ok(Extraction { objects, relations })
    }

    /// Reference groupings only; see [`TagScanner::extract`].
    pub fn extract_objects<TSpace>(
        &self,
        text: &str,
    ) -> Result<ObjectGroups<TSpace>, GroundkitError> {
        Ok(self.extract(text)?.objects)
    }

    /// Renders groups as comma-joined `<ref>key</ref><box>[[..]]</box>` segments.
    pub fn render_objects<TSpace>(&self, groups: &ObjectGroups<TSpace>) -> String {
        groups
            .iter()
            .map(|g| {
                let payload: Vec<[i64; 4]> = g.boxes.iter().map(BBox::to_array).collect();
                let json = serde_json::to_string(&payload).unwrap_or_else(|_| "[]".to_string());
                format!(
                    "{}{}",
                    self.delimiters.reference.wrap(&g.key),
                    self.delimiters.bbox.wrap(&json)
                )
            })
            .collect::<Vec<_>>()
            .join(RENDER_SEPARATOR)
    }

    /// Rewrites every box span in place, leaving the surrounding text intact.
    ///
    /// # Errors
    /// Returns [`GroundkitError::MalformedBoxPayload`] if any payload does not
    /// parse; no partial rewrite is returned.
    pub fn rewrite_box_spans<TIn, TOut>(
        &self,
        text: &str,
        mut f: impl FnMut(&BBox<TIn>) -> BBox<TOut>,
    ) -> Result<String, GroundkitError> {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;

        for span in self.spans(text) {
            let Some(payload) = span.box_payload() else {
                continue;
            };
            let rewritten: Vec<[i64; 4]> = payload
                .resolve::<TIn>()?
                .iter()
                .map(|b| f(b).to_array())
                .collect();
            let json = serde_json::to_string(&rewritten).unwrap_or_else(|_| "[]".to_string());

            out.push_str(&text[cursor..span.range.start]);
            out.push_str(&self.delimiters.bbox.wrap(&json));
            cursor = span.range.end;
        }
        out.push_str(&text[cursor..]);

        Ok(out)
    }
}

/// [`TagScanner::extract_objects`] with the standard delimiters.
pub fn extract_objects<TSpace>(text: &str) -> Result<ObjectGroups<TSpace>, GroundkitError> {
    TagScanner::standard().extract_objects(text)
}

/// [`TagScanner::references`] with the standard delimiters.
pub fn extract_references(text: &str) -> Vec<&str> {
    TagScanner::standard().references(text)
}

/// [`TagScanner::render_objects`] with the standard delimiters.
pub fn render_objects<TSpace>(groups: &ObjectGroups<TSpace>) -> String {
    TagScanner::standard().render_objects(groups)
}

/// Fuzz-only entrypoint: scans, extracts, renders and rewrites `input`.
#[cfg(feature = "fuzzing")]
pub fn fuzz_scan_text(input: &str) -> Result<(), GroundkitError> {
    let scanner = TagScanner::standard();
    let groups = scanner.extract_objects::<crate::ir::Pixel>(input)?;
    let _ = scanner.render_objects(&groups);
    let _ = scanner
        .rewrite_box_spans::<crate::ir::Normalized, crate::ir::Normalized>(input, |b| *b)?;
    Ok(())
}
