//! JSON input and JSON Lines output.
//!
//! Raw annotation files hold one [`RawConversationRecord`] each. Converted
//! records are written one compact JSON object per line, non-ASCII text kept
//! as-is.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use super::model::{RawConversationRecord, UnifiedRecord};
use crate::error::GroundkitError;

/// Reads one raw annotation file.
///
/// # Errors
/// Returns [`GroundkitError::AnnotationRead`] if the file cannot be opened and
/// [`GroundkitError::AnnotationParse`] if it is not a valid record.
pub fn read_raw_record(path: &Path) -> Result<RawConversationRecord, GroundkitError> {
    let file = File::open(path).map_err(|source| GroundkitError::AnnotationRead {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| GroundkitError::AnnotationParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a raw record from bytes.
///
/// Useful for fuzzing and testing without file I/O.
pub fn raw_record_from_slice(bytes: &[u8]) -> Result<RawConversationRecord, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Writes records as JSON Lines, replacing any existing file.
///
/// # Errors
/// Returns [`GroundkitError::JsonlWrite`] on serialization failure and
/// [`GroundkitError::Io`] on filesystem failure.
pub fn write_jsonl(path: &Path, records: &[UnifiedRecord]) -> Result<(), GroundkitError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(GroundkitError::Io)?;
    }
    let file = File::create(path).map_err(GroundkitError::Io)?;
    let mut writer = BufWriter::new(file);

    for record in records {
        serde_json::to_writer(&mut writer, record).map_err(|source| {
            GroundkitError::JsonlWrite {
                path: path.to_path_buf(),
                source,
            }
        })?;
        writer.write_all(b"\n").map_err(GroundkitError::Io)?;
    }

    writer.flush().map_err(GroundkitError::Io)
}

/// Serializes records to a JSON Lines string.
///
/// Useful for testing without file I/O.
pub fn to_jsonl_string(records: &[UnifiedRecord]) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BBox, TargetObject};

    #[test]
    fn jsonl_has_one_record_per_line() {
        let records = vec![
            UnifiedRecord::qa("这是什么?", "一只猫", "a.jpg"),
            UnifiedRecord::grounding(
                "找到 <ref-object>",
                "<bbox>",
                "b.jpg",
                vec![TargetObject::new("猫", vec![BBox::from_xyxy(1, 2, 3, 4)])],
            ),
        ];

        let text = to_jsonl_string(&records).expect("serialize");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("一只猫"));

        let restored: UnifiedRecord = serde_json::from_str(lines[1]).expect("parse line");
        assert_eq!(restored, records[1]);
    }

    #[test]
    fn write_and_read_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("out.jsonl");
        let records = vec![UnifiedRecord::qa("q", "a", "x.jpg")];

        write_jsonl(&path, &records).expect("write");
        let text = std::fs::read_to_string(&path).expect("read");
        assert_eq!(text, "{\"query\":\"q\",\"response\":\"a\",\"images\":[\"x.jpg\"]}\n");
    }

    #[test]
    fn unreadable_file_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").expect("write");

        match read_raw_record(&path) {
            Err(GroundkitError::AnnotationParse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
