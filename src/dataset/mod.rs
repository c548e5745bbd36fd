//! Dataset-level driver: discovery, loading, conversion, split, and output.
//!
//! A source root holds one subdirectory per dataset; the subdirectory name is
//! the dataset name. Every `.json` file below a dataset directory is one raw
//! annotation record. Each dataset is converted and split completely before
//! its two JSONL files are written.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::conversion::{
    ConversionIssue, ConversionIssueCode, ConversionReport, ConvertOptions, RecordConverter,
    SourcedRecord,
};
use crate::error::GroundkitError;
use crate::ir::io_json::{read_raw_record, write_jsonl};
use crate::ir::{BoxScale, RawConversationRecord, UnifiedRecord};
use crate::split::{split_with_options, validate_split_options, DatasetSplit, SplitOptions};
use crate::tags::TagScanner;
use crate::validation::{
    validate_record, GroundingCheckOptions, IssueCode, IssueContext, ValidationIssue,
    ValidationReport,
};

const ANNOTATION_EXTENSION: &str = "json";

/// Options for converting whole datasets.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetOptions {
    pub convert: ConvertOptions,
    pub split: SplitOptions,
    /// Replace each record's image path with `<dataset_dir>/<basename>`.
    pub rebase_image_paths: bool,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            convert: ConvertOptions::default(),
            split: SplitOptions::default(),
            rebase_image_paths: true,
        }
    }
}

/// One dataset directory under the source root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetDir {
    pub name: String,
    pub path: PathBuf,
}

/// Output files written for one dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitPaths {
    pub train: PathBuf,
    pub validation: PathBuf,
}

/// Lists dataset subdirectories of `source`, sorted by name.
///
/// # Errors
/// Returns [`GroundkitError::DatasetLayout`] if `source` is not a directory or
/// has no subdirectories.
pub fn discover_datasets(source: &Path) -> Result<Vec<DatasetDir>, GroundkitError> {
    if !source.is_dir() {
        return Err(GroundkitError::DatasetLayout {
            path: source.to_path_buf(),
            message: "source is not a directory".to_string(),
        });
    }

    let mut datasets = Vec::new();
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        datasets.push(DatasetDir {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path(),
        });
    }

    if datasets.is_empty() {
        return Err(GroundkitError::DatasetLayout {
            path: source.to_path_buf(),
            message: "no dataset subdirectories found".to_string(),
        });
    }

    datasets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(datasets)
}

/// An annotation file found while walking a dataset directory.
#[derive(Debug)]
pub enum AnnotationFile {
    Found(PathBuf),
    /// The walk could not stat or descend into this entry.
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl AnnotationFile {
    pub fn path(&self) -> &Path {
        match self {
            AnnotationFile::Found(path) | AnnotationFile::Unreadable { path, .. } => path,
        }
    }

    /// Reads the raw record; an unreadable entry becomes [`GroundkitError::AnnotationRead`].
    pub fn read(self) -> Result<RawConversationRecord, GroundkitError> {
        match self {
            AnnotationFile::Found(path) => read_raw_record(&path),
            AnnotationFile::Unreadable { path, source } => {
                Err(GroundkitError::AnnotationRead { path, source })
            }
        }
    }
}

fn has_annotation_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ANNOTATION_EXTENSION))
}

/// Recursively collects annotation files under `dir`, sorted by path.
///
/// Entries the walk fails on (dangling links, unreadable subdirectories) are
/// returned as [`AnnotationFile::Unreadable`]; failures on entries with some
/// other extension are dropped.
///
/// # Errors
/// Returns [`GroundkitError::DatasetLayout`] if `dir` itself is missing or
/// unreadable.
pub fn collect_annotation_files(dir: &Path) -> Result<Vec<AnnotationFile>, GroundkitError> {
    if !dir.is_dir() {
        return Err(GroundkitError::DatasetLayout {
            path: dir.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(GroundkitError::DatasetLayout {
                    path: dir.to_path_buf(),
                    message: format!("failed while traversing directory: {err}"),
                });
            }
            Err(err) => {
                let path = err.path().unwrap_or(dir).to_path_buf();
                if path.extension().is_some() && !has_annotation_extension(&path) {
                    continue;
                }
                tracing::debug!(path = %path.display(), "walk error: {err}");
                files.push(AnnotationFile::Unreadable {
                    path,
                    source: err.into(),
                });
                continue;
            }
        };

        if entry.file_type().is_file() && has_annotation_extension(entry.path()) {
            files.push(AnnotationFile::Found(entry.path().to_path_buf()));
        }
    }

    Ok(files)
}

/// Joins the basename of `image` onto `dataset_dir`.
///
/// Images without a file name component are returned unchanged.
pub fn rebase_image_path(dataset_dir: &Path, image: &str) -> String {
    match Path::new(image).file_name() {
        Some(name) => dataset_dir.join(name).to_string_lossy().into_owned(),
        None => image.to_string(),
    }
}

/// File identity used in logs and reports: the path relative to `root`.
fn source_identity(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// Reads every annotation file of a dataset; read failures stay per-file.
pub fn load_dataset(
    dataset: &DatasetDir,
    rebase_image_paths: bool,
) -> Result<Vec<SourcedRecord>, GroundkitError> {
    let files = collect_annotation_files(&dataset.path)?;

    Ok(files
        .into_iter()
        .map(|file| {
            let identity = source_identity(&dataset.path, file.path());
            let record = file.read().map(|mut record| {
                if rebase_image_paths {
                    record.image = rebase_image_path(&dataset.path, &record.image);
                }
                record
            });
            SourcedRecord::new(identity, record)
        })
        .collect())
}

/// Converts and splits one dataset.
pub fn convert_dataset(
    dataset: &DatasetDir,
    converter: &RecordConverter,
    opts: &DatasetOptions,
) -> Result<(DatasetSplit<UnifiedRecord>, ConversionReport), GroundkitError> {
    let inputs = load_dataset(dataset, opts.rebase_image_paths)?;
    let batch = converter.convert_batch(inputs);

    let mut report = batch.report;
    report.dataset = dataset.name.clone();

    let split = split_with_options(batch.records, &opts.split)?;
    report.counts.train_records = split.train.len();
    report.counts.val_records = split.validation.len();

    if opts.split.seed.is_none() && split.len() > 1 {
        report.add(ConversionIssue::info(
            ConversionIssueCode::UnseededShuffle,
            "shuffle was not seeded; pass --seed for a reproducible split",
        ));
    }

    Ok((split, report))
}

/// Writes `{name}_train.jsonl` and `{name}_val.jsonl` into `output_dir`.
pub fn write_split(
    output_dir: &Path,
    name: &str,
    split: &DatasetSplit<UnifiedRecord>,
) -> Result<SplitPaths, GroundkitError> {
    let paths = SplitPaths {
        train: output_dir.join(format!("{name}_train.jsonl")),
        validation: output_dir.join(format!("{name}_val.jsonl")),
    };

    write_jsonl(&paths.train, &split.train)?;
    write_jsonl(&paths.validation, &split.validation)?;

    Ok(paths)
}

/// Converts every dataset under `source` and writes the splits to `output`.
///
/// Returns one report per dataset, in dataset name order.
pub fn process_all(
    source: &Path,
    output: &Path,
    opts: &DatasetOptions,
) -> Result<Vec<ConversionReport>, GroundkitError> {
    validate_split_options(&opts.split)?;
    let converter = RecordConverter::new(opts.convert.clone())?;
    let datasets = discover_datasets(source)?;

    let mut reports = Vec::with_capacity(datasets.len());
    for dataset in &datasets {
        let (split, report) = convert_dataset(dataset, &converter, opts)?;
        let paths = write_split(output, &dataset.name, &split)?;

        tracing::info!(
            dataset = %dataset.name,
            files = report.counts.files,
            skipped = report.counts.skipped_files,
            train = split.train.len(),
            validation = split.validation.len(),
            "wrote {} and {}",
            paths.train.display(),
            paths.validation.display()
        );
        reports.push(report);
    }

    Ok(reports)
}

/// Checks every annotation file under `source` without converting.
///
/// Unreadable files are reported as errors rather than aborting the check.
pub fn check_annotations(
    source: &Path,
    scanner: &TagScanner,
    opts: &GroundingCheckOptions,
    scale: BoxScale,
) -> Result<ValidationReport, GroundkitError> {
    let mut report = ValidationReport::new();
    for file in collect_annotation_files(source)? {
        let identity = source_identity(source, file.path());
        match file.read() {
            Ok(record) => validate_record(&identity, &record, scanner, opts, scale, &mut report),
            Err(err) => {
                report.add(ValidationIssue::error(
                    IssueCode::UnreadableAnnotationFile,
                    err.to_string(),
                    IssueContext::File { source: identity },
                ));
                report.files_checked += 1;
            }
        }
    }

    Ok(report)
}
