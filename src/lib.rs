//! Groundkit: normalizes tag-annotated multimodal conversations into training records.
//!
//! Raw annotation files hold an image and a human/assistant conversation.
//! Answers may localize objects inline with `<ref>`, `<box>`, and `<pred>`
//! tags whose boxes live on a normalized `[0, 999]` grid. Groundkit checks
//! those answers against their questions, restores the boxes to pixel
//! coordinates, and writes one unified record stream per dataset split.
//!
//! # Modules
//!
//! - [`ir`]: Record types, typed boxes, and the coordinate transform
//! - [`tags`]: Inline tag scanning and rendering
//! - [`validation`]: Grounding consistency checks and the check report
//! - [`conversion`]: Raw record to unified record conversion
//! - [`split`]: Train/validation partitioning
//! - [`dataset`]: Directory-level driver
//! - [`error`]: Error types for groundkit operations

pub mod conversion;
pub mod dataset;
pub mod error;
pub mod ir;
pub mod split;
pub mod tags;
pub mod validation;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

pub use error::GroundkitError;

use conversion::ConvertOptions;
use dataset::DatasetOptions;
use ir::{BoxScale, DEFAULT_BOX_SCALE};
use split::{SplitOptions, DEFAULT_SPLIT_RATIO};
use tags::TagScanner;
use validation::GroundingCheckOptions;

/// The groundkit CLI application.
#[derive(Parser)]
#[command(name = "groundkit")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Convert every dataset under a source directory into train/val JSONL files.
    Convert(ConvertArgs),
    /// Check annotation files for errors and warnings without converting.
    Check(CheckArgs),
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

/// Arguments for the convert subcommand.
#[derive(clap::Args)]
struct ConvertArgs {
    /// Source directory with one subdirectory per dataset.
    source: PathBuf,

    /// Directory for the `{dataset}_train.jsonl` and `{dataset}_val.jsonl` files.
    #[arg(short, long)]
    output: PathBuf,

    /// Fraction of records assigned to the training split, in (0, 1).
    #[arg(long, env = "GROUNDKIT_SPLIT_RATIO", default_value_t = DEFAULT_SPLIT_RATIO)]
    split_ratio: f64,

    /// Upper bound of the normalized box grid.
    #[arg(long, env = "GROUNDKIT_BOX_SCALE", default_value_t = DEFAULT_BOX_SCALE)]
    box_scale: u32,

    /// Seed for a reproducible train/val shuffle.
    #[arg(long)]
    seed: Option<u64>,

    /// Answer substring marking "nothing found" (repeatable; replaces the defaults).
    #[arg(long = "absence-marker", value_name = "TEXT")]
    absence_markers: Vec<String>,

    /// Leave box spans in plain QA turns untouched.
    #[arg(long)]
    keep_region_boxes: bool,

    /// Keep image paths as written in the annotation files.
    #[arg(long)]
    keep_image_paths: bool,

    /// Output format for the conversion report.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,
}

/// Arguments for the check subcommand.
#[derive(clap::Args)]
struct CheckArgs {
    /// Directory searched recursively for annotation files.
    source: PathBuf,

    /// Upper bound of the normalized box grid.
    #[arg(long, env = "GROUNDKIT_BOX_SCALE", default_value_t = DEFAULT_BOX_SCALE)]
    box_scale: u32,

    /// Answer substring marking "nothing found" (repeatable; replaces the defaults).
    #[arg(long = "absence-marker", value_name = "TEXT")]
    absence_markers: Vec<String>,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    output: ReportFormat,
}

/// Run the groundkit CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), GroundkitError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Convert(args)) => run_convert(args),
        Some(Commands::Check(args)) => run_check(args),
        None => {
            println!("groundkit {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Normalizes grounding annotations into training records.");
            println!();
            println!("Run 'groundkit --help' for usage information.");
            Ok(())
        }
    }
}

fn grounding_options(absence_markers: Vec<String>) -> GroundingCheckOptions {
    if absence_markers.is_empty() {
        GroundingCheckOptions::default()
    } else {
        GroundingCheckOptions { absence_markers }
    }
}

/// Execute the convert subcommand.
fn run_convert(args: ConvertArgs) -> Result<(), GroundkitError> {
    let opts = DatasetOptions {
        convert: ConvertOptions {
            box_scale: BoxScale::new(args.box_scale)?,
            grounding: grounding_options(args.absence_markers),
            rescale_region_boxes: !args.keep_region_boxes,
            ..Default::default()
        },
        split: SplitOptions {
            ratio: args.split_ratio,
            seed: args.seed,
        },
        rebase_image_paths: !args.keep_image_paths,
    };

    let reports = dataset::process_all(&args.source, &args.output, &opts)?;

    match args.report {
        ReportFormat::Json => {
            let json =
                serde_json::to_string_pretty(&reports).map_err(GroundkitError::ReportSerialize)?;
            println!("{}", json);
        }
        ReportFormat::Text => {
            for report in &reports {
                print!("{}", report);
            }
            let skipped: usize = reports.iter().map(|r| r.counts.skipped_files).sum();
            let emitted: usize = reports.iter().map(|r| r.counts.emitted_records).sum();
            println!(
                "Converted {} dataset(s): {} record(s) written, {} file(s) skipped",
                reports.len(),
                emitted,
                skipped
            );
        }
    }

    Ok(())
}

/// Execute the check subcommand.
fn run_check(args: CheckArgs) -> Result<(), GroundkitError> {
    let scale = BoxScale::new(args.box_scale)?;
    let opts = grounding_options(args.absence_markers);
    let report = dataset::check_annotations(&args.source, TagScanner::standard(), &opts, scale)?;

    match args.output {
        ReportFormat::Json => {
            let json =
                serde_json::to_string_pretty(&report).map_err(GroundkitError::ReportSerialize)?;
            println!("{}", json);
        }
        ReportFormat::Text => print!("{}", report),
    }

    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (args.strict && has_warnings) {
        Err(GroundkitError::CheckFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}
