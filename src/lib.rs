//! vocmap: a VOC-style detection dataset adapter and evaluator.
//!
//! vocmap reads images and `x1 y1 x2 y2 label` text annotations listed in
//! image-set manifests, produces normalized training targets and ragged
//! batches, writes per-class detection result files, and scores those files
//! with VOC Average Precision and mAP.
//!
//! # Modules
//!
//! - [`ir`]: Boxes, annotations, detections and the text formats built on them
//! - [`classes`]: The ordered class list shared by every component
//! - [`dataset`]: Dataset adapter, image decoding, transforms and batch sampling
//! - [`collate`]: Stacking samples into batches
//! - [`eval`]: Ground-truth cache, detection matching, AP and reports
//! - [`config`]: YAML run configuration for evaluation
//! - [`error`]: Error types for vocmap operations

pub mod classes;
pub mod collate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod eval;
pub mod ir;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

pub use error::VocmapError;

use classes::ClassList;
use config::RunConfig;
use dataset::{DatasetLayout, DetectionDataset};
use eval::{ApMetric, GroundTruthCache};

/// The vocmap CLI application.
#[derive(Parser)]
#[command(name = "vocmap")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Score per-class detection result files against ground truth.
    Eval(EvalArgs),
    /// Print the annotations of one dataset image as JSON.
    Annotations(AnnotationsArgs),
    /// Generate an image-set manifest from an annotation directory.
    Index(IndexArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Arguments for the eval subcommand.
#[derive(clap::Args)]
struct EvalArgs {
    /// Dataset root directory.
    #[arg(long, env = "VOCMAP_ROOT")]
    root: Option<PathBuf>,

    /// Image set (manifest name) to evaluate [default: test].
    #[arg(long)]
    set: Option<String>,

    /// Directory holding comp4_det_test_<class>.txt files
    /// [default: <root>/results/Main].
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Directory for result.csv, report.json and PR curves
    /// [default: the results directory].
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// IoU threshold for a true positive [default: 0.5].
    #[arg(long)]
    iou: Option<f64>,

    /// AP metric; overrides the one implied by --year.
    #[arg(long, value_enum)]
    metric: Option<ApMetric>,

    /// Challenge year; years before 2010 use the 11-point metric [default: 2007].
    #[arg(long)]
    year: Option<u32>,

    /// Class list file (text, one class per line, or YAML `names:`).
    #[arg(long)]
    classes: Option<PathBuf>,

    /// Persist parsed ground truth to this JSON file and reuse it.
    #[arg(long)]
    gt_cache: Option<PathBuf>,

    /// YAML run config; flags take precedence over its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format for the report.
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

/// Arguments for the annotations subcommand.
#[derive(clap::Args)]
struct AnnotationsArgs {
    /// Dataset root directory.
    #[arg(long, env = "VOCMAP_ROOT")]
    root: PathBuf,

    /// Image set (manifest name).
    #[arg(long, default_value = config::DEFAULT_IMAGE_SET)]
    set: String,

    /// Position of the image in the image set.
    #[arg(long)]
    index: usize,

    /// Normalize coordinates by the image size.
    #[arg(long)]
    normalize: bool,

    /// Class list file (text or YAML).
    #[arg(long)]
    classes: Option<PathBuf>,

    /// Image file extension.
    #[arg(long, default_value = "jpg")]
    image_ext: String,
}

/// Arguments for the index subcommand.
#[derive(clap::Args)]
struct IndexArgs {
    /// Directory to scan recursively for annotation files.
    #[arg(long)]
    ann_dir: PathBuf,

    /// Manifest file to write.
    #[arg(long)]
    output: PathBuf,

    /// Annotation file extension.
    #[arg(long, default_value = "txt")]
    ext: String,
}

/// Run the vocmap CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), VocmapError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Eval(args)) => run_eval(args),
        Some(Commands::Annotations(args)) => run_annotations(args),
        Some(Commands::Index(args)) => run_index(args),
        None => {
            println!("vocmap {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("VOC-style detection dataset adapter and evaluator.");
            println!();
            println!("Run 'vocmap --help' for usage information.");
            Ok(())
        }
    }
}

fn run_eval(args: EvalArgs) -> Result<(), VocmapError> {
    let file_config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    let flags = RunConfig {
        root: args.root,
        image_set: args.set,
        classes: args.classes,
        year: args.year,
        iou_threshold: args.iou,
        metric: args.metric,
        results_dir: args.results_dir,
        output_dir: args.output_dir,
        gt_cache: args.gt_cache,
        layout: None,
    };
    let settings = file_config.merged(flags).resolve()?;

    let dataset = DetectionDataset::open_with_layout(
        &settings.root,
        &[settings.image_set.as_str()],
        settings.classes,
        settings.layout,
    )?;
    let cache = match settings.gt_cache {
        Some(path) => GroundTruthCache::persisted(path),
        None => GroundTruthCache::new(),
    };

    let report = dataset.evaluate_results(
        &settings.results_dir,
        &settings.output_dir,
        settings.options,
        cache,
    )?;

    match args.format {
        OutputFormat::Json => println!("{}", to_json_pretty(&report)?),
        OutputFormat::Text => print!("{report}"),
    }
    Ok(())
}

#[derive(Serialize)]
struct AnnotationDump<'a> {
    image_id: String,
    normalized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<(u32, u32)>,
    annotations: Vec<AnnotationEntry<'a>>,
}

#[derive(Serialize)]
struct AnnotationEntry<'a> {
    label: usize,
    name: &'a str,
    bbox: [f64; 4],
}

fn run_annotations(args: AnnotationsArgs) -> Result<(), VocmapError> {
    let classes = match &args.classes {
        Some(path) => ClassList::from_file(path)?,
        None => ClassList::d2city(),
    };
    let layout = DatasetLayout {
        image_ext: args.image_ext,
        ..DatasetLayout::default()
    };
    let dataset = DetectionDataset::open_with_layout(&args.root, &[&args.set], classes, layout)?;

    let (image_id, annotations) = dataset.pull_anno(args.index)?;
    let size = if args.normalize {
        Some(dataset.image_dimensions(args.index)?)
    } else {
        None
    };

    let annotations = annotations
        .iter()
        .map(|ann| AnnotationEntry {
            label: ann.label,
            name: dataset.classes().name(ann.label).unwrap_or_default(),
            bbox: match size {
                Some((w, h)) => ann.bbox.to_normalized(w as f64, h as f64).to_array(),
                None => ann.bbox.to_array(),
            },
        })
        .collect();

    let dump = AnnotationDump {
        image_id,
        normalized: args.normalize,
        size,
        annotations,
    };
    println!("{}", to_json_pretty(&dump)?);
    Ok(())
}

fn run_index(args: IndexArgs) -> Result<(), VocmapError> {
    let count = ir::io_manifest::write_manifest_from_dir(&args.ann_dir, &args.ext, &args.output)?;
    println!("Wrote {} image ids to {}", count, args.output.display());
    Ok(())
}

fn to_json_pretty<T: Serialize>(value: &T) -> Result<String, VocmapError> {
    serde_json::to_string_pretty(value).map_err(|source| VocmapError::ReportJsonWrite {
        path: PathBuf::from("<stdout>"),
        source,
    })
}
