use std::path::PathBuf;
use thiserror::Error;

/// The main error type for vocmap operations.
#[derive(Debug, Error)]
pub enum VocmapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest not found: {path}")]
    ManifestNotFound { path: PathBuf },

    #[error("Missing {kind} file: {path}")]
    MissingFile { kind: &'static str, path: PathBuf },

    #[error("Malformed manifest {path} at line {line}: {message}")]
    ManifestFormat {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Malformed annotation {path} at line {line}: {message}")]
    AnnotationFormat {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Unknown label '{label}' in {path} at line {line}")]
    UnknownLabel {
        path: PathBuf,
        line: usize,
        label: String,
    },

    #[error("Malformed detection results {path} at line {line}: {message}")]
    ResultsFormat {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error(
        "Detection {record} in {path} references image '{image_id}' outside the evaluated set"
    )]
    UnknownImageId {
        path: PathBuf,
        record: usize,
        image_id: String,
    },

    #[error(
        "Cannot stack sample {index}: shape {found_w}x{found_h}x{found_c} differs from {expected_w}x{expected_h}x{expected_c}"
    )]
    ShapeMismatch {
        index: usize,
        expected_w: u32,
        expected_h: u32,
        expected_c: u8,
        found_w: u32,
        found_h: u32,
        found_c: u8,
    },

    #[error("Index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid image dimensions {width}x{height} (must be positive)")]
    InvalidImageDimensions { width: u32, height: u32 },

    #[error("Failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Invalid class list: {message}")]
    ClassListInvalid { message: String },

    #[error("Failed to parse class list YAML from {path}: {source}")]
    ClassListYamlParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse config from {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to read ground-truth cache {path}: {source}")]
    CacheRead {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write ground-truth cache {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write JSON report {path}: {source}")]
    ReportJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write CSV report {path}: {source}")]
    ReportCsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid evaluation parameters: {message}")]
    InvalidEvalParams { message: String },

    #[error("Invalid sampling parameters: {message}")]
    InvalidSampleParams { message: String },

    #[error("Failed to scan {path} for annotations: {message}")]
    ManifestScan { path: PathBuf, message: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl VocmapError {
    /// Map a file-open failure to `MissingFile` when the file does not exist.
    pub(crate) fn open_failed(
        kind: &'static str,
        path: &std::path::Path,
        err: std::io::Error,
    ) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            VocmapError::MissingFile {
                kind,
                path: path.to_path_buf(),
            }
        } else {
            VocmapError::Io(err)
        }
    }
}
