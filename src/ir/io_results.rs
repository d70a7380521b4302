//! Per-class detection result files.
//!
//! One file per foreground class, one detection per line:
//!
//! ```text
//! <image_id> <score:.3> <x1:.1> <y1:.1> <x2:.1> <y2:.1>
//! ```
//!
//! Coordinates are written 1-based (the inverse of the annotation reader's
//! `-1` shift).

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{BBoxXYXY, Detection, DetectionRecord, DetectionTable, ImageRecord, Pixel};
use crate::classes::ClassList;
use crate::error::VocmapError;

/// Default results directory under the dataset root.
pub const DEFAULT_RESULTS_DIR: &str = "results/Main";

const RESULTS_PREFIX: &str = "comp4_det_test_";

/// `<dir>/comp4_det_test_<class>.txt`
pub fn results_file_path(dir: &Path, class_name: &str) -> PathBuf {
    dir.join(format!("{RESULTS_PREFIX}{class_name}.txt"))
}

/// Expected result file of every foreground class, in class order.
pub fn class_result_files(dir: &Path, classes: &ClassList) -> Vec<(String, PathBuf)> {
    classes
        .foreground()
        .map(|(_, name)| (name.to_string(), results_file_path(dir, name)))
        .collect()
}

/// Writes the detections of one class.
///
/// `detections_by_image` pairs each image id with that image's detections
/// for the class; images without detections produce no lines. The file is
/// created (with parent directories) or truncated.
pub fn write_class_results<'a, I>(
    dir: &Path,
    class_name: &str,
    detections_by_image: I,
) -> Result<PathBuf, VocmapError>
where
    I: IntoIterator<Item = (&'a str, &'a [Detection])>,
{
    fs::create_dir_all(dir)?;
    let path = results_file_path(dir, class_name);
    let mut writer = BufWriter::new(File::create(&path)?);

    let mut lines = 0usize;
    for (image_id, detections) in detections_by_image {
        for detection in detections {
            writer.write_all(format_result_line(image_id, detection).as_bytes())?;
            writer.write_all(b"\n")?;
            lines += 1;
        }
    }
    writer.flush()?;

    debug!(class = class_name, detections = lines, path = %path.display(), "wrote results file");
    Ok(path)
}

/// Writes one results file per foreground class from a detection table.
///
/// `images[i]` names column `i` of the table. Returns `(class, path)` pairs
/// in class order.
pub fn write_all_results(
    dir: &Path,
    classes: &ClassList,
    images: &[ImageRecord],
    table: &DetectionTable,
) -> Result<Vec<(String, PathBuf)>, VocmapError> {
    let mut written = Vec::with_capacity(classes.len().saturating_sub(1));
    for (class_index, class_name) in classes.foreground() {
        info!(class = class_name, "writing VOC results file");
        let rows = images
            .iter()
            .enumerate()
            .map(|(image_index, record)| (record.id(), table.get(class_index, image_index)));
        let path = write_class_results(dir, class_name, rows)?;
        written.push((class_name.to_string(), path));
    }
    Ok(written)
}

/// Formats one result line (without newline), shifting the box to 1-based.
pub fn format_result_line(image_id: &str, detection: &Detection) -> String {
    let b = detection.bbox.to_one_based();
    format!(
        "{} {:.3} {:.1} {:.1} {:.1} {:.1}",
        image_id,
        detection.score,
        b.xmin(),
        b.ymin(),
        b.xmax(),
        b.ymax()
    )
}

/// Reads a results file back into records (coordinates stay 1-based).
pub fn read_class_results(path: &Path) -> Result<Vec<DetectionRecord>, VocmapError> {
    let content = fs::read_to_string(path)
        .map_err(|err| VocmapError::open_failed("detection results", path, err))?;
    parse_results_str(&content, path)
}

/// Parses results file content; `path` is only used in errors.
pub fn parse_results_str(content: &str, path: &Path) -> Result<Vec<DetectionRecord>, VocmapError> {
    let mut records = Vec::new();
    for (line_idx, line) in content.lines().enumerate() {
        if let Some(record) = parse_result_line(line, path, line_idx + 1)? {
            records.push(record);
        }
    }
    Ok(records)
}

fn parse_result_line(
    line: &str,
    path: &Path,
    line_num: usize,
) -> Result<Option<DetectionRecord>, VocmapError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // Take at most 7 tokens so one oversized line cannot allocate unbounded memory.
    let tokens: Vec<&str> = trimmed.split_whitespace().take(7).collect();
    if tokens.len() != 6 {
        let message = if tokens.len() > 6 {
            "too many fields; expected image_id score x1 y1 x2 y2".to_string()
        } else {
            format!(
                "expected 6 fields (image_id score x1 y1 x2 y2), found {}",
                tokens.len()
            )
        };
        return Err(VocmapError::ResultsFormat {
            path: path.to_path_buf(),
            line: line_num,
            message,
        });
    }

    let mut values = [0.0f64; 5];
    for (slot, raw) in values.iter_mut().zip(&tokens[1..]) {
        *slot = raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| VocmapError::ResultsFormat {
                path: path.to_path_buf(),
                line: line_num,
                message: format!("invalid number '{raw}'"),
            })?;
    }

    Ok(Some(DetectionRecord {
        image_id: tokens[0].to_string(),
        score: values[0],
        bbox: BBoxXYXY::<Pixel>::from_xyxy(values[1], values[2], values[3], values[4]),
    }))
}

/// Fuzz-only entrypoint for single-line result parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_result_line(input: &str) -> Result<(), VocmapError> {
    let _ = parse_result_line(input, Path::new("<fuzz>"), 1)?;
    Ok(())
}
