//! Reader for per-image text annotations.
//!
//! Each line holds one object as `x1 y1 x2 y2 label`, with 1-based pixel
//! coordinates. Coordinates are truncated to integers, shifted to a 0-based
//! origin and optionally divided by the image size.
//!
//! ```text
//! 12 40 118 96 car
//! 200 31 260 180 person
//! ```

use std::fs;
use std::path::Path;

use super::{Annotation, BBoxXYXY, Normalized, Pixel};
use crate::classes::ClassList;
use crate::error::VocmapError;

/// Reads annotations normalized to `[0,1]` by the image size.
///
/// # Errors
/// `MissingFile` if the file does not exist, `InvalidImageDimensions` for a
/// zero width or height, `AnnotationFormat` / `UnknownLabel` for bad lines.
pub fn read_normalized_annotations(
    path: &Path,
    classes: &ClassList,
    width: u32,
    height: u32,
) -> Result<Vec<Annotation<Normalized>>, VocmapError> {
    if width == 0 || height == 0 {
        return Err(VocmapError::InvalidImageDimensions { width, height });
    }
    let content = read_content(path)?;
    parse_annotation_str(&content, path, classes, width as f64, height as f64)
}

/// Reads annotations as 0-based pixel coordinates (no normalization).
pub fn read_pixel_annotations(
    path: &Path,
    classes: &ClassList,
) -> Result<Vec<Annotation<Pixel>>, VocmapError> {
    let content = read_content(path)?;
    parse_annotation_str(&content, path, classes, 1.0, 1.0)
}

/// Parses annotation file content.
///
/// `path` is only used for error messages. `scale_x = scale_y = 1.0` keeps
/// pixel coordinates.
pub fn parse_annotation_str<TSpace>(
    content: &str,
    path: &Path,
    classes: &ClassList,
    scale_x: f64,
    scale_y: f64,
) -> Result<Vec<Annotation<TSpace>>, VocmapError> {
    let mut annotations = Vec::new();
    for (line_idx, line) in content.lines().enumerate() {
        if let Some(annotation) =
            parse_annotation_line(line, path, line_idx + 1, classes, scale_x, scale_y)?
        {
            annotations.push(annotation);
        }
    }
    Ok(annotations)
}

fn read_content(path: &Path) -> Result<String, VocmapError> {
    fs::read_to_string(path).map_err(|err| VocmapError::open_failed("annotation", path, err))
}

fn parse_annotation_line<TSpace>(
    line: &str,
    path: &Path,
    line_num: usize,
    classes: &ClassList,
    scale_x: f64,
    scale_y: f64,
) -> Result<Option<Annotation<TSpace>>, VocmapError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().take(5).collect();
    if tokens.len() < 5 {
        return Err(VocmapError::AnnotationFormat {
            path: path.to_path_buf(),
            line: line_num,
            message: format!("expected 5 fields (x1 y1 x2 y2 label), found {}", tokens.len()),
        });
    }

    let mut coords = [0.0f64; 4];
    for (i, raw) in tokens[..4].iter().enumerate() {
        let value = parse_pixel(raw, path, line_num)?;
        let scale = if i % 2 == 0 { scale_x } else { scale_y };
        coords[i] = (value - 1.0) / scale;
    }

    let bbox = BBoxXYXY::<TSpace>::from_array(coords);
    if !bbox.is_ordered() {
        return Err(VocmapError::AnnotationFormat {
            path: path.to_path_buf(),
            line: line_num,
            message: format!(
                "box ({}, {}, {}, {}) has min greater than max",
                tokens[0], tokens[1], tokens[2], tokens[3]
            ),
        });
    }

    let label = classes
        .index_of(tokens[4])
        .ok_or_else(|| VocmapError::UnknownLabel {
            path: path.to_path_buf(),
            line: line_num,
            label: tokens[4].to_string(),
        })?;

    Ok(Some(Annotation::new(bbox, label)))
}

/// Parses a coordinate and truncates it toward zero.
fn parse_pixel(raw: &str, path: &Path, line_num: usize) -> Result<f64, VocmapError> {
    let value = raw
        .parse::<f64>()
        .map_err(|_| VocmapError::AnnotationFormat {
            path: path.to_path_buf(),
            line: line_num,
            message: format!("invalid coordinate '{raw}'; expected a number"),
        })?;

    if !value.is_finite() {
        return Err(VocmapError::AnnotationFormat {
            path: path.to_path_buf(),
            line: line_num,
            message: format!("coordinate '{raw}' is not finite"),
        });
    }

    Ok(value.trunc())
}

/// Fuzz-only entrypoint for single-line annotation parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_annotation_line(input: &str) -> Result<(), VocmapError> {
    let classes = ClassList::d2city();
    let path = Path::new("<fuzz>");
    let _ = parse_annotation_line::<Normalized>(input, path, 1, &classes, 640.0, 480.0)?;
    Ok(())
}
