//! Core records shared by the dataset adapter, result files and evaluator.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::bbox::BBoxXYXY;
use super::space::{Normalized, Pixel};

/// One labelled box from an annotation file.
///
/// `label` indexes into the [`ClassList`](crate::classes::ClassList) the
/// annotation was parsed against.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Annotation<TSpace> {
    pub bbox: BBoxXYXY<TSpace>,
    pub label: usize,
}

impl<TSpace> Annotation<TSpace> {
    pub fn new(bbox: BBoxXYXY<TSpace>, label: usize) -> Self {
        Self { bbox, label }
    }

    /// `[xmin, ymin, xmax, ymax, label]` as consumed by training targets.
    pub fn to_row(&self) -> [f32; 5] {
        [
            self.bbox.xmin() as f32,
            self.bbox.ymin() as f32,
            self.bbox.xmax() as f32,
            self.bbox.ymax() as f32,
            self.label as f32,
        ]
    }
}

/// Normalized annotations for one image, the unit the collator keeps ragged.
pub type TargetArray = Vec<Annotation<Normalized>>;

/// An image addressed by dataset root and manifest id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRecord {
    root: PathBuf,
    id: String,
}

impl ImageRecord {
    pub fn new(root: impl Into<PathBuf>, id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            id: id.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The relative id used as the key for annotations and detections.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// A model output for one image and one class, in 0-based pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BBoxXYXY<Pixel>,
    pub score: f64,
}

impl Detection {
    pub fn new(bbox: BBoxXYXY<Pixel>, score: f64) -> Self {
        Self { bbox, score }
    }
}

/// Per-class, per-image detections: `table[class_index][image_index]`.
///
/// Row 0 belongs to the background class and is never written out.
#[derive(Clone, Debug, Default)]
pub struct DetectionTable {
    rows: Vec<Vec<Vec<Detection>>>,
}

impl DetectionTable {
    /// An empty table for `num_classes` classes and `num_images` images.
    pub fn new(num_classes: usize, num_images: usize) -> Self {
        Self {
            rows: vec![vec![Vec::new(); num_images]; num_classes],
        }
    }

    pub fn num_classes(&self) -> usize {
        self.rows.len()
    }

    pub fn num_images(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Detections for one class and image; empty when out of range.
    pub fn get(&self, class_index: usize, image_index: usize) -> &[Detection] {
        self.rows
            .get(class_index)
            .and_then(|row| row.get(image_index))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Appends a detection, growing the table if needed.
    pub fn push(&mut self, class_index: usize, image_index: usize, detection: Detection) {
        if self.rows.len() <= class_index {
            self.rows.resize_with(class_index + 1, Vec::new);
        }
        let width = self.num_images().max(image_index + 1);
        for row in &mut self.rows {
            if row.len() < width {
                row.resize_with(width, Vec::new);
            }
        }
        self.rows[class_index][image_index].push(detection);
    }
}

/// One line of a per-class result file, coordinates as written (1-based).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub image_id: String,
    pub score: f64,
    pub bbox: BBoxXYXY<Pixel>,
}
