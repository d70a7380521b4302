//! Geometry and record types plus the text formats built on them.
//!
//! Boxes carry their coordinate space in the type: `BBoxXYXY<Pixel>` for
//! 0-based pixel boxes (ground truth for evaluation, detections) and
//! `BBoxXYXY<Normalized>` for training targets. The two cannot be mixed by
//! accident.
//!
//! # Example
//!
//! ```
//! use vocmap::ir::{Annotation, BBoxXYXY, Pixel};
//!
//! let gt = Annotation::new(BBoxXYXY::<Pixel>::from_xyxy(0.0, 0.0, 10.0, 10.0), 1);
//! let target = Annotation::new(gt.bbox.to_normalized(100.0, 50.0), gt.label);
//! assert_eq!(target.bbox.to_array(), [0.0, 0.0, 0.1, 0.2]);
//! ```

mod bbox;
pub mod io_annotation_txt;
pub mod io_manifest;
pub mod io_results;
mod model;
mod space;

pub use bbox::BBoxXYXY;
pub use io_manifest::DatasetIndex;
pub use model::{
    Annotation, Detection, DetectionRecord, DetectionTable, ImageRecord, TargetArray,
};
pub use space::{Normalized, Pixel};
