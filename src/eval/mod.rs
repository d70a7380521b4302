//! VOC-style detection evaluation.
//!
//! For each foreground class, detections from the class's result file are
//! ranked by score and greedily matched against ground-truth boxes of the
//! same image. Cumulative true/false positives give a precision/recall curve
//! from which Average Precision is computed; mAP is the mean over classes.
//!
//! Ground truth is read once per run through a [`GroundTruthCache`] and
//! shared by all classes.

mod report;

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classes::ClassList;
use crate::error::VocmapError;
use crate::ir::io_annotation_txt::read_pixel_annotations;
use crate::ir::io_results::read_class_results;
use crate::ir::{Annotation, BBoxXYXY, DetectionRecord, Pixel};

pub use report::{ClassAp, EvalReport, PrCurve};

/// How AP is integrated over the precision/recall curve.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ApMetric {
    /// VOC2007 11-point interpolation.
    #[default]
    Voc07,
    /// VOC2010+ area under the precision envelope.
    Continuous,
}

impl ApMetric {
    /// VOC challenges before 2010 used the 11-point metric.
    pub fn for_year(year: u32) -> Self {
        if year < 2010 {
            ApMetric::Voc07
        } else {
            ApMetric::Continuous
        }
    }
}

impl fmt::Display for ApMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApMetric::Voc07 => write!(f, "voc07"),
            ApMetric::Continuous => write!(f, "continuous"),
        }
    }
}

/// Parameters of one evaluation run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvalOptions {
    pub iou_threshold: f64,
    pub metric: ApMetric,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            iou_threshold: 0.5,
            metric: ApMetric::Voc07,
        }
    }
}

impl EvalOptions {
    /// Checks that the IoU threshold lies in `(0, 1]`.
    pub fn validate(&self) -> Result<(), VocmapError> {
        if !(self.iou_threshold > 0.0 && self.iou_threshold <= 1.0) {
            return Err(VocmapError::InvalidEvalParams {
                message: format!(
                    "IoU threshold must be in (0, 1], got {}",
                    self.iou_threshold
                ),
            });
        }
        Ok(())
    }
}

/// Where ground-truth annotation files live.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationSource {
    pub dir: PathBuf,
    pub extension: String,
}

impl AnnotationSource {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    /// `<dir>/<image_id>.<extension>`
    pub fn path_for(&self, image_id: &str) -> PathBuf {
        self.dir.join(format!("{image_id}.{}", self.extension))
    }
}

/// Pixel-space (0-based) ground truth for a set of images.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    source: AnnotationSource,
    classes: Vec<String>,
    image_ids: Vec<String>,
    boxes: HashMap<String, Vec<Annotation<Pixel>>>,
}

impl GroundTruth {
    /// Ground truth from already parsed annotations, in image order.
    pub fn new(
        source: AnnotationSource,
        classes: &ClassList,
        images: Vec<(String, Vec<Annotation<Pixel>>)>,
    ) -> Self {
        let image_ids = images.iter().map(|(id, _)| id.clone()).collect();
        Self {
            source,
            classes: classes.names().to_vec(),
            image_ids,
            boxes: images.into_iter().collect(),
        }
    }

    /// Reads the annotation file of every image id.
    pub fn load(
        source: &AnnotationSource,
        image_ids: &[String],
        classes: &ClassList,
    ) -> Result<Self, VocmapError> {
        let mut boxes = HashMap::with_capacity(image_ids.len());
        for (i, image_id) in image_ids.iter().enumerate() {
            if boxes.contains_key(image_id) {
                continue;
            }
            let annotations = read_pixel_annotations(&source.path_for(image_id), classes)?;
            boxes.insert(image_id.clone(), annotations);
            if (i + 1) % 1000 == 0 {
                debug!(read = i + 1, total = image_ids.len(), "reading annotations");
            }
        }

        Ok(Self {
            source: source.clone(),
            classes: classes.names().to_vec(),
            image_ids: image_ids.to_vec(),
            boxes,
        })
    }

    pub fn source(&self) -> &AnnotationSource {
        &self.source
    }

    pub fn image_ids(&self) -> &[String] {
        &self.image_ids
    }

    /// Annotations of one image; `None` if the image is not in the set.
    pub fn annotations(&self, image_id: &str) -> Option<&[Annotation<Pixel>]> {
        self.boxes.get(image_id).map(Vec::as_slice)
    }

    /// Whether this ground truth was built from the same inputs.
    fn matches(
        &self,
        source: &AnnotationSource,
        image_ids: &[String],
        classes: &ClassList,
    ) -> bool {
        self.source == *source && self.image_ids == image_ids && self.classes == classes.names()
    }

    /// Reads ground truth persisted with [`GroundTruth::save_json`].
    pub fn load_json(path: &Path) -> Result<Self, VocmapError> {
        let file = File::open(path).map_err(VocmapError::Io)?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| VocmapError::CacheRead {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_json(&self, path: &Path) -> Result<(), VocmapError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path).map_err(VocmapError::Io)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self).map_err(|source| VocmapError::CacheWrite {
            path: path.to_path_buf(),
            source,
        })?;
        writer.flush().map_err(VocmapError::Io)?;
        Ok(())
    }
}

/// Ground truth loaded during one run, keyed by annotation directory.
///
/// With a persistence path, a cache file from an earlier run is reused when
/// it was built from the same directory, image ids and class list, and
/// rewritten otherwise.
#[derive(Debug, Default)]
pub struct GroundTruthCache {
    entries: HashMap<PathBuf, GroundTruth>,
    persist_path: Option<PathBuf>,
}

impl GroundTruthCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache that also reads and writes `path`.
    pub fn persisted(path: impl Into<PathBuf>) -> Self {
        Self {
            entries: HashMap::new(),
            persist_path: Some(path.into()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the ground truth for `source`, loading it at most once.
    pub fn get_or_load(
        &mut self,
        source: &AnnotationSource,
        image_ids: &[String],
        classes: &ClassList,
    ) -> Result<&GroundTruth, VocmapError> {
        let fresh = self
            .entries
            .get(&source.dir)
            .is_some_and(|gt| gt.matches(source, image_ids, classes));

        if !fresh {
            let gt = self.load_uncached(source, image_ids, classes)?;
            self.entries.insert(source.dir.clone(), gt);
        } else {
            debug!(source = %source.dir.display(), "ground truth already in memory");
        }

        self.entries
            .get(&source.dir)
            .ok_or_else(|| VocmapError::InvalidEvalParams {
                message: format!("ground truth for {} was not loaded", source.dir.display()),
            })
    }

    fn load_uncached(
        &self,
        source: &AnnotationSource,
        image_ids: &[String],
        classes: &ClassList,
    ) -> Result<GroundTruth, VocmapError> {
        if let Some(path) = &self.persist_path {
            if path.is_file() {
                match GroundTruth::load_json(path) {
                    Ok(gt) if gt.matches(source, image_ids, classes) => {
                        info!(cache = %path.display(), "loaded ground truth from cache");
                        return Ok(gt);
                    }
                    Ok(_) => {
                        info!(cache = %path.display(), "ground-truth cache is stale, rebuilding");
                    }
                    Err(err) => {
                        warn!(
                            cache = %path.display(),
                            error = %err,
                            "ignoring unreadable ground-truth cache"
                        );
                    }
                }
            }
        }

        info!(
            source = %source.dir.display(),
            images = image_ids.len(),
            "reading ground-truth annotations"
        );
        let gt = GroundTruth::load(source, image_ids, classes)?;

        if let Some(path) = &self.persist_path {
            gt.save_json(path)?;
            info!(cache = %path.display(), "saved ground-truth cache");
        }
        Ok(gt)
    }
}

/// Precision/recall curve and AP of one class.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ClassEvaluation {
    pub ap: f64,
    /// Number of ground-truth boxes of the class.
    pub npos: usize,
    pub detections: usize,
    pub tp: usize,
    pub fp: usize,
    #[serde(skip)]
    pub curve: PrCurve,
}

struct ImageMatches {
    boxes: Vec<BBoxXYXY<Pixel>>,
    matched: Vec<bool>,
}

/// Scores the detections of one class against the ground truth.
///
/// `records` are as read from a result file (1-based coordinates); `path`
/// names that file in errors.
pub fn evaluate_class(
    records: &[DetectionRecord],
    path: &Path,
    gt: &GroundTruth,
    class_index: usize,
    opts: &EvalOptions,
) -> Result<ClassEvaluation, VocmapError> {
    let mut images: HashMap<&str, ImageMatches> = HashMap::with_capacity(gt.boxes.len());
    let mut npos = 0usize;
    for (image_id, annotations) in &gt.boxes {
        let mut boxes: Vec<BBoxXYXY<Pixel>> = annotations
            .iter()
            .filter(|a| a.label == class_index)
            .map(|a| a.bbox)
            .collect();
        // Equal-IoU ties go to the first box, so order boxes by their corners.
        boxes.sort_by(|a, b| {
            a.to_array()
                .iter()
                .zip(b.to_array().iter())
                .map(|(x, y)| x.total_cmp(y))
                .find(|ord| ord.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        npos += boxes.len();
        images.insert(
            image_id.as_str(),
            ImageMatches {
                matched: vec![false; boxes.len()],
                boxes,
            },
        );
    }

    let mut order: Vec<usize> = (0..records.len()).collect();
    // `sort_by` is stable: equal scores keep file order.
    order.sort_by(|&a, &b| records[b].score.total_cmp(&records[a].score));

    let mut tp_flags = Vec::with_capacity(order.len());
    for &i in &order {
        let record = &records[i];
        let image = images
            .get_mut(record.image_id.as_str())
            .ok_or_else(|| VocmapError::UnknownImageId {
                path: path.to_path_buf(),
                record: i + 1,
                image_id: record.image_id.clone(),
            })?;

        let det = record.bbox.to_zero_based();
        let best = image
            .boxes
            .iter()
            .enumerate()
            .map(|(j, gt_box)| (j, det.iou_inclusive(gt_box)))
            .fold(None, |best: Option<(usize, f64)>, (j, iou)| match best {
                Some((_, best_iou)) if best_iou >= iou => best,
                _ => Some((j, iou)),
            });

        let is_tp = match best {
            Some((j, iou)) if iou >= opts.iou_threshold && !image.matched[j] => {
                image.matched[j] = true;
                true
            }
            _ => false,
        };
        tp_flags.push(is_tp);
    }

    let curve = PrCurve::from_flags(&tp_flags, npos);
    let ap = if npos == 0 {
        0.0
    } else {
        average_precision(&curve.rec, &curve.prec, opts.metric)
    };
    let tp = tp_flags.iter().filter(|&&t| t).count();

    Ok(ClassEvaluation {
        ap,
        npos,
        detections: records.len(),
        tp,
        fp: records.len() - tp,
        curve,
    })
}

/// Area under a precision/recall curve.
///
/// Empty curves have AP 0.
pub fn average_precision(rec: &[f64], prec: &[f64], metric: ApMetric) -> f64 {
    match metric {
        ApMetric::Voc07 => (0..=10)
            .map(|t| {
                let level = t as f64 / 10.0;
                rec.iter()
                    .zip(prec)
                    .filter(|(r, _)| **r >= level)
                    .map(|(_, p)| *p)
                    .fold(0.0, f64::max)
            })
            .sum::<f64>()
            / 11.0,
        ApMetric::Continuous => {
            let mut mrec = Vec::with_capacity(rec.len() + 2);
            mrec.push(0.0);
            mrec.extend_from_slice(rec);
            mrec.push(1.0);

            let mut mpre = Vec::with_capacity(prec.len() + 2);
            mpre.push(0.0);
            mpre.extend_from_slice(prec);
            mpre.push(0.0);

            for i in (0..mpre.len() - 1).rev() {
                mpre[i] = mpre[i].max(mpre[i + 1]);
            }

            mrec.windows(2)
                .enumerate()
                .filter(|(_, w)| w[1] != w[0])
                .map(|(i, w)| (w[1] - w[0]) * mpre[i + 1])
                .sum()
        }
    }
}

/// Runs the per-class evaluation over result files.
#[derive(Debug)]
pub struct VocEvaluator<'a> {
    classes: &'a ClassList,
    options: EvalOptions,
    cache: GroundTruthCache,
}

impl<'a> VocEvaluator<'a> {
    pub fn new(classes: &'a ClassList, options: EvalOptions) -> Result<Self, VocmapError> {
        options.validate()?;
        Ok(Self {
            classes,
            options,
            cache: GroundTruthCache::new(),
        })
    }

    /// Replaces the in-memory cache, e.g. with a [`GroundTruthCache::persisted`] one.
    pub fn with_cache(mut self, cache: GroundTruthCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    /// Evaluates each `(class_name, result_file)` pair and aggregates mAP.
    ///
    /// # Errors
    /// `MissingFile` for a missing result or annotation file,
    /// `UnknownImageId` for detections outside `image_ids`, and
    /// `InvalidEvalParams` for a class name not in the class list.
    pub fn evaluate(
        &mut self,
        result_files: &[(String, PathBuf)],
        source: &AnnotationSource,
        image_ids: &[String],
    ) -> Result<EvalReport, VocmapError> {
        let classes = self.classes;
        let options = self.options;
        let gt = self.cache.get_or_load(source, image_ids, classes)?;

        let mut results = Vec::with_capacity(result_files.len());
        for (name, path) in result_files {
            let class_index = classes
                .index_of(name)
                .filter(|&i| i != 0)
                .ok_or_else(|| VocmapError::InvalidEvalParams {
                    message: format!("'{name}' is not a foreground class"),
                })?;

            let records = read_class_results(path)?;
            let evaluation = evaluate_class(&records, path, gt, class_index, &options)?;
            info!(class = %name, ap = %format!("{:.4}", evaluation.ap), "AP");
            results.push(ClassAp::new(name.clone(), evaluation));
        }

        let report = EvalReport::new(options, results);
        info!(map = %format!("{:.4}", report.map), "mean AP");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gt_from(boxes: Vec<(&str, Vec<[f64; 4]>)>, label: usize) -> GroundTruth {
        let images = boxes
            .into_iter()
            .map(|(id, list)| {
                let anns = list
                    .into_iter()
                    .map(|b| Annotation::new(BBoxXYXY::from_array(b), label))
                    .collect();
                (id.to_string(), anns)
            })
            .collect();
        GroundTruth::new(
            AnnotationSource::new("ann", "txt"),
            &ClassList::d2city(),
            images,
        )
    }

    /// A record from 0-based coordinates, shifted the way result files are.
    fn record(image_id: &str, score: f64, b: [f64; 4]) -> DetectionRecord {
        DetectionRecord {
            image_id: image_id.to_string(),
            score,
            bbox: BBoxXYXY::<Pixel>::from_array(b).to_one_based(),
        }
    }

    fn eval(
        records: &[DetectionRecord],
        gt: &GroundTruth,
        metric: ApMetric,
    ) -> ClassEvaluation {
        let opts = EvalOptions {
            iou_threshold: 0.5,
            metric,
        };
        evaluate_class(records, Path::new("car.txt"), gt, 1, &opts).expect("evaluate")
    }

    #[test]
    fn exact_detection_then_false_positive() {
        let gt = gt_from(vec![("img", vec![[0.0, 0.0, 10.0, 10.0]])], 1);
        let records = [
            record("img", 0.9, [0.0, 0.0, 10.0, 10.0]),
            record("img", 0.5, [50.0, 50.0, 60.0, 60.0]),
        ];

        let result = eval(&records, &gt, ApMetric::Continuous);
        assert_eq!((result.tp, result.fp, result.npos), (1, 1, 1));
        assert_eq!(result.curve.rec, vec![1.0, 1.0]);
        assert_eq!(result.curve.prec, vec![1.0, 0.5]);
        assert!((result.ap - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ranking_ignores_file_order() {
        let gt = gt_from(vec![("img", vec![[0.0, 0.0, 10.0, 10.0]])], 1);
        let records = [
            record("img", 0.5, [50.0, 50.0, 60.0, 60.0]),
            record("img", 0.9, [0.0, 0.0, 10.0, 10.0]),
        ];
        let result = eval(&records, &gt, ApMetric::Voc07);
        assert!((result.ap - 1.0).abs() < 1e-12);
    }

    #[test]
    fn duplicate_detection_is_false_positive() {
        let gt = gt_from(vec![("img", vec![[0.0, 0.0, 10.0, 10.0]])], 1);
        let records = [
            record("img", 0.9, [0.0, 0.0, 10.0, 10.0]),
            record("img", 0.8, [0.0, 0.0, 10.0, 9.0]),
        ];
        let result = eval(&records, &gt, ApMetric::Continuous);
        assert_eq!((result.tp, result.fp), (1, 1));
    }

    #[test]
    fn zero_ground_truth_and_zero_detections_give_zero() {
        let empty_gt = gt_from(vec![("img", vec![])], 1);
        let records = [record("img", 0.9, [0.0, 0.0, 10.0, 10.0])];
        for metric in [ApMetric::Voc07, ApMetric::Continuous] {
            let result = eval(&records, &empty_gt, metric);
            assert_eq!(result.ap, 0.0);
            assert!(result.curve.rec.iter().all(|&r| r == 0.0));
        }

        let gt = gt_from(vec![("img", vec![[0.0, 0.0, 10.0, 10.0]])], 1);
        for metric in [ApMetric::Voc07, ApMetric::Continuous] {
            assert_eq!(eval(&[], &gt, metric).ap, 0.0);
        }
    }

    #[test]
    fn other_classes_are_ignored() {
        let gt = gt_from(vec![("img", vec![[0.0, 0.0, 10.0, 10.0]])], 2);
        let records = [record("img", 0.9, [0.0, 0.0, 10.0, 10.0])];
        let result = eval(&records, &gt, ApMetric::Continuous);
        assert_eq!((result.npos, result.tp, result.fp), (0, 0, 1));
    }

    #[test]
    fn ground_truth_order_does_not_change_ap() {
        let boxes = vec![
            [0.0, 0.0, 10.0, 10.0],
            [20.0, 20.0, 40.0, 40.0],
            [100.0, 100.0, 150.0, 130.0],
        ];
        let mut reversed = boxes.clone();
        reversed.reverse();

        let records = [
            record("img", 0.95, [21.0, 21.0, 40.0, 41.0]),
            record("img", 0.9, [0.0, 0.0, 10.0, 10.0]),
            record("img", 0.7, [300.0, 300.0, 310.0, 310.0]),
            record("img", 0.6, [101.0, 99.0, 149.0, 131.0]),
        ];

        let a = eval(&records, &gt_from(vec![("img", boxes)], 1), ApMetric::Continuous);
        let b = eval(&records, &gt_from(vec![("img", reversed)], 1), ApMetric::Continuous);
        assert_eq!(a.ap, b.ap);
        assert_eq!(a.tp, 3);
    }

    #[test]
    fn equal_iou_tie_ignores_ground_truth_order() {
        let tall = [0.0, 0.0, 9.0, 19.0];
        let wide = [0.0, 0.0, 19.0, 9.0];
        // The square overlaps both boxes with IoU 150/275.
        let records = [
            record("img", 0.9, [0.0, 0.0, 14.0, 14.0]),
            record("img", 0.8, tall),
        ];

        let tall_first = gt_from(vec![("img", vec![tall, wide])], 1);
        let wide_first = gt_from(vec![("img", vec![wide, tall])], 1);
        let a = eval(&records, &tall_first, ApMetric::Continuous);
        let b = eval(&records, &wide_first, ApMetric::Continuous);
        assert_eq!((a.tp, a.fp), (b.tp, b.fp));
        assert_eq!(a.ap, b.ap);
        assert_eq!(a.tp, 1);
        assert!((a.ap - 0.5).abs() < 1e-12);
    }

    #[test]
    fn unknown_image_is_an_error() {
        let gt = gt_from(vec![("img", vec![[0.0, 0.0, 10.0, 10.0]])], 1);
        let records = [
            record("img", 0.9, [0.0, 0.0, 10.0, 10.0]),
            record("other", 0.8, [0.0, 0.0, 10.0, 10.0]),
        ];
        let opts = EvalOptions::default();
        let err = evaluate_class(&records, Path::new("car.txt"), &gt, 1, &opts).unwrap_err();
        assert!(matches!(
            err,
            VocmapError::UnknownImageId { record: 2, ref image_id, .. } if image_id == "other"
        ));
    }

    #[test]
    fn eleven_point_interpolation() {
        // Recall reaches 0.5 at precision 1.0, then 1.0 at precision 0.5.
        let rec = [0.5, 0.5, 1.0, 1.0];
        let prec = [1.0, 0.5, 2.0 / 3.0, 0.5];
        let ap = average_precision(&rec, &prec, ApMetric::Voc07);
        let expected = (6.0 * 1.0 + 5.0 * (2.0 / 3.0)) / 11.0;
        assert!((ap - expected).abs() < 1e-12);

        let continuous = average_precision(&rec, &prec, ApMetric::Continuous);
        assert!((continuous - (0.5 + 0.5 * (2.0 / 3.0))).abs() < 1e-12);
    }

    #[test]
    fn metric_for_year() {
        assert_eq!(ApMetric::for_year(2007), ApMetric::Voc07);
        assert_eq!(ApMetric::for_year(2012), ApMetric::Continuous);
    }

    #[test]
    fn iou_threshold_is_validated() {
        for bad in [0.0, -0.1, 1.5, f64::NAN] {
            let opts = EvalOptions {
                iou_threshold: bad,
                metric: ApMetric::Voc07,
            };
            assert!(matches!(
                opts.validate().unwrap_err(),
                VocmapError::InvalidEvalParams { .. }
            ));
        }
        assert!(EvalOptions::default().validate().is_ok());
    }

    fn write_dataset(root: &Path, anns: &[(&str, &str)]) -> AnnotationSource {
        let dir = root.join("ann");
        fs::create_dir_all(&dir).expect("create ann dir");
        for (id, content) in anns {
            fs::write(dir.join(format!("{id}.txt")), content).expect("write annotation");
        }
        AnnotationSource::new(dir, "txt")
    }

    #[test]
    fn persisted_cache_round_trips_and_goes_stale() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let source = write_dataset(temp.path(), &[("a", "1 1 11 11 car\n"), ("b", "")]);
        let classes = ClassList::d2city();
        let cache_path = temp.path().join("cache/gt.json");
        let ids = vec!["a".to_string(), "b".to_string()];

        let mut cache = GroundTruthCache::persisted(&cache_path);
        let loaded = cache.get_or_load(&source, &ids, &classes).expect("load").clone();
        assert!(cache_path.is_file());
        assert_eq!(GroundTruth::load_json(&cache_path).expect("read cache"), loaded);

        // Changing the annotation on disk is invisible while the cache matches.
        fs::write(source.path_for("a"), "1 1 21 21 car\n").expect("rewrite");
        let mut reuse = GroundTruthCache::persisted(&cache_path);
        let cached = reuse.get_or_load(&source, &ids, &classes).expect("load");
        assert_eq!(cached, &loaded);

        // A different id list invalidates it.
        let fewer = vec!["a".to_string()];
        let mut stale = GroundTruthCache::persisted(&cache_path);
        let rebuilt = stale.get_or_load(&source, &fewer, &classes).expect("load");
        assert_eq!(rebuilt.image_ids(), &fewer[..]);
        let boxes = rebuilt.annotations("a").expect("image a");
        assert_eq!(boxes[0].bbox.to_array(), [0.0, 0.0, 20.0, 20.0]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn cache_write_to_full_disk_fails() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let source = write_dataset(temp.path(), &[("a", "1 1 11 11 car\n")]);
        let ids = vec!["a".to_string()];

        let mut cache = GroundTruthCache::persisted("/dev/full");
        assert!(cache.get_or_load(&source, &ids, &ClassList::d2city()).is_err());
    }

    #[test]
    fn evaluator_reports_every_class_and_mean() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let source = write_dataset(
            temp.path(),
            &[("a", "1 1 11 11 car\n1 1 11 11 bus\n"), ("b", "21 21 41 41 car\n")],
        );
        let classes = ClassList::with_background(["car", "bus"]).expect("classes");
        let results = temp.path().join("results");
        fs::create_dir_all(&results).expect("create results dir");
        fs::write(
            results.join("comp4_det_test_car.txt"),
            "a 0.900 1.0 1.0 11.0 11.0\nb 0.800 100.0 100.0 120.0 120.0\n",
        )
        .expect("write car");
        fs::write(results.join("comp4_det_test_bus.txt"), "").expect("write bus");

        let files = crate::ir::io_results::class_result_files(&results, &classes);
        let ids = vec!["a".to_string(), "b".to_string()];
        let mut evaluator = VocEvaluator::new(
            &classes,
            EvalOptions {
                iou_threshold: 0.5,
                metric: ApMetric::Continuous,
            },
        )
        .expect("evaluator");
        let report = evaluator.evaluate(&files, &source, &ids).expect("evaluate");

        let names: Vec<&str> = report.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["car", "bus"]);
        assert!((report.classes[0].evaluation.ap - 0.5).abs() < 1e-12);
        assert_eq!(report.classes[1].evaluation.ap, 0.0);
        assert!((report.map - 0.25).abs() < 1e-12);
    }

    #[test]
    fn missing_result_file_fails() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let source = write_dataset(temp.path(), &[("a", "")]);
        let classes = ClassList::with_background(["car"]).expect("classes");
        let files = vec![("car".to_string(), temp.path().join("none.txt"))];
        let mut evaluator = VocEvaluator::new(&classes, EvalOptions::default()).expect("evaluator");
        let err = evaluator
            .evaluate(&files, &source, &["a".to_string()])
            .unwrap_err();
        assert!(matches!(err, VocmapError::MissingFile { .. }));
    }
}
