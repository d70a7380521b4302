//! Evaluation report types and their on-disk forms.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use super::{ApMetric, ClassEvaluation, EvalOptions};
use crate::error::VocmapError;

/// Summary CSV file name.
pub const SUMMARY_CSV: &str = "result.csv";
/// Full JSON report file name.
pub const REPORT_JSON: &str = "report.json";

/// Cumulative precision and recall after each ranked detection.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PrCurve {
    pub rec: Vec<f64>,
    pub prec: Vec<f64>,
}

impl PrCurve {
    /// Builds the curve from per-detection TP flags in rank order.
    ///
    /// Recall is 0 throughout when there is no ground truth.
    pub fn from_flags(tp_flags: &[bool], npos: usize) -> Self {
        let mut rec = Vec::with_capacity(tp_flags.len());
        let mut prec = Vec::with_capacity(tp_flags.len());
        let (mut tp, mut fp) = (0usize, 0usize);

        for &is_tp in tp_flags {
            if is_tp {
                tp += 1;
            } else {
                fp += 1;
            }
            rec.push(if npos == 0 {
                0.0
            } else {
                tp as f64 / npos as f64
            });
            prec.push(tp as f64 / (tp + fp) as f64);
        }

        Self { rec, prec }
    }
}

/// AP and counts for one class.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassAp {
    pub name: String,
    #[serde(flatten)]
    pub evaluation: ClassEvaluation,
}

impl ClassAp {
    pub fn new(name: String, evaluation: ClassEvaluation) -> Self {
        Self { name, evaluation }
    }
}

#[derive(Serialize)]
struct PrRecord<'a> {
    rec: &'a [f64],
    prec: &'a [f64],
    ap: f64,
}

/// Per-class AP plus their mean.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvalReport {
    pub iou_threshold: f64,
    pub metric: ApMetric,
    pub classes: Vec<ClassAp>,
    pub map: f64,
}

impl EvalReport {
    /// mAP is the plain mean of class APs, 0 with no classes.
    pub fn new(options: EvalOptions, classes: Vec<ClassAp>) -> Self {
        let map = if classes.is_empty() {
            0.0
        } else {
            classes.iter().map(|c| c.evaluation.ap).sum::<f64>() / classes.len() as f64
        };
        Self {
            iou_threshold: options.iou_threshold,
            metric: options.metric,
            classes,
            map,
        }
    }

    /// Writes `class,ap` rows (AP to 4 decimals) followed by `map,<mAP>`.
    pub fn write_csv(&self, path: &Path) -> Result<(), VocmapError> {
        let csv_err = |source: csv::Error| VocmapError::ReportCsvWrite {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(csv_err)?;

        for class in &self.classes {
            writer
                .write_record([
                    class.name.as_str(),
                    format!("{:.4}", class.evaluation.ap).as_str(),
                ])
                .map_err(csv_err)?;
        }
        writer
            .write_record(["map", format!("{:.4}", self.map).as_str()])
            .map_err(csv_err)?;
        writer.flush()?;
        Ok(())
    }

    /// Writes `<dir>/<class>_pr.json` holding `rec`, `prec` and `ap` per class.
    pub fn write_pr_curves(&self, dir: &Path) -> Result<Vec<PathBuf>, VocmapError> {
        let mut written = Vec::with_capacity(self.classes.len());
        for class in &self.classes {
            let path = dir.join(format!("{}_pr.json", class.name));
            let record = PrRecord {
                rec: &class.evaluation.curve.rec,
                prec: &class.evaluation.curve.prec,
                ap: class.evaluation.ap,
            };
            write_json_file(&path, &record)?;
            written.push(path);
        }
        Ok(written)
    }

    /// Writes the whole report (without curves) as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), VocmapError> {
        write_json_file(path, self)
    }

    /// Writes `result.csv`, `report.json` and every PR curve into `dir`.
    pub fn write_all(&self, dir: &Path) -> Result<(), VocmapError> {
        fs::create_dir_all(dir)?;
        self.write_csv(&dir.join(SUMMARY_CSV))?;
        self.write_json(&dir.join(REPORT_JSON))?;
        let curves = self.write_pr_curves(dir)?;
        debug!(dir = %dir.display(), curves = curves.len(), "wrote evaluation report");
        Ok(())
    }
}

fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), VocmapError> {
    let file = File::create(path).map_err(VocmapError::Io)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| {
        VocmapError::ReportJsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.flush().map_err(VocmapError::Io)?;
    Ok(())
}

impl fmt::Display for EvalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.name.len())
            .max()
            .unwrap_or(0)
            .max("class".len());

        writeln!(
            f,
            "VOC evaluation (IoU >= {}, metric: {})",
            self.iou_threshold, self.metric
        )?;
        writeln!(f)?;
        writeln!(
            f,
            "  {:<width$}  {:>8}  {:>6}  {:>6}  {:>6}  {:>6}",
            "class", "AP", "gt", "dets", "tp", "fp"
        )?;
        writeln!(f, "  {}", "-".repeat(width + 44))?;
        for class in &self.classes {
            let e = &class.evaluation;
            writeln!(
                f,
                "  {:<width$}  {:>8.4}  {:>6}  {:>6}  {:>6}  {:>6}",
                class.name, e.ap, e.npos, e.detections, e.tp, e.fp
            )?;
        }
        writeln!(f, "  {}", "-".repeat(width + 44))?;
        writeln!(f, "  {:<width$}  {:>8.4}", "mAP", self.map)
    }
}
