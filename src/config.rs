//! YAML run configuration for the `eval` command.
//!
//! Every field is optional; command-line flags override file values and
//! unset fields fall back to defaults when the config is resolved.
//!
//! ```yaml
//! root: /data/d2city
//! image_set: test
//! classes: classes.yaml
//! year: 2007
//! iou_threshold: 0.5
//! layout:
//!   image_ext: png
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classes::ClassList;
use crate::dataset::DatasetLayout;
use crate::error::VocmapError;
use crate::eval::{ApMetric, EvalOptions};

/// Default image set evaluated when none is given.
pub const DEFAULT_IMAGE_SET: &str = "test";
/// Default challenge year; selects the 11-point metric.
pub const DEFAULT_YEAR: u32 = 2007;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub root: Option<PathBuf>,
    pub image_set: Option<String>,
    pub classes: Option<PathBuf>,
    pub year: Option<u32>,
    pub iou_threshold: Option<f64>,
    pub metric: Option<ApMetric>,
    pub results_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub gt_cache: Option<PathBuf>,
    pub layout: Option<DatasetLayout>,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, VocmapError> {
        let content = fs::read_to_string(path)
            .map_err(|err| VocmapError::open_failed("config", path, err))?;
        Self::from_yaml_str(&content, path)
    }

    /// Parses YAML content; `path` is only used in errors.
    pub fn from_yaml_str(content: &str, path: &Path) -> Result<Self, VocmapError> {
        let config = serde_yaml::from_str(content).map_err(|source| VocmapError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded run config");
        Ok(config)
    }

    /// Fields set in `overrides` replace the ones in `self`.
    pub fn merged(self, overrides: RunConfig) -> Self {
        Self {
            root: overrides.root.or(self.root),
            image_set: overrides.image_set.or(self.image_set),
            classes: overrides.classes.or(self.classes),
            year: overrides.year.or(self.year),
            iou_threshold: overrides.iou_threshold.or(self.iou_threshold),
            metric: overrides.metric.or(self.metric),
            results_dir: overrides.results_dir.or(self.results_dir),
            output_dir: overrides.output_dir.or(self.output_dir),
            gt_cache: overrides.gt_cache.or(self.gt_cache),
            layout: overrides.layout.or(self.layout),
        }
    }

    /// Fills in defaults and loads the class list.
    ///
    /// An explicit metric wins over the one implied by `year`. The results
    /// directory defaults to the layout's, the output directory to the
    /// results directory.
    pub fn resolve(self) -> Result<EvalSettings, VocmapError> {
        let root = self.root.ok_or_else(|| VocmapError::InvalidEvalParams {
            message: "dataset root is required (--root, VOCMAP_ROOT or config `root`)"
                .to_string(),
        })?;

        let classes = match &self.classes {
            Some(path) => ClassList::from_file(path)?,
            None => ClassList::d2city(),
        };

        let layout = self.layout.unwrap_or_default();
        let year = self.year.unwrap_or(DEFAULT_YEAR);
        let options = EvalOptions {
            iou_threshold: self.iou_threshold.unwrap_or(0.5),
            metric: self.metric.unwrap_or_else(|| ApMetric::for_year(year)),
        };
        options.validate()?;

        let results_dir = self
            .results_dir
            .unwrap_or_else(|| layout.results_path(&root));
        let output_dir = self.output_dir.unwrap_or_else(|| results_dir.clone());

        Ok(EvalSettings {
            root,
            image_set: self
                .image_set
                .unwrap_or_else(|| DEFAULT_IMAGE_SET.to_string()),
            classes,
            layout,
            options,
            results_dir,
            output_dir,
            gt_cache: self.gt_cache,
        })
    }
}

/// Fully resolved inputs of one evaluation run.
#[derive(Clone, Debug)]
pub struct EvalSettings {
    pub root: PathBuf,
    pub image_set: String,
    pub classes: ClassList,
    pub layout: DatasetLayout,
    pub options: EvalOptions,
    pub results_dir: PathBuf,
    pub output_dir: PathBuf,
    pub gt_cache: Option<PathBuf>,
}
