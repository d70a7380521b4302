//! The detection dataset adapter.
//!
//! A [`DetectionDataset`] ties together the manifest index, the annotation
//! reader, an image decoder and an optional per-sample transform. It also
//! drives result-file writing and evaluation for a table of detections.
//!
//! Directory layout under the dataset root (all names configurable through
//! [`DatasetLayout`]):
//!
//! ```text
//! <root>/ann/<id>.txt            annotations
//! <root>/video2Frames/<id>.jpg   images
//! <root>/Main/<set>.txt          manifests
//! <root>/results/Main/           per-class detection results
//! ```

mod raster;
mod sampler;
mod transform;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

pub use raster::{FileDecoder, ImageDecoder, Raster};
pub use sampler::BatchSampler;
pub use transform::{Resize, SampleTransform};

use crate::classes::ClassList;
use crate::collate::{collate, Batch, Sample};
use crate::error::VocmapError;
use crate::eval::{AnnotationSource, EvalOptions, EvalReport, GroundTruthCache, VocEvaluator};
use crate::ir::io_annotation_txt::{read_normalized_annotations, read_pixel_annotations};
use crate::ir::io_manifest::{manifest_path, read_manifest};
use crate::ir::io_results::{class_result_files, write_all_results};
use crate::ir::{Annotation, DatasetIndex, DetectionTable, ImageRecord, Pixel};

/// Relative directory names and file extensions of a dataset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetLayout {
    pub ann_dir: String,
    pub image_dir: String,
    pub manifest_dir: String,
    pub annotation_ext: String,
    pub image_ext: String,
    pub results_dir: String,
}

impl Default for DatasetLayout {
    fn default() -> Self {
        Self {
            ann_dir: "ann".to_string(),
            image_dir: "video2Frames".to_string(),
            manifest_dir: crate::ir::io_manifest::DEFAULT_MANIFEST_DIR.to_string(),
            annotation_ext: "txt".to_string(),
            image_ext: "jpg".to_string(),
            results_dir: crate::ir::io_results::DEFAULT_RESULTS_DIR.to_string(),
        }
    }
}

impl DatasetLayout {
    pub fn annotation_path(&self, root: &Path, id: &str) -> PathBuf {
        root.join(&self.ann_dir)
            .join(format!("{id}.{}", self.annotation_ext))
    }

    pub fn image_path(&self, root: &Path, id: &str) -> PathBuf {
        root.join(&self.image_dir)
            .join(format!("{id}.{}", self.image_ext))
    }

    pub fn results_path(&self, root: &Path) -> PathBuf {
        root.join(&self.results_dir)
    }

    pub fn annotation_source(&self, root: &Path) -> AnnotationSource {
        AnnotationSource::new(root.join(&self.ann_dir), self.annotation_ext.clone())
    }
}

/// Random-access detection dataset over one or more image sets.
pub struct DetectionDataset {
    root: PathBuf,
    image_sets: Vec<String>,
    layout: DatasetLayout,
    classes: ClassList,
    index: DatasetIndex,
    decoder: Box<dyn ImageDecoder>,
    transform: Option<Box<dyn SampleTransform>>,
}

impl DetectionDataset {
    /// Opens a dataset with the default layout and image decoder.
    pub fn open<S: AsRef<str>>(
        root: impl Into<PathBuf>,
        image_sets: &[S],
        classes: ClassList,
    ) -> Result<Self, VocmapError> {
        Self::open_with_layout(root, image_sets, classes, DatasetLayout::default())
    }

    pub fn open_with_layout<S: AsRef<str>>(
        root: impl Into<PathBuf>,
        image_sets: &[S],
        classes: ClassList,
        layout: DatasetLayout,
    ) -> Result<Self, VocmapError> {
        let root = root.into();
        let index = DatasetIndex::build_in(&root, &layout.manifest_dir, image_sets)?;
        Ok(Self {
            root,
            image_sets: image_sets.iter().map(|s| s.as_ref().to_string()).collect(),
            layout,
            classes,
            index,
            decoder: Box::new(FileDecoder),
            transform: None,
        })
    }

    /// Replaces the image decoder.
    pub fn with_decoder(mut self, decoder: impl ImageDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    /// Applies `transform` to every sample returned by [`DetectionDataset::get`].
    pub fn with_transform(mut self, transform: impl SampleTransform + 'static) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn image_sets(&self) -> &[String] {
        &self.image_sets
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    pub fn classes(&self) -> &ClassList {
        &self.classes
    }

    pub fn index(&self) -> &DatasetIndex {
        &self.index
    }

    pub fn record(&self, index: usize) -> Result<&ImageRecord, VocmapError> {
        self.index.get(index)
    }

    /// Decoded image and annotations normalized by its size, transformed.
    pub fn get(&self, index: usize) -> Result<Sample, VocmapError> {
        let record = self.index.get(index)?;
        let image = self.decode(record)?;
        let targets = read_normalized_annotations(
            &self.layout.annotation_path(record.root(), record.id()),
            &self.classes,
            image.width(),
            image.height(),
        )?;

        let (image, targets) = match &self.transform {
            Some(transform) => transform.apply(image, targets)?,
            None => (image, targets),
        };
        Ok(Sample::new(image, targets))
    }

    /// The decoded image without any transform.
    pub fn pull_image(&self, index: usize) -> Result<Raster, VocmapError> {
        let record = self.index.get(index)?;
        self.decode(record)
    }

    /// Image id and its 0-based pixel annotations.
    pub fn pull_anno(&self, index: usize) -> Result<(String, Vec<Annotation<Pixel>>), VocmapError> {
        let record = self.index.get(index)?;
        let annotations = read_pixel_annotations(
            &self.layout.annotation_path(record.root(), record.id()),
            &self.classes,
        )?;
        Ok((record.id().to_string(), annotations))
    }

    /// `(width, height)` read from the image header only.
    pub fn image_dimensions(&self, index: usize) -> Result<(u32, u32), VocmapError> {
        let record = self.index.get(index)?;
        let path = self.layout.image_path(record.root(), record.id());
        let size = imagesize::size(&path).map_err(|source| match source {
            imagesize::ImageError::IoError(err) if err.kind() == std::io::ErrorKind::NotFound => {
                VocmapError::MissingFile {
                    kind: "image",
                    path: path.clone(),
                }
            }
            source => VocmapError::ImageDimensionRead {
                path: path.clone(),
                source,
            },
        })?;
        Ok((size.width as u32, size.height as u32))
    }

    /// Loads the given indices and collates them.
    pub fn load_batch(&self, indices: &[usize]) -> Result<Batch, VocmapError> {
        let samples = indices
            .iter()
            .map(|&i| self.get(i))
            .collect::<Result<Vec<_>, _>>()?;
        collate(samples)
    }

    /// Collated batches in the order `sampler` yields indices.
    pub fn batches<'a>(
        &'a self,
        sampler: &BatchSampler,
    ) -> impl Iterator<Item = Result<Batch, VocmapError>> + 'a {
        sampler
            .batches()
            .into_iter()
            .map(move |indices| self.load_batch(&indices))
    }

    /// Image ids of the first image set, the set evaluation runs over.
    pub fn eval_image_ids(&self) -> Result<Vec<String>, VocmapError> {
        let set = self
            .image_sets
            .first()
            .ok_or_else(|| VocmapError::InvalidEvalParams {
                message: "dataset has no image set to evaluate".to_string(),
            })?;
        read_manifest(&manifest_path(&self.root, &self.layout.manifest_dir, set))
    }

    /// Writes one result file per class from `table`, then evaluates them.
    ///
    /// Column `i` of `table` holds the detections of dataset image `i`.
    /// Report artifacts are written into `output_dir`.
    pub fn evaluate_detections(
        &self,
        table: &DetectionTable,
        output_dir: &Path,
        opts: EvalOptions,
    ) -> Result<EvalReport, VocmapError> {
        let results_dir = self.layout.results_path(&self.root);
        write_all_results(&results_dir, &self.classes, self.index.records(), table)?;
        self.evaluate_results(&results_dir, output_dir, opts, GroundTruthCache::new())
    }

    /// Evaluates result files already present in `results_dir`.
    pub fn evaluate_results(
        &self,
        results_dir: &Path,
        output_dir: &Path,
        opts: EvalOptions,
        cache: GroundTruthCache,
    ) -> Result<EvalReport, VocmapError> {
        let image_ids = self.eval_image_ids()?;
        info!(
            set = %self.image_sets[0],
            images = image_ids.len(),
            results = %results_dir.display(),
            "evaluating detections"
        );

        let files = class_result_files(results_dir, &self.classes);
        let source = self.layout.annotation_source(&self.root);
        let report = VocEvaluator::new(&self.classes, opts)?
            .with_cache(cache)
            .evaluate(&files, &source, &image_ids)?;

        report.write_all(output_dir)?;
        Ok(report)
    }

    fn decode(&self, record: &ImageRecord) -> Result<Raster, VocmapError> {
        self.decoder
            .decode(&self.layout.image_path(record.root(), record.id()))
    }
}
