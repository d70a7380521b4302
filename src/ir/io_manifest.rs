//! Image-set manifests and the dataset index built from them.
//!
//! A manifest is a text file with one image id per line, stored as
//! `<root>/<manifest_dir>/<name>.txt`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use super::ImageRecord;
use crate::error::VocmapError;

/// Default directory (under the dataset root) that holds manifests.
pub const DEFAULT_MANIFEST_DIR: &str = "Main";

const MANIFEST_EXTENSION: &str = "txt";

/// Ordered, immutable list of images from one or more manifests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatasetIndex {
    records: Vec<ImageRecord>,
}

impl DatasetIndex {
    /// Reads `<root>/Main/<name>.txt` for every name, in order.
    pub fn build<S: AsRef<str>>(root: &Path, manifest_names: &[S]) -> Result<Self, VocmapError> {
        Self::build_in(root, DEFAULT_MANIFEST_DIR, manifest_names)
    }

    /// Like [`DatasetIndex::build`] with a custom manifest directory.
    ///
    /// Duplicate ids across or within manifests are kept.
    pub fn build_in<S: AsRef<str>>(
        root: &Path,
        manifest_dir: &str,
        manifest_names: &[S],
    ) -> Result<Self, VocmapError> {
        let mut records = Vec::new();
        for name in manifest_names {
            let path = manifest_path(root, manifest_dir, name.as_ref());
            let ids = read_manifest(&path)?;
            debug!(manifest = %path.display(), images = ids.len(), "read manifest");
            records.extend(ids.into_iter().map(|id| ImageRecord::new(root, id)));
        }

        info!(
            root = %root.display(),
            manifests = manifest_names.len(),
            images = records.len(),
            "built dataset index"
        );
        Ok(Self { records })
    }

    /// Wraps an already materialized list of records.
    pub fn from_records(records: Vec<ImageRecord>) -> Self {
        Self { records }
    }

    pub fn get(&self, index: usize) -> Result<&ImageRecord, VocmapError> {
        self.records
            .get(index)
            .ok_or(VocmapError::IndexOutOfRange {
                index,
                len: self.records.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    /// Image ids in index order.
    pub fn ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.id().to_string()).collect()
    }
}

/// `<root>/<manifest_dir>/<name>.txt`
pub fn manifest_path(root: &Path, manifest_dir: &str, name: &str) -> PathBuf {
    root.join(manifest_dir)
        .join(format!("{name}.{MANIFEST_EXTENSION}"))
}

/// Reads the ids listed in one manifest file.
///
/// Blank lines are skipped; ids may not contain whitespace.
pub fn read_manifest(path: &Path) -> Result<Vec<String>, VocmapError> {
    let content = fs::read_to_string(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            VocmapError::ManifestNotFound {
                path: path.to_path_buf(),
            }
        } else {
            VocmapError::Io(err)
        }
    })?;
    parse_manifest_str(&content, path)
}

/// Parses manifest content; `path` is only used in errors.
pub fn parse_manifest_str(content: &str, path: &Path) -> Result<Vec<String>, VocmapError> {
    let mut ids = Vec::new();
    for (line_idx, line) in content.lines().enumerate() {
        let id = line.trim();
        if id.is_empty() {
            continue;
        }
        if id.split_whitespace().nth(1).is_some() {
            return Err(VocmapError::ManifestFormat {
                path: path.to_path_buf(),
                line: line_idx + 1,
                message: format!("image id '{id}' contains whitespace"),
            });
        }
        ids.push(id.to_string());
    }
    Ok(ids)
}

/// Writes a manifest listing every annotation file under `annotation_dir`.
///
/// Ids are the file paths relative to `annotation_dir` without extension,
/// `/`-separated and sorted. Returns the number of ids written.
pub fn write_manifest_from_dir(
    annotation_dir: &Path,
    extension: &str,
    manifest: &Path,
) -> Result<usize, VocmapError> {
    if !annotation_dir.is_dir() {
        return Err(VocmapError::ManifestScan {
            path: annotation_dir.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    let mut ids = Vec::new();
    for entry in WalkDir::new(annotation_dir).follow_links(true) {
        let entry = entry.map_err(|source| VocmapError::ManifestScan {
            path: annotation_dir.to_path_buf(),
            message: format!("failed while traversing directory: {source}"),
        })?;

        let path = entry.path();
        let matches_ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if !entry.file_type().is_file() || !matches_ext {
            continue;
        }

        let rel = path
            .strip_prefix(annotation_dir)
            .unwrap_or(path)
            .with_extension("");
        ids.push(rel.to_string_lossy().replace('\\', "/"));
    }
    ids.sort();

    if let Some(parent) = manifest.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(manifest)?;
    for id in &ids {
        writeln!(file, "{id}")?;
    }

    info!(
        manifest = %manifest.display(),
        images = ids.len(),
        "wrote manifest"
    );
    Ok(ids.len())
}
