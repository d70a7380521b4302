#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// A 24-bit BMP filled with one colour.
pub fn bmp_bytes(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    // BMP rows are BGR and padded to four bytes.
    let padding = (row_stride - width * 3) as usize;
    for _ in 0..height {
        for _ in 0..width {
            bytes.extend_from_slice(&[rgb[2], rgb[1], rgb[0]]);
        }
        bytes.resize(bytes.len() + padding, 0);
    }
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32, rgb: [u8; 3]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height, rgb)).expect("write bmp file");
}

/// Builds a dataset tree with BMP images:
///
/// ```text
/// <root>/ann/<id>.txt
/// <root>/video2Frames/<id>.bmp
/// <root>/Main/<set>.txt
/// <root>/results/Main/comp4_det_test_<class>.txt
/// ```
pub struct DatasetFixture {
    pub root: PathBuf,
}

impl DatasetFixture {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Adds an image of the given size with raw annotation text.
    pub fn image(&self, id: &str, width: u32, height: u32, annotations: &str) -> &Self {
        write_bmp(
            &self.root.join("video2Frames").join(format!("{id}.bmp")),
            width,
            height,
            [90, 120, 200],
        );
        self.annotation(id, annotations)
    }

    /// Writes only the annotation file of `id`.
    pub fn annotation(&self, id: &str, content: &str) -> &Self {
        let path = self.root.join("ann").join(format!("{id}.txt"));
        fs::create_dir_all(path.parent().expect("parent")).expect("create ann dir");
        fs::write(path, content).expect("write annotation");
        self
    }

    pub fn manifest(&self, set: &str, ids: &[&str]) -> &Self {
        let path = self.root.join("Main").join(format!("{set}.txt"));
        fs::create_dir_all(path.parent().expect("parent")).expect("create manifest dir");
        let mut content = ids.join("\n");
        content.push('\n');
        fs::write(path, content).expect("write manifest");
        self
    }

    pub fn results(&self, class: &str, content: &str) -> &Self {
        let path = self.results_dir().join(format!("comp4_det_test_{class}.txt"));
        fs::create_dir_all(path.parent().expect("parent")).expect("create results dir");
        fs::write(path, content).expect("write results");
        self
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join("results/Main")
    }

    pub fn classes_file(&self, names: &[&str]) -> PathBuf {
        let path = self.root.join("classes.txt");
        fs::write(&path, names.join("\n")).expect("write classes");
        path
    }
}
