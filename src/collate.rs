//! Batch collation for samples with different numbers of objects.
//!
//! Images are stacked along a new leading dimension; annotation arrays stay
//! ragged, one per sample, in input order.

use serde::Serialize;

use crate::dataset::Raster;
use crate::error::VocmapError;
use crate::ir::TargetArray;

/// One training sample: an image and its normalized annotations.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub image: Raster,
    pub targets: TargetArray,
}

impl Sample {
    pub fn new(image: Raster, targets: TargetArray) -> Self {
        Self { image, targets }
    }
}

/// Images stacked into one NHWC `u8` buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImageBatch {
    pub len: usize,
    pub height: u32,
    pub width: u32,
    pub channels: u8,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl ImageBatch {
    /// `[N, H, W, C]`
    pub fn shape(&self) -> [usize; 4] {
        [
            self.len,
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        ]
    }

    /// Pixels of the `i`-th image, if present.
    pub fn image(&self, index: usize) -> Option<&[u8]> {
        if index >= self.len {
            return None;
        }
        let stride = self.height as usize * self.width as usize * self.channels as usize;
        self.data.get(index * stride..(index + 1) * stride)
    }
}

/// Output of [`collate`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batch {
    pub images: ImageBatch,
    pub targets: Vec<TargetArray>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.images.len
    }

    pub fn is_empty(&self) -> bool {
        self.images.len == 0
    }

    /// Targets as `[xmin, ymin, xmax, ymax, label]` rows, one list per image.
    pub fn target_rows(&self) -> Vec<Vec<[f32; 5]>> {
        self.targets
            .iter()
            .map(|targets| targets.iter().map(|t| t.to_row()).collect())
            .collect()
    }
}

/// Stacks sample images and keeps their annotations as a ragged list.
///
/// # Errors
/// `ShapeMismatch` if any image differs in width, height or channel count
/// from the first one.
pub fn collate(samples: Vec<Sample>) -> Result<Batch, VocmapError> {
    let Some(first) = samples.first() else {
        return Ok(Batch::default());
    };
    let (width, height, channels) = first.image.shape();

    for (index, sample) in samples.iter().enumerate().skip(1) {
        let (w, h, c) = sample.image.shape();
        if (w, h, c) != (width, height, channels) {
            return Err(VocmapError::ShapeMismatch {
                index,
                expected_w: width,
                expected_h: height,
                expected_c: channels,
                found_w: w,
                found_h: h,
                found_c: c,
            });
        }
    }

    let stride = width as usize * height as usize * channels as usize;
    let mut data = Vec::with_capacity(stride * samples.len());
    let mut targets = Vec::with_capacity(samples.len());
    let len = samples.len();

    for sample in samples {
        data.extend_from_slice(sample.image.pixels());
        targets.push(sample.targets);
    }

    Ok(Batch {
        images: ImageBatch {
            len,
            height,
            width,
            channels,
            data,
        },
        targets,
    })
}
