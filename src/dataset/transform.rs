//! Per-sample transforms applied after decoding.

use super::Raster;
use crate::error::VocmapError;
use crate::ir::TargetArray;

/// A transform over a decoded image and its normalized targets.
pub trait SampleTransform: Send + Sync {
    fn apply(
        &self,
        image: Raster,
        targets: TargetArray,
    ) -> Result<(Raster, TargetArray), VocmapError>;
}

/// Rescales every image to a fixed size.
///
/// Targets are normalized to the image extent, so a resize leaves them as is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resize {
    pub width: u32,
    pub height: u32,
}

impl Resize {
    pub fn new(width: u32, height: u32) -> Result<Self, VocmapError> {
        if width == 0 || height == 0 {
            return Err(VocmapError::InvalidImageDimensions { width, height });
        }
        Ok(Self { width, height })
    }
}

impl SampleTransform for Resize {
    fn apply(
        &self,
        image: Raster,
        targets: TargetArray,
    ) -> Result<(Raster, TargetArray), VocmapError> {
        Ok((image.resized(self.width, self.height)?, targets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Annotation, BBoxXYXY};

    #[test]
    fn resize_keeps_targets() {
        let targets = vec![Annotation::new(BBoxXYXY::from_xyxy(0.1, 0.2, 0.3, 0.4), 2)];
        let (image, out) = Resize::new(8, 6)
            .expect("valid size")
            .apply(Raster::zeros(4, 4, 3), targets.clone())
            .expect("apply");
        assert_eq!(image.shape(), (8, 6, 3));
        assert_eq!(out, targets);
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(matches!(
            Resize::new(0, 10).unwrap_err(),
            VocmapError::InvalidImageDimensions { .. }
        ));
    }
}
