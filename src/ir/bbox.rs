//! Axis-aligned boxes in XYXY order, tagged with their coordinate space.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use super::{Normalized, Pixel};

/// An axis-aligned bounding box `(xmin, ymin, xmax, ymax)`.
///
/// `TSpace` is [`Pixel`] or [`Normalized`]. Ordering (`min <= max`) is not
/// enforced here; readers check it where the file format requires it.
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYXY<TSpace> {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> BBoxXYXY<TSpace> {
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
            _space: PhantomData,
        }
    }

    /// Builds a box from `[x1, y1, x2, y2]`.
    #[inline]
    pub fn from_array(coords: [f64; 4]) -> Self {
        Self::from_xyxy(coords[0], coords[1], coords[2], coords[3])
    }

    #[inline]
    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    #[inline]
    pub fn ymin(&self) -> f64 {
        self.ymin
    }

    #[inline]
    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    #[inline]
    pub fn ymax(&self) -> f64 {
        self.ymax
    }

    #[inline]
    pub fn to_array(&self) -> [f64; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Returns true if `min <= max` on both axes.
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.xmin <= self.xmax && self.ymin <= self.ymax
    }

    /// Continuous intersection-over-union.
    ///
    /// Returns 0.0 when the union is empty.
    pub fn iou(&self, other: &Self) -> f64 {
        overlap_ratio(self, other, 0.0)
    }
}

impl BBoxXYXY<Pixel> {
    /// Intersection-over-union with inclusive pixel extents (`max - min + 1`),
    /// the convention of the PASCAL VOC devkit.
    pub fn iou_inclusive(&self, other: &Self) -> f64 {
        overlap_ratio(self, other, 1.0)
    }

    /// Divides x by `image_width` and y by `image_height`.
    pub fn to_normalized(&self, image_width: f64, image_height: f64) -> BBoxXYXY<Normalized> {
        BBoxXYXY::from_xyxy(
            self.xmin / image_width,
            self.ymin / image_height,
            self.xmax / image_width,
            self.ymax / image_height,
        )
    }

    /// Shifts every coordinate by `+1` (0-based to file convention).
    pub fn to_one_based(&self) -> Self {
        self.shifted(1.0)
    }

    /// Shifts every coordinate by `-1` (file convention to 0-based).
    pub fn to_zero_based(&self) -> Self {
        self.shifted(-1.0)
    }

    fn shifted(&self, delta: f64) -> Self {
        Self::from_xyxy(
            self.xmin + delta,
            self.ymin + delta,
            self.xmax + delta,
            self.ymax + delta,
        )
    }
}

impl BBoxXYXY<Normalized> {
    /// Scales back to pixels for an image of the given size.
    pub fn to_pixel(&self, image_width: f64, image_height: f64) -> BBoxXYXY<Pixel> {
        BBoxXYXY::from_xyxy(
            self.xmin * image_width,
            self.ymin * image_height,
            self.xmax * image_width,
            self.ymax * image_height,
        )
    }
}

fn overlap_ratio<TSpace>(a: &BBoxXYXY<TSpace>, b: &BBoxXYXY<TSpace>, extent: f64) -> f64 {
    let iw = (a.xmax.min(b.xmax) - a.xmin.max(b.xmin) + extent).max(0.0);
    let ih = (a.ymax.min(b.ymax) - a.ymin.max(b.ymin) + extent).max(0.0);
    let inter = iw * ih;

    let area_a = (a.width() + extent) * (a.height() + extent);
    let area_b = (b.width() + extent) * (b.height() + extent);
    let union = area_a + area_b - inter;

    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

impl<TSpace> std::fmt::Debug for BBoxXYXY<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxXYXY")
            .field("xmin", &self.xmin)
            .field("ymin", &self.ymin)
            .field("xmax", &self.xmax)
            .field("ymax", &self.ymax)
            .finish()
    }
}

impl<TSpace> Default for BBoxXYXY<TSpace> {
    fn default() -> Self {
        Self::from_xyxy(0.0, 0.0, 0.0, 0.0)
    }
}

// Hand-written so the marker type needs no serde bounds.
impl<TSpace> Serialize for BBoxXYXY<TSpace> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("BBoxXYXY", 4)?;
        state.serialize_field("xmin", &self.xmin)?;
        state.serialize_field("ymin", &self.ymin)?;
        state.serialize_field("xmax", &self.xmax)?;
        state.serialize_field("ymax", &self.ymax)?;
        state.end()
    }
}

impl<'de, TSpace> Deserialize<'de> for BBoxXYXY<TSpace> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            xmin: f64,
            ymin: f64,
            xmax: f64,
            ymax: f64,
        }
        let raw = Raw::deserialize(deserializer)?;
        Ok(BBoxXYXY::from_xyxy(raw.xmin, raw.ymin, raw.xmax, raw.ymax))
    }
}
