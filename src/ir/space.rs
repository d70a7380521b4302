//! Coordinate space marker types.
//!
//! Zero-sized markers that keep pixel boxes (used for evaluation and result
//! files) apart from normalized boxes (used as training targets).

use std::fmt;

/// Marker for 0-based pixel coordinates.
///
/// Annotation files store 1-based pixels; the parser shifts them by one
/// before they reach this space.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker for coordinates divided by the image width (x) or height (y).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Normalized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
