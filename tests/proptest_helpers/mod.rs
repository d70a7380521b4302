#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use vocmap::ir::{BBoxXYXY, DetectionRecord, Pixel};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Image sizes seen in dashcam data, never smaller than 2x2.
pub fn arb_image_size() -> BoxedStrategy<(u32, u32)> {
    (2u32..=4096, 2u32..=4096).boxed()
}

/// 1-based integer pixel corners `(x1, y1, x2, y2)` inside a `width x height` image.
pub fn arb_one_based_corners(width: u32, height: u32) -> BoxedStrategy<[u32; 4]> {
    (1..=width, 1..=width, 1..=height, 1..=height)
        .prop_map(|(xa, xb, ya, yb)| [xa.min(xb), ya.min(yb), xa.max(xb), ya.max(yb)])
        .boxed()
}

/// A 0-based pixel box with integer corners inside a 2000x2000 canvas.
pub fn arb_pixel_box() -> BoxedStrategy<BBoxXYXY<Pixel>> {
    (0u32..2000, 0u32..2000, 1u32..300, 1u32..300)
        .prop_map(|(x, y, w, h)| {
            BBoxXYXY::from_xyxy(x as f64, y as f64, (x + w) as f64, (y + h) as f64)
        })
        .boxed()
}

pub fn arb_image_id() -> BoxedStrategy<String> {
    "[a-z0-9_]{1,8}(/[a-z0-9_]{1,8})?".boxed()
}

/// Records with 0-based boxes and scores in `[0, 1]`.
pub fn arb_records(ids: Vec<String>, max: usize) -> BoxedStrategy<Vec<DetectionRecord>> {
    prop::collection::vec(
        (prop::sample::select(ids), 0.0f64..=1.0, arb_pixel_box()),
        0..=max,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(image_id, score, bbox)| DetectionRecord {
                image_id,
                score,
                bbox,
            })
            .collect()
    })
    .boxed()
}
