use std::path::Path;

use proptest::prelude::*;
use vocmap::classes::ClassList;
use vocmap::ir::io_annotation_txt::parse_annotation_str;
use vocmap::ir::{Annotation, Normalized, Pixel};

mod proptest_helpers;

fn sized_corners() -> impl Strategy<Value = (u32, u32, Vec<[u32; 4]>)> {
    proptest_helpers::arb_image_size().prop_flat_map(|(w, h)| {
        (
            Just(w),
            Just(h),
            prop::collection::vec(proptest_helpers::arb_one_based_corners(w, h), 0..8),
        )
    })
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn normalized_coordinates_stay_in_unit_range((w, h, boxes) in sized_corners()) {
        let classes = ClassList::d2city();
        let content: String = boxes
            .iter()
            .map(|[x1, y1, x2, y2]| format!("{x1} {y1} {x2} {y2} car\n"))
            .collect();

        let anns: Vec<Annotation<Normalized>> =
            parse_annotation_str(&content, Path::new("p.txt"), &classes, w as f64, h as f64)
                .expect("parse");
        prop_assert_eq!(anns.len(), boxes.len());
        for ann in &anns {
            for v in ann.bbox.to_array() {
                prop_assert!((0.0..=1.0).contains(&v), "{} outside [0,1]", v);
            }
            prop_assert!(ann.bbox.is_ordered());
        }
    }

    #[test]
    fn pixel_mode_truncates_then_shifts(
        base in prop::collection::vec((1u32..5000, 0u32..5000, 1u32..5000, 0u32..5000), 1..6),
        frac in prop::collection::vec(0.0f64..0.99, 4),
    ) {
        let classes = ClassList::d2city();
        let rows: Vec<[f64; 4]> = base
            .iter()
            .map(|&(x, dx, y, dy)| {
                [
                    x as f64 + frac[0],
                    y as f64 + frac[1],
                    (x + dx) as f64 + frac[2],
                    (y + dy) as f64 + frac[3],
                ]
            })
            .collect();
        let content: String = rows
            .iter()
            .map(|r| format!("{} {} {} {} bus\n", r[0], r[1], r[2], r[3]))
            .collect();

        let anns: Vec<Annotation<Pixel>> =
            parse_annotation_str(&content, Path::new("p.txt"), &classes, 1.0, 1.0)
                .expect("parse");
        for (ann, row) in anns.iter().zip(&rows) {
            let expected = row.map(|v| v.trunc() - 1.0);
            prop_assert_eq!(ann.bbox.to_array(), expected);
            prop_assert_eq!(ann.label, 3);
        }
    }
}
