//! Fuzz target for single-line annotation parsing.
//!
//! Feeds arbitrary UTF-8 lines to the `x1 y1 x2 y2 label` parser,
//! checking for panics, crashes, or hangs.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vocmap::ir::io_annotation_txt::fuzz_parse_annotation_line;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    let _ = fuzz_parse_annotation_line(line);
});
