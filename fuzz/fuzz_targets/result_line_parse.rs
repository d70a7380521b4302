//! Fuzz target for detection result line parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vocmap::ir::io_results::fuzz_parse_result_line;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    let _ = fuzz_parse_result_line(line);
});
