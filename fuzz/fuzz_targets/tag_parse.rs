//! Fuzz target for inline tag scanning.
//!
//! This fuzzer feeds arbitrary text to the tag extractor and the box span
//! rewriter, checking for panics, crashes, or hangs.

#![no_main]

use groundkit::tags::fuzz_scan_text;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let _ = fuzz_scan_text(text);
});
