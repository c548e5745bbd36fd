//! Fuzz target for raw annotation record parsing and conversion.
//!
//! This fuzzer feeds arbitrary byte sequences to the record parser and runs
//! any record that decodes through the converter.

#![no_main]

use groundkit::conversion::convert_record;
use groundkit::conversion::ConvertOptions;
use groundkit::ir::io_json::raw_record_from_slice;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(record) = raw_record_from_slice(data) {
        let _ = convert_record(&record, &ConvertOptions::default());
    }
});
