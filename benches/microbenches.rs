//! Criterion microbenches for groundkit tag scanning and record conversion.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure the performance of:
//! - Tag extraction from answer text (extract_objects)
//! - Raw record parsing (raw_record_from_slice)
//! - Grounding conversion including box restoration (RecordConverter::convert)

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

use groundkit::conversion::{ConvertOptions, RecordConverter};
use groundkit::ir::io_json::raw_record_from_slice;
use groundkit::ir::Normalized;
use groundkit::tags::extract_objects;

// Include test fixtures at compile time (no file I/O during benchmark)
const GROUNDING_FIXTURE: &str = include_str!("../tests/fixtures/datasets/demo/grounding.json");

const ANSWER: &str = "<ref>person</ref><box>[[120,250,300,740]]</box>,\
<ref>car</ref><box>[[500,400,900,700],[50,420,180,560]]</box>,\
<ref>bicycle</ref><pred>next to</pred><box>[[10,10,200,200]]</box>";

/// Benchmark tag extraction from an answer string.
fn bench_extract_objects(c: &mut Criterion) {
    let mut group = c.benchmark_group("tags");
    group.throughput(Throughput::Bytes(ANSWER.len() as u64));

    group.bench_function("extract_objects", |b| {
        b.iter(|| {
            let groups = extract_objects::<Normalized>(black_box(ANSWER)).unwrap();
            black_box(groups)
        })
    });

    group.finish();
}

/// Benchmark raw record parsing from a byte slice.
fn bench_raw_record_parse(c: &mut Criterion) {
    let bytes = GROUNDING_FIXTURE.as_bytes();
    let mut group = c.benchmark_group("raw_record");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("raw_record_from_slice", |b| {
        b.iter(|| {
            let record = raw_record_from_slice(black_box(bytes)).unwrap();
            black_box(record)
        })
    });

    group.finish();
}

/// Benchmark grounding conversion.
///
/// The record is parsed once outside the timed region.
fn bench_convert_grounding(c: &mut Criterion) {
    let record = raw_record_from_slice(GROUNDING_FIXTURE.as_bytes())
        .expect("Failed to parse grounding fixture");
    let converter =
        RecordConverter::new(ConvertOptions::default()).expect("Failed to build converter");

    let mut group = c.benchmark_group("convert");
    group.throughput(Throughput::Elements(1));

    group.bench_function("grounding_record", |b| {
        b.iter(|| {
            let records = converter.convert(black_box(&record)).unwrap();
            black_box(records)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_extract_objects,
    bench_raw_record_parse,
    bench_convert_grounding,
);
criterion_main!(benches);
