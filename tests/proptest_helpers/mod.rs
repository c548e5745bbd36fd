#![allow(dead_code)]

use groundkit::ir::{BBox, Normalized, Pixel};
use groundkit::tags::ObjectGroups;
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

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

/// A pixel box with ordered coordinates inside a `width` x `height` image.
pub fn arb_pixel_bbox_within(width: u32, height: u32) -> BoxedStrategy<BBox<Pixel>> {
    let (w, h) = (i64::from(width), i64::from(height));
    (0..=w, 0..=w, 0..=h, 0..=h)
        .prop_map(|(xa, xb, ya, yb)| {
            BBox::from_xyxy(xa.min(xb), ya.min(yb), xa.max(xb), ya.max(yb))
        })
        .boxed()
}

/// A normalized box on the `[0, scale]` grid.
pub fn arb_normalized_bbox(scale: u32) -> BoxedStrategy<BBox<Normalized>> {
    let s = i64::from(scale);
    (0..=s, 0..=s, 0..=s, 0..=s)
        .prop_map(|(xa, xb, ya, yb)| {
            BBox::from_xyxy(xa.min(xb), ya.min(yb), xa.max(xb), ya.max(yb))
        })
        .boxed()
}

/// Reference keys without tag delimiters or absence markers.
pub fn reference_key_strategy() -> BoxedStrategy<String> {
    proptest::string::string_regex("[a-z][a-z ]{0,11}")
        .expect("valid reference key regex")
        .boxed()
}

/// Object groups with distinct keys, each holding one to three boxes.
pub fn arb_object_groups(max_groups: usize) -> BoxedStrategy<ObjectGroups<Normalized>> {
    proptest::collection::btree_map(
        reference_key_strategy(),
        proptest::collection::vec(arb_normalized_bbox(999), 1..=3),
        1..=max_groups,
    )
    .prop_map(|entries| {
        let mut groups = ObjectGroups::new();
        for (key, boxes) in entries {
            groups.extend(&key, boxes);
        }
        groups
    })
    .boxed()
}
