#![allow(dead_code)]

use std::fs;
use std::path::Path;

use serde_json::json;

/// A grounding record whose answer localizes `key` on a 100x200 image.
pub fn grounding_record(image: &str, key: &str, payload: &str) -> serde_json::Value {
    json!({
        "image": image,
        "height": 100,
        "width": 200,
        "conversations": [
            {"from": "human", "value": format!("<image>\n找到 {key}")},
            {"from": "gpt", "value": format!("<ref>{key}</ref><box>{payload}</box>")}
        ]
    })
}

/// A plain two-turn QA record without size information.
pub fn qa_record(image: &str, question: &str, answer: &str) -> serde_json::Value {
    json!({
        "image": image,
        "conversations": [
            {"from": "human", "value": format!("<image>\n{question}")},
            {"from": "gpt", "value": answer}
        ]
    })
}

pub fn write_record(path: &Path, record: &serde_json::Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, serde_json::to_vec_pretty(record).expect("serialize record"))
        .expect("write record file");
}

pub fn read_jsonl(path: &Path) -> Vec<serde_json::Value> {
    fs::read_to_string(path)
        .expect("read jsonl")
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json line"))
        .collect()
}
