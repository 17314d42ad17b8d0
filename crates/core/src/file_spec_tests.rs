// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn parses_path_reference() {
    let spec = FileSpec::from_json(&json!({"path": "input.dat"}));
    assert_eq!(spec, FileSpec::Path { path: PathBuf::from("input.dat") });
    assert!(spec.is_valid());
}

#[test]
fn parses_inline_contents() {
    let spec = FileSpec::from_json(&json!({"filename": "in.dat", "contents": "hi"}));
    assert_eq!(
        spec,
        FileSpec::Contents { filename: "in.dat".into(), contents: b"hi".to_vec() }
    );
    assert_eq!(spec.filename().as_deref(), Some("in.dat"));
}

#[test]
fn rejects_empty_path_as_invalid() {
    let spec = FileSpec::from_json(&json!({"path": ""}));
    assert_eq!(spec, FileSpec::Invalid);
    assert!(!spec.is_valid());
}

#[test]
fn rejects_neither_shape_as_invalid() {
    let spec = FileSpec::from_json(&json!({"foo": "bar"}));
    assert_eq!(spec, FileSpec::Invalid);
}

#[test]
fn rejects_non_object_as_invalid() {
    let spec = FileSpec::from_json(&json!("just a string"));
    assert_eq!(spec, FileSpec::Invalid);
}

#[test]
fn round_trips_through_serde() {
    let spec = FileSpec::Contents { filename: "a.txt".into(), contents: vec![1, 2, 3] };
    let json = serde_json::to_string(&spec).expect("serialize");
    let back: FileSpec = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(spec, back);
}
