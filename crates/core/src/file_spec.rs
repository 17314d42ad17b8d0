// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`FileSpec`] — how the daemon should obtain an input file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A tagged union describing how to obtain an input file.
///
/// `Path` names a file already present on the daemon host (absolute or
/// workdir-relative). `Contents` carries the bytes inline, used when the
/// client has no shared filesystem with the daemon. `Invalid` is its own
/// variant rather than an error return, so a job carrying a malformed
/// file spec can still be constructed and then rejected explicitly
/// during submission (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileSpec {
    Path { path: PathBuf },
    Contents { filename: String, contents: Vec<u8> },
    Invalid,
}

impl FileSpec {
    /// Build a `FileSpec` from a loosely-typed JSON value the way a
    /// submitted job's params would carry one: either `{"path": "..."}`
    /// or `{"filename": "...", "contents": "..."}`. Anything else is
    /// `Invalid`, never a deserialization error — callers decide whether
    /// an invalid spec should fail submission.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let obj = match value.as_object() {
            Some(obj) => obj,
            None => return FileSpec::Invalid,
        };
        if let Some(path) = obj.get("path").and_then(|v| v.as_str()) {
            if path.is_empty() {
                return FileSpec::Invalid;
            }
            return FileSpec::Path { path: PathBuf::from(path) };
        }
        if let (Some(filename), Some(contents)) = (
            obj.get("filename").and_then(|v| v.as_str()),
            obj.get("contents").and_then(|v| v.as_str()),
        ) {
            if filename.is_empty() {
                return FileSpec::Invalid;
            }
            return FileSpec::Contents {
                filename: filename.to_string(),
                contents: contents.as_bytes().to_vec(),
            };
        }
        FileSpec::Invalid
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, FileSpec::Invalid)
    }

    /// The filename this spec will materialize as, if determinable
    /// without touching the filesystem.
    pub fn filename(&self) -> Option<String> {
        match self {
            FileSpec::Path { path } => path.file_name().map(|n| n.to_string_lossy().into_owned()),
            FileSpec::Contents { filename, .. } => Some(filename.clone()),
            FileSpec::Invalid => None,
        }
    }
}

#[cfg(test)]
#[path = "file_spec_tests.rs"]
mod tests;
