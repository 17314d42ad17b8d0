// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash-safe JSON file writes: write to a sibling temp file, `fsync`,
//! then rename over the destination. A reader never observes a
//! partially-written file, and a crash mid-write leaves the previous
//! version intact.

use crate::error::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    let tmp_path = tmp_sibling(path);
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| StorageError::json(path, e))?;
    {
        let file = std::fs::File::create(&tmp_path).map_err(|e| StorageError::io(&tmp_path, e))?;
        use std::io::Write;
        (&file).write_all(&bytes).map_err(|e| StorageError::io(&tmp_path, e))?;
        file.sync_all().map_err(|e| StorageError::io(&tmp_path, e))?;
    }
    std::fs::rename(&tmp_path, path).map_err(|e| StorageError::io(path, e))?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let bytes = std::fs::read(path).map_err(|e| StorageError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| StorageError::json(path, e))
}

pub fn read_json_if_exists<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}

fn tmp_sibling(path: &Path) -> std::path::PathBuf {
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{file_name}.tmp-{}", std::process::id()))
}
