// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted shape of the daemon-wide [`mq_core::LogEntry`] ring buffer
//! (§4.4, §6): `{ maxEntries, entries: [...] }` at `log/log.json`.

use crate::atomic::{read_json_if_exists, write_json_atomic};
use crate::error::StorageError;
use crate::paths;
use mq_core::LogEntry;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedLog {
    #[serde(rename = "maxEntries")]
    pub max_entries: usize,
    pub entries: Vec<LogEntry>,
}

pub fn save(base: &Path, log: &PersistedLog) -> Result<(), StorageError> {
    write_json_atomic(&paths::log_path(base), log)
}

/// Loads the persisted log if present, otherwise an empty buffer capped
/// at `default_max_entries`.
pub fn load(base: &Path, default_max_entries: usize) -> Result<PersistedLog, StorageError> {
    let loaded: Option<PersistedLog> = read_json_if_exists(&paths::log_path(base))?;
    Ok(loaded.unwrap_or(PersistedLog { max_entries: default_max_entries, entries: Vec::new() }))
}
