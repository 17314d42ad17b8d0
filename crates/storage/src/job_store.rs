// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job persistence: one `mqjobinfo.json` per job directory (§4.3,
//! §6). Damaged files are skipped, not fatal — a corrupt job shouldn't
//! prevent the daemon from starting.

use crate::atomic::{read_json, write_json_atomic};
use crate::paths;
use mq_core::{Job, JobId};
use std::path::Path;

/// Persist `job`'s current state to its `mqjobinfo.json`.
pub fn save_job(base: &Path, job: &Job) -> Result<(), crate::error::StorageError> {
    let path = paths::job_info_path(base, job.id);
    write_json_atomic(&path, job)
}

/// Rename `mqjobinfo.json` to `mqjobinfo-archived.json` so a later
/// [`load_from_disk`] skips it (§4.3 `remove`).
pub fn archive_job(base: &Path, id: JobId) -> Result<(), crate::error::StorageError> {
    let active = paths::job_info_path(base, id);
    let archived = paths::job_info_archived_path(base, id);
    std::fs::rename(&active, &archived).map_err(|e| crate::error::StorageError::io(&active, e))
}

/// Scan immediate subdirectories of `<base>/jobs/` and reconstruct every
/// job whose `mqjobinfo.json` parses cleanly. Directories holding only
/// `mqjobinfo-archived.json` (or neither file) are skipped silently,
/// since archival means "do not reload".
///
/// Returns `(jobs, skipped_count)` so the caller can log how many
/// damaged records it ignored (§4.3 "damaged files are skipped with an
/// Error log entry").
pub fn load_from_disk(base: &Path) -> (Vec<Job>, usize) {
    let dir = paths::jobs_dir(base);
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(_) => return (Vec::new(), 0),
    };

    let mut jobs = Vec::new();
    let mut skipped = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let info_path = path.join(paths::JOB_INFO_FILENAME);
        if !info_path.is_file() {
            continue;
        }
        match read_json::<Job>(&info_path) {
            Ok(job) => jobs.push(job),
            Err(e) => {
                tracing::warn!(path = %info_path.display(), error = %e, "skipping damaged job record");
                skipped += 1;
            }
        }
    }
    (jobs, skipped)
}
