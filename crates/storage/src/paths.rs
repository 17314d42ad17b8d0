// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layout under `<workingDirectoryBase>` (§6).

use mq_core::JobId;
use std::path::{Path, PathBuf};

pub const JOB_INFO_FILENAME: &str = "mqjobinfo.json";
pub const JOB_INFO_ARCHIVED_FILENAME: &str = "mqjobinfo-archived.json";
pub const LOG_FILENAME: &str = "log.json";
pub const QUEUE_CONFIG_EXTENSION: &str = "mqq";

pub fn jobs_dir(base: &Path) -> PathBuf {
    base.join("jobs")
}

pub fn job_dir(base: &Path, id: JobId) -> PathBuf {
    jobs_dir(base).join(id.get().to_string())
}

pub fn job_info_path(base: &Path, id: JobId) -> PathBuf {
    job_dir(base, id).join(JOB_INFO_FILENAME)
}

pub fn job_info_archived_path(base: &Path, id: JobId) -> PathBuf {
    job_dir(base, id).join(JOB_INFO_ARCHIVED_FILENAME)
}

pub fn log_dir(base: &Path) -> PathBuf {
    base.join("log")
}

pub fn log_path(base: &Path) -> PathBuf {
    log_dir(base).join(LOG_FILENAME)
}

pub fn queues_dir(base: &Path) -> PathBuf {
    base.join("config").join("queues")
}

pub fn queue_config_path(base: &Path, queue_name: &str) -> PathBuf {
    queues_dir(base).join(format!("{queue_name}.{QUEUE_CONFIG_EXTENSION}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_dir_is_named_after_the_raw_id() {
        let base = Path::new("/srv/molequeue");
        assert_eq!(job_dir(base, JobId::from_raw(42)), PathBuf::from("/srv/molequeue/jobs/42"));
    }

    #[test]
    fn queue_config_path_uses_mqq_extension() {
        let base = Path::new("/srv/molequeue");
        assert_eq!(
            queue_config_path(base, "local"),
            PathBuf::from("/srv/molequeue/config/queues/local.mqq")
        );
    }
}
