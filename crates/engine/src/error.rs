// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mq_adapters::BackendError;
use mq_core::{JobError, JobId};
use mq_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Job(#[from] JobError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("job {0} references a file spec that could not be materialized: {1}")]
    FileSpecInvalid(JobId, String),
    #[error("failed to create local working directory {path}: {source}")]
    WorkingDirectory { path: String, source: std::io::Error },
    #[error("failed to spawn local process: {0}")]
    Spawn(std::io::Error),
}
