// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced from the data model itself (not the RPC/transport
//! layers, which have their own error types downstream).

use crate::id::JobId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(JobId),

    #[error("illegal transition for job {id}: {from} -> {to}")]
    IllegalTransition { id: JobId, from: crate::job::JobState, to: crate::job::JobState },

    #[error("unknown queue {0:?}")]
    UnknownQueue(String),

    #[error("unknown program {program:?} on queue {queue:?}")]
    UnknownProgram { queue: String, program: String },

    #[error("invalid file specification")]
    InvalidFileSpec,

    #[error("invalid name {0:?}: must be alphanumeric with internal single spaces")]
    InvalidName(String),
}
