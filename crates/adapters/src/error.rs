// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("remote command exited {exit_code}: {output}")]
    NonZeroExit { exit_code: i32, output: String },

    #[error("could not parse backend output: {0}")]
    ParseFailure(String),

    #[error("refusing to operate on path that simplifies to \"/\": {0}")]
    UnsafeRootPath(String),

    #[error("transport not configured: {0}")]
    NotConfigured(&'static str),
}
