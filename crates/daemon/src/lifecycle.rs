// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup and shutdown sequencing (§4.1 transport contract,
//! "Failure").
//!
//! Grounded on the teacher's `crates/daemon/src/lifecycle/startup.rs`:
//! acquire the single-instance lock first (opened without truncating,
//! so a second launch never wipes the running daemon's PID before
//! learning it lost the race), write the PID only once the lock is
//! held, create the rest of the working directory, and bind the
//! socket dead last — only after every other validation step has
//! passed. Cleanup-on-failure runs for every startup error except a
//! lock failure, since that means another instance legitimately owns
//! the working directory and its files must be left alone.

use crate::config::Config;
use fs2::FileExt;
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;
use thiserror::Error;
use tokio::net::UnixListener;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to create working directory {path}: {source}")]
    CreateDir { path: PathBuf, source: std::io::Error },

    #[error("another instance is already running (failed to acquire lock at {path}): {source}")]
    LockFailed { path: PathBuf, source: std::io::Error },

    #[error("failed to bind local endpoint at {path}: {source}")]
    BindFailed { path: PathBuf, source: std::io::Error },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Holds the open, locked lock file for the daemon's lifetime — the
/// `fs2` exclusive lock (and the PID it records) is only meaningful
/// while this handle stays open.
pub struct StartupResult {
    pub listener: UnixListener,
    _lock_file: std::fs::File,
}

/// Run the full startup sequence, cleaning up any partially-created
/// state on failure (except when the failure was losing the
/// single-instance lock race).
pub fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config) {
        Ok(result) => Ok(result),
        Err(e @ LifecycleError::LockFailed { .. }) => Err(e),
        Err(e) => {
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    for dir in [
        config.working_directory_base.join("jobs"),
        config.working_directory_base.join("log"),
        config.working_directory_base.join("config").join("queues"),
        config.ipc_dir(),
    ] {
        std::fs::create_dir_all(&dir).map_err(|e| LifecycleError::CreateDir { path: dir, source: e })?;
    }

    let lock_path = config.lock_path();
    let mut lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| LifecycleError::LockFailed { path: lock_path.clone(), source: e })?;
    lock_file
        .try_lock_exclusive()
        .map_err(|e| LifecycleError::LockFailed { path: lock_path.clone(), source: e })?;
    lock_file.set_len(0)?;
    lock_file.seek(SeekFrom::Start(0))?;
    writeln!(lock_file, "{}", std::process::id())?;
    lock_file.flush()?;

    let socket_path = config.socket_path();
    let listener = bind_socket(&socket_path, config.force_start)?;

    Ok(StartupResult { listener, _lock_file: lock_file })
}

/// Bind last, after every other validation step has succeeded. A
/// stale socket file from an unclean previous shutdown is removed
/// before the first attempt; `force_start` additionally retries once
/// more after a bind failure, removing whatever is at the path again
/// (§4.1 `AddressInUseError`/`forceStart()`).
fn bind_socket(socket_path: &PathBuf, force_start: bool) -> Result<UnixListener, LifecycleError> {
    remove_stale_socket(socket_path);
    match UnixListener::bind(socket_path) {
        Ok(listener) => Ok(listener),
        Err(e) if force_start => {
            remove_stale_socket(socket_path);
            UnixListener::bind(socket_path).map_err(|e| LifecycleError::BindFailed { path: socket_path.clone(), source: e })
        }
        Err(e) => Err(LifecycleError::BindFailed { path: socket_path.clone(), source: e }),
    }
}

fn remove_stale_socket(socket_path: &PathBuf) {
    if socket_path.exists() {
        let _ = std::fs::remove_file(socket_path);
    }
}

fn cleanup_on_failure(config: &Config) {
    let _ = std::fs::remove_file(config.socket_path());
    let _ = std::fs::remove_file(config.lock_path());
}

/// Final shutdown sequence: remove the socket file so a later
/// daemon launch doesn't see a stale endpoint, then the lock file (the
/// `fs2` lock itself releases when `StartupResult`'s file handle
/// drops).
pub fn cleanup_on_shutdown(config: &Config) {
    let _ = std::fs::remove_file(config.socket_path());
    let _ = std::fs::remove_file(config.lock_path());
}
