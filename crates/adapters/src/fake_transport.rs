// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`RemoteShellTransport`] for exercising the pipeline engine
//! without a real cluster. Gated behind `test-support` so production
//! builds never link it in.

use crate::error::BackendError;
use crate::transport::{ExecOutput, RemoteShellTransport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub enum Call {
    Execute(String),
    CopyTo { local: PathBuf, remote: String },
    CopyFrom { remote: String, local: PathBuf },
    CopyDirTo { local: PathBuf, remote: String },
    CopyDirFrom { remote: String, local: PathBuf },
}

/// Canned responses for [`FakeTransport::execute`], consumed in order.
/// Running out of scripted responses is a test bug, not a transport
/// failure, so it panics loudly rather than silently succeeding.
pub struct FakeTransport {
    execute_responses: Mutex<VecDeque<Result<ExecOutput, BackendError>>>,
    calls: Mutex<Vec<Call>>,
    fail_copies: Mutex<bool>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            execute_responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            fail_copies: Mutex::new(false),
        }
    }

    pub fn push_execute_ok(&self, combined_output: impl Into<String>) {
        self.execute_responses.lock().push_back(Ok(ExecOutput {
            combined_output: combined_output.into(),
            exit_code: 0,
        }));
    }

    pub fn push_execute_error(&self, err: BackendError) {
        self.execute_responses.lock().push_back(Err(err));
    }

    pub fn set_fail_copies(&self, fail: bool) {
        *self.fail_copies.lock() = fail;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteShellTransport for FakeTransport {
    async fn execute(&self, command: &str) -> Result<ExecOutput, BackendError> {
        self.calls.lock().push(Call::Execute(command.to_string()));
        self.execute_responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| panic!("FakeTransport ran out of scripted responses for: {command}"))
    }

    async fn copy_to(&self, local_path: &Path, remote_path: &str) -> Result<(), BackendError> {
        self.calls.lock().push(Call::CopyTo { local: local_path.to_path_buf(), remote: remote_path.to_string() });
        self.maybe_fail()
    }

    async fn copy_from(&self, remote_path: &str, local_path: &Path) -> Result<(), BackendError> {
        self.calls.lock().push(Call::CopyFrom { remote: remote_path.to_string(), local: local_path.to_path_buf() });
        self.maybe_fail()
    }

    async fn copy_dir_to(&self, local_dir: &Path, remote_dir: &str) -> Result<(), BackendError> {
        self.calls.lock().push(Call::CopyDirTo { local: local_dir.to_path_buf(), remote: remote_dir.to_string() });
        self.maybe_fail()
    }

    async fn copy_dir_from(&self, remote_dir: &str, local_dir: &Path) -> Result<(), BackendError> {
        self.calls.lock().push(Call::CopyDirFrom { remote: remote_dir.to_string(), local: local_dir.to_path_buf() });
        self.maybe_fail()
    }
}

impl FakeTransport {
    fn maybe_fail(&self) -> Result<(), BackendError> {
        if *self.fail_copies.lock() {
            Err(BackendError::Transport("simulated transport failure".into()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_in_order() {
        let t = FakeTransport::new();
        t.push_execute_ok("12345.server\n");
        t.execute("qsub launcher.sh").await.unwrap();
        t.copy_to(Path::new("/tmp/a"), "/remote/a").await.unwrap();

        let calls = t.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(&calls[0], Call::Execute(c) if c == "qsub launcher.sh"));
    }

    #[tokio::test]
    async fn copies_fail_when_configured() {
        let t = FakeTransport::new();
        t.set_fail_copies(true);
        let result = t.copy_to(Path::new("/tmp/a"), "/remote/a").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    #[should_panic(expected = "ran out of scripted responses")]
    async fn exhausted_responses_panics() {
        let t = FakeTransport::new();
        let _ = t.execute("anything").await;
    }
}
