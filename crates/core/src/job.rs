// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`Job`] and its [`JobState`] state machine (§3).

use crate::file_spec::FileSpec;
use crate::id::{JobId, QueueJobId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The central job state machine.
///
/// Transitions are monotonic except `Error -> Queued*` (a retry).
/// `Finished` and `Canceled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    None,
    Accepted,
    QueuedLocal,
    RunningLocal,
    Submitted,
    QueuedRemote,
    RunningRemote,
    Finished,
    Canceled,
    Error,
}

crate::simple_display! {
    JobState {
        None => "None",
        Accepted => "Accepted",
        QueuedLocal => "QueuedLocal",
        RunningLocal => "RunningLocal",
        Submitted => "Submitted",
        QueuedRemote => "QueuedRemote",
        RunningRemote => "RunningRemote",
        Finished => "Finished",
        Canceled => "Canceled",
        Error => "Error",
    }
}

impl JobState {
    /// Terminal states are never left once entered (the job is archived).
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Finished | JobState::Canceled)
    }

    /// Whether `self -> next` is a legal transition per the state
    /// diagram in §3. Monotonic forward progress is always allowed;
    /// `Error -> Queued*` is the one sanctioned retry; terminal states
    /// accept no further transitions; same-state is a no-op the
    /// registry short-circuits before ever calling this.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (None, Accepted) => true,
            (Accepted, QueuedLocal | Submitted | Error) => true,
            (QueuedLocal, RunningLocal | Canceled | Error) => true,
            (RunningLocal, Finished | Canceled | Error) => true,
            (Submitted, QueuedRemote | RunningRemote | Error) => true,
            (QueuedRemote, RunningRemote | Canceled | Error) => true,
            (RunningRemote, Finished | Canceled | Error) => true,
            (Error, QueuedLocal | QueuedRemote) => true,
            (_, Canceled) => true,
            _ => false,
        }
    }
}

impl Default for JobState {
    fn default() -> Self {
        JobState::None
    }
}

/// A job record. The registry is its sole owner (§3 "Ownership");
/// everything else holds a non-owning [`JobId`] and re-looks the record
/// up before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub queue_name: String,
    pub program_name: String,
    #[serde(default)]
    pub description: String,
    pub cores: u32,
    #[serde(default)]
    pub max_wall_time_minutes: Option<u32>,
    pub input_file: FileSpec,
    #[serde(default)]
    pub additional_input_files: Vec<FileSpec>,
    pub local_working_directory: PathBuf,
    #[serde(default)]
    pub output_directory: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub retrieve_output: bool,
    #[serde(default)]
    pub clean_local_working_directory: bool,
    #[serde(default)]
    pub clean_remote_files: bool,
    #[serde(default)]
    pub queue_job_id: Option<QueueJobId>,
    #[serde(default)]
    pub state: JobState,
    /// Consecutive remote-pipeline failures since the last success
    /// (§4.7 retry budget; reset to 0 on a successful submission).
    #[serde(default)]
    pub failure_count: u32,
}

fn default_true() -> bool {
    true
}

impl Job {
    /// Move the job to `next`, returning the previous state if this was
    /// a real (non-no-op) transition the caller should log and notify
    /// for. Returns `None` if `next == self.state` (a no-op, per §4.3
    /// `set-state`).
    pub fn transition(&mut self, next: JobState) -> Option<JobState> {
        if self.state == next {
            return None;
        }
        let previous = self.state;
        self.state = next;
        Some(previous)
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
