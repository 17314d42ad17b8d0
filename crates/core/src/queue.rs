// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`Queue`] configuration (§3, §6 storage layout).

use crate::program::Program;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueType {
    Local,
    Pbs,
    Sge,
    Slurm,
    Oar,
    Uit,
}

impl QueueType {
    pub fn is_remote(self) -> bool {
        !matches!(self, QueueType::Local)
    }
}

crate::simple_display! {
    QueueType {
        Local => "local",
        Pbs => "pbs",
        Sge => "sge",
        Slurm => "slurm",
        Oar => "oar",
        Uit => "uit",
    }
}

/// Remote-only connection settings, present iff `queue_type.is_remote()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    pub host: String,
    pub username: String,
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
    /// Working-directory base on the remote host, under which one
    /// subdirectory per job id is created.
    pub working_directory_base: String,
    pub submission_command: String,
    pub queue_status_command: String,
    pub cancellation_command: String,
    #[serde(default)]
    pub default_max_wall_time_minutes: Option<u32>,
    #[serde(default = "default_poll_interval_secs")]
    pub queue_poll_interval_secs: u64,
    /// Consecutive pipeline-stage failures before a job is abandoned to
    /// `Error` (§4.7, §9 design notes: made configurable rather than
    /// the source's hard-coded `3`).
    #[serde(default = "default_max_submission_failures")]
    pub max_submission_failures: u32,
}

fn default_ssh_port() -> u16 {
    22
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_max_submission_failures() -> u32 {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Queue {
    pub name: String,
    pub queue_type: QueueType,
    /// Shell-script skeleton with `$$keyword$$`/`$$$keyword$$$`
    /// placeholders (§4.5).
    pub launch_template: String,
    pub launch_script_name: String,
    #[serde(default)]
    pub programs: IndexMap<String, Program>,
    #[serde(default)]
    pub remote: Option<RemoteSettings>,
}

impl Queue {
    pub fn new_local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue_type: QueueType::Local,
            launch_template: "#!/bin/sh\n$$programExecution$$\n".to_string(),
            launch_script_name: "launcher.sh".to_string(),
            programs: IndexMap::new(),
            remote: None,
        }
    }

    pub fn program(&self, name: &str) -> Option<&Program> {
        self.programs.get(name)
    }

    /// The queue export view (`spec.md` §6): the same shape as the
    /// on-disk `.mqq` file. `Queue` never carries instance paths or job
    /// id maps in the first place, so export is just a clone; kept as
    /// its own method so the `exportQueue` RPC has one named seam if a
    /// future field ever needs to be redacted before export.
    pub fn to_export(&self) -> Queue {
        self.clone()
    }
}

/// Alphanumeric-with-internal-single-spaces, as required of queue and
/// program names (§3). No leading/trailing space, no double space.
pub fn is_valid_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let mut prev_was_space = false;
    for (i, c) in name.chars().enumerate() {
        if c == ' ' {
            if i == 0 || prev_was_space {
                return false;
            }
            prev_was_space = true;
        } else if c.is_ascii_alphanumeric() {
            prev_was_space = false;
        } else {
            return false;
        }
    }
    !prev_was_space
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_alphanumeric_with_single_internal_spaces() {
        assert!(is_valid_name("local"));
        assert!(is_valid_name("My Queue 2"));
    }

    #[test]
    fn rejects_leading_trailing_and_double_spaces() {
        assert!(!is_valid_name(" leading"));
        assert!(!is_valid_name("trailing "));
        assert!(!is_valid_name("double  space"));
    }

    #[test]
    fn rejects_empty_and_punctuation() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("has-dash"));
        assert!(!is_valid_name("has/slash"));
    }

    #[test]
    fn remote_flag_tracks_queue_type() {
        assert!(!QueueType::Local.is_remote());
        assert!(QueueType::Pbs.is_remote());
        assert!(QueueType::Uit.is_remote());
    }
}
