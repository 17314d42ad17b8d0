// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`LogEntry`] records kept by the daemon-wide logger (§4.4).

use crate::id::JobId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Debug,
    Notification,
    Warning,
    Error,
}

crate::simple_display! {
    Severity {
        Debug => "Debug",
        Notification => "Notification",
        Warning => "Warning",
        Error => "Error",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp_ms: i64,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub molequeue_id: Option<JobId>,
}

impl LogEntry {
    pub fn new(timestamp_ms: i64, severity: Severity, message: impl Into<String>) -> Self {
        Self { timestamp_ms, severity, message: message.into(), molequeue_id: None }
    }

    pub fn with_job(mut self, id: JobId) -> Self {
        self.molequeue_id = Some(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_without_job_has_no_molequeue_id() {
        let e = LogEntry::new(0, Severity::Warning, "orphan keyword $$foo$$");
        assert!(e.molequeue_id.is_none());
    }

    #[test]
    fn with_job_attaches_id() {
        let e = LogEntry::new(0, Severity::Error, "boom").with_job(JobId::from_raw(7));
        assert_eq!(e.molequeue_id, Some(JobId::from_raw(7)));
    }

    #[test]
    fn severities_order_debug_below_error() {
        assert!(Severity::Debug < Severity::Error);
        assert!(Severity::Notification < Severity::Warning);
    }
}
