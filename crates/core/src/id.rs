// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier types.
//!
//! A [`JobId`] ("MoleQueue id") is a registry-unique, monotonically
//! increasing positive integer assigned at registration. It is never
//! reused, even after the job it names is archived and removed from
//! memory (§3 of the spec).
//!
//! A [`QueueJobId`] ("queue id") is the backend's own identifier for a
//! submitted job — a PID for the local queue, a scheduler job id such as
//! `"12345.server"` for a remote queue. It is only meaningful while the
//! backend still knows about the job, so it is always optional on a
//! [`crate::Job`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Server-assigned, registry-unique identifier for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(i64);

impl JobId {
    /// Construct a `JobId` from a raw value. Only the registry's
    /// [`IdAllocator`] should normally mint new ids; this is for
    /// reconstructing ids loaded from disk.
    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic counter handing out fresh [`JobId`]s.
///
/// After a crash-recovery reload, the counter must be reset to
/// `max(loaded ids) + 1` so that ids are never reused (§4.3 invariant).
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicI64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: AtomicI64::new(1) }
    }

    /// Allocate the next id and advance the counter.
    pub fn allocate(&self) -> JobId {
        JobId(self.next.fetch_add(1, Ordering::SeqCst))
    }

    /// Reset the counter so the next allocation is strictly greater than
    /// every id currently known to the registry.
    pub fn observe_loaded(&self, loaded: impl Iterator<Item = JobId>) {
        let max = loaded.map(|id| id.0).max().unwrap_or(0);
        loop {
            let current = self.next.load(Ordering::SeqCst);
            let candidate = max + 1;
            if candidate <= current {
                break;
            }
            if self
                .next
                .compare_exchange(current, candidate, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                break;
            }
        }
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Backend-assigned identifier, valid only while the backend still
/// tracks the job (a PID, or a scheduler job id like `"12345.server"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueJobId(String);

impl QueueJobId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u32> for QueueJobId {
    fn from(pid: u32) -> Self {
        Self(pid.to_string())
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
