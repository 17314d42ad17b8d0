// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide [`Logger`] ring buffer (§4.4).
//!
//! Grounded on the teacher's single shared-state-behind-a-mutex pattern
//! (`crates/engine/src/job_logger.rs`/`agent_logger.rs` — an append-only
//! log with a capped buffer and observer callbacks), adapted to the
//! domain's `LogEntry`/`Severity` types and the two named log events
//! (`spec.md` §11 supplemented features).

use mq_core::{JobId, LogEntry, Severity};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;

pub const DEFAULT_MAX_ENTRIES: usize = 1000;

#[derive(Debug, Clone)]
pub enum LogEvent {
    FirstNewErrorOccurred,
    NewErrorCountReset,
}

struct LoggerState {
    max_entries: usize,
    entries: Vec<LogEntry>,
    new_error_count: u64,
    silenced: bool,
}

/// Append-only ring buffer of [`LogEntry`] with a resettable new-error
/// counter. Shared across the registry, the executors, and the
/// dispatcher via `Arc<Logger>`.
pub struct Logger {
    state: Mutex<LoggerState>,
    events: broadcast::Sender<LogEvent>,
}

impl Logger {
    pub fn new(max_entries: usize) -> Arc<Self> {
        let (events, _rx) = broadcast::channel(32);
        Arc::new(Self {
            state: Mutex::new(LoggerState {
                max_entries: max_entries.max(1),
                entries: Vec::new(),
                new_error_count: 0,
                silenced: false,
            }),
            events,
        })
    }

    pub fn from_persisted(max_entries: usize, entries: Vec<LogEntry>) -> Arc<Self> {
        let logger = Self::new(max_entries);
        {
            let mut state = logger.state.lock();
            state.entries = entries;
        }
        logger
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.events.subscribe()
    }

    pub fn set_silenced(&self, silenced: bool) {
        self.state.lock().silenced = silenced;
    }

    pub fn log(&self, timestamp_ms: i64, severity: Severity, message: impl Into<String>) {
        self.log_entry(LogEntry::new(timestamp_ms, severity, message));
    }

    pub fn log_for_job(&self, timestamp_ms: i64, severity: Severity, message: impl Into<String>, job_id: JobId) {
        self.log_entry(LogEntry::new(timestamp_ms, severity, message).with_job(job_id));
    }

    fn log_entry(&self, entry: LogEntry) {
        let is_error = entry.severity == Severity::Error;
        let transitioned_to_one;
        {
            let mut state = self.state.lock();
            state.entries.push(entry);
            if state.entries.len() > state.max_entries {
                let overflow = state.entries.len() - state.max_entries;
                state.entries.drain(0..overflow);
            }
            transitioned_to_one = if is_error {
                state.new_error_count += 1;
                state.new_error_count == 1
            } else {
                false
            };
        }
        let silenced = self.state.lock().silenced;
        if transitioned_to_one && !silenced {
            let _ = self.events.send(LogEvent::FirstNewErrorOccurred);
        }
    }

    pub fn reset_new_error_count(&self) {
        self.state.lock().new_error_count = 0;
        let _ = self.events.send(LogEvent::NewErrorCountReset);
    }

    pub fn new_error_count(&self) -> u64 {
        self.state.lock().new_error_count
    }

    pub fn max_entries(&self) -> usize {
        self.state.lock().max_entries
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.state.lock().entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mq_core::{Clock, FakeClock};

    #[test]
    fn overflow_drops_oldest_entries() {
        let logger = Logger::new(2);
        let clock = FakeClock::new();
        logger.log(clock.epoch_ms(), Severity::Debug, "one");
        logger.log(clock.epoch_ms(), Severity::Debug, "two");
        logger.log(clock.epoch_ms(), Severity::Debug, "three");
        let entries = logger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "two");
        assert_eq!(entries[1].message, "three");
    }

    #[test]
    fn error_increments_new_error_count() {
        let logger = Logger::new(10);
        let clock = FakeClock::new();
        logger.log(clock.epoch_ms(), Severity::Error, "boom");
        logger.log(clock.epoch_ms(), Severity::Error, "boom again");
        assert_eq!(logger.new_error_count(), 2);
    }

    #[tokio::test]
    async fn zero_to_one_transition_emits_first_new_error_event() {
        let logger = Logger::new(10);
        let clock = FakeClock::new();
        let mut rx = logger.subscribe();
        logger.log(clock.epoch_ms(), Severity::Error, "boom");
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, LogEvent::FirstNewErrorOccurred));
    }

    #[tokio::test]
    async fn silenced_logger_does_not_emit_first_error_event() {
        let logger = Logger::new(10);
        logger.set_silenced(true);
        let clock = FakeClock::new();
        let mut rx = logger.subscribe();
        logger.log(clock.epoch_ms(), Severity::Error, "boom");
        logger.log(clock.epoch_ms(), Severity::Debug, "unrelated");
        let result = rx.try_recv();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn reset_emits_event_and_zeroes_counter() {
        let logger = Logger::new(10);
        let clock = FakeClock::new();
        logger.log(clock.epoch_ms(), Severity::Error, "boom");
        let mut rx = logger.subscribe();
        logger.reset_new_error_count();
        assert_eq!(logger.new_error_count(), 0);
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, LogEvent::NewErrorCountReset));
    }
}
