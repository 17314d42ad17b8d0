// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`QueueManager`] — the daemon's configured [`Queue`]s, loaded from
//! and persisted to `config/queues/*.mqq` (§6 storage layout).
//!
//! Grounded on `mq-storage::queue_store` for the persistence shape and
//! on the teacher's `indexmap`-ordered registries (queues must list in
//! configuration order for `listQueues`, §4.8).

use crate::error::EngineError;
use indexmap::IndexMap;
use mq_core::{is_valid_name, JobError, Program, Queue};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};

pub struct QueueManager {
    base_dir: PathBuf,
    queues: RwLock<IndexMap<String, Queue>>,
}

impl QueueManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into(), queues: RwLock::new(IndexMap::new()) }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Load every `*.mqq` file in `config/queues/`, replacing the
    /// current in-memory set. Returns the number of malformed files
    /// skipped.
    pub fn load_from_disk(&self) -> usize {
        let (loaded, skipped) = mq_storage::queue_store::load_all_queues(&self.base_dir);
        let mut queues = self.queues.write();
        queues.clear();
        for queue in loaded {
            queues.insert(queue.name.clone(), queue);
        }
        skipped
    }

    pub fn add_queue(&self, queue: Queue) -> Result<(), EngineError> {
        if !is_valid_name(&queue.name) {
            return Err(JobError::InvalidName(queue.name.clone()).into());
        }
        mq_storage::queue_store::save_queue(&self.base_dir, &queue)?;
        self.queues.write().insert(queue.name.clone(), queue);
        Ok(())
    }

    pub fn remove_queue(&self, name: &str) -> Result<(), EngineError> {
        mq_storage::queue_store::delete_queue(&self.base_dir, name)?;
        self.queues.write().shift_remove(name);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Queue> {
        self.queues.read().get(name).cloned()
    }

    pub fn program(&self, queue_name: &str, program_name: &str) -> Result<Program, EngineError> {
        Ok(self.queue_and_program(queue_name, program_name)?.1)
    }

    /// Fetch the queue and its program together under one lock, so a
    /// caller never has to assume the queue it just looked up is still
    /// there for a second call.
    pub fn queue_and_program(&self, queue_name: &str, program_name: &str) -> Result<(Queue, Program), EngineError> {
        let queues = self.queues.read();
        let queue = queues
            .get(queue_name)
            .ok_or_else(|| JobError::UnknownQueue(queue_name.to_string()))?;
        let program = queue
            .program(program_name)
            .cloned()
            .ok_or_else(|| JobError::UnknownProgram { queue: queue_name.to_string(), program: program_name.to_string() })?;
        Ok((queue.clone(), program))
    }

    /// `listQueues` result shape: an ordered map of queue name to its
    /// ordered program names (§4.8).
    pub fn list_queues(&self) -> IndexMap<String, Vec<String>> {
        self.queues
            .read()
            .iter()
            .map(|(name, queue)| (name.clone(), queue.programs.keys().cloned().collect()))
            .collect()
    }

    pub fn queue_names(&self) -> Vec<String> {
        self.queues.read().keys().cloned().collect()
    }
}
