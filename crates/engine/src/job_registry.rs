// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`JobRegistry`] — sole owner of [`Job`] records (§4.3).
//!
//! Grounded on the teacher's `MaterializedState` (`crates/storage`) as
//! the single shared, mutex-guarded in-memory source of truth, combined
//! with `crates/engine`'s event-channel pattern for fanning state
//! changes out to observers (here: the dispatcher's notification
//! routing table and the remote pipeline).

use crate::error::EngineError;
use crate::logger::Logger;
use indexmap::IndexMap;
use mq_core::{IdAllocator, Job, JobId, JobState, JobError, QueueJobId, Severity};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub enum RegistryEvent {
    Added(Job),
    Removed(JobId),
    StateChanged { id: JobId, old: JobState, new: JobState },
    Updated(Job),
}

struct Inner {
    jobs: IndexMap<JobId, Job>,
    dirty: HashSet<JobId>,
}

/// Sole owner of [`Job`] records. `base_dir` is the daemon's working
/// directory base, `<base_dir>/jobs/<id>/` per job (§4.3 storage
/// layout).
pub struct JobRegistry {
    base_dir: PathBuf,
    ids: IdAllocator,
    inner: Mutex<Inner>,
    logger: Arc<Logger>,
    events: broadcast::Sender<RegistryEvent>,
}

impl JobRegistry {
    pub fn new(base_dir: impl Into<PathBuf>, logger: Arc<Logger>) -> Self {
        let (events, _rx) = broadcast::channel(256);
        Self {
            base_dir: base_dir.into(),
            ids: IdAllocator::new(),
            inner: Mutex::new(Inner { jobs: IndexMap::new(), dirty: HashSet::new() }),
            logger,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Allocate a fresh id without constructing a job yet. Callers that
    /// need to know a job's id before it starts emitting events (the
    /// dispatcher registers the id's notification route before calling
    /// [`Self::new_job_with_id`], so the very first `StateChanged` isn't
    /// raced by the notification router) should call this first.
    pub fn allocate_id(&self) -> JobId {
        self.ids.allocate()
    }

    /// `new-job`: allocate a fresh id, then build it via
    /// [`Self::new_job_with_id`].
    pub fn new_job(
        &self,
        timestamp_ms: i64,
        configure: impl FnOnce(&mut Job),
    ) -> Result<Job, EngineError> {
        self.new_job_with_id(self.allocate_id(), timestamp_ms, configure)
    }

    /// Build and register a job under a caller-chosen id (from
    /// [`Self::allocate_id`]): let `configure` set defaults (working
    /// directory, queue/program names — the "about-to-add" hook),
    /// insert at `None`, emit `Added`, then drive the `None -> Accepted`
    /// transition through [`Self::set_state`] so observers get the same
    /// `StateChanged` notification a later transition would (§3, §8
    /// scenario 1: a submission's very first notification is
    /// `None -> Accepted`).
    pub fn new_job_with_id(
        &self,
        id: JobId,
        timestamp_ms: i64,
        configure: impl FnOnce(&mut Job),
    ) -> Result<Job, EngineError> {
        let mut job = Job {
            id,
            queue_name: String::new(),
            program_name: String::new(),
            description: String::new(),
            cores: 1,
            max_wall_time_minutes: None,
            input_file: mq_core::FileSpec::Invalid,
            additional_input_files: Vec::new(),
            local_working_directory: self.base_dir.join("jobs").join(id.to_string()),
            output_directory: None,
            retrieve_output: true,
            clean_local_working_directory: false,
            clean_remote_files: false,
            queue_job_id: None,
            state: JobState::None,
            failure_count: 0,
        };
        configure(&mut job);

        {
            let mut inner = self.inner.lock();
            inner.jobs.insert(id, job.clone());
            inner.dirty.insert(id);
        }
        tracing::info!(job_id = %id, queue = %job.queue_name, "job accepted");
        let _ = self.events.send(RegistryEvent::Added(job.clone()));

        self.set_state(id, JobState::Accepted, timestamp_ms)?;
        let job = self.lookup(id).ok_or(JobError::NotFound(id))?;
        mq_storage::job_store::save_job(&self.base_dir, &job)?;
        Ok(job)
    }

    pub fn lookup(&self, id: JobId) -> Option<Job> {
        self.inner.lock().jobs.get(&id).cloned()
    }

    pub fn jobs_in_state(&self, state: JobState) -> Vec<Job> {
        self.inner.lock().jobs.values().filter(|j| j.state == state).cloned().collect()
    }

    pub fn all(&self) -> Vec<Job> {
        self.inner.lock().jobs.values().cloned().collect()
    }

    /// `remove`: archive on disk (so a reload never sees it again),
    /// drop the in-memory record, emit `Removed`.
    pub fn remove(&self, id: JobId) -> Result<(), EngineError> {
        let existed = {
            let mut inner = self.inner.lock();
            let existed = inner.jobs.shift_remove(&id).is_some();
            inner.dirty.remove(&id);
            existed
        };
        if !existed {
            return Err(JobError::NotFound(id).into());
        }
        mq_storage::job_store::archive_job(&self.base_dir, id)?;
        let _ = self.events.send(RegistryEvent::Removed(id));
        Ok(())
    }

    /// `set-state`: no-op if unchanged; otherwise validates the
    /// transition, updates the record, logs, marks dirty, and emits
    /// `StateChanged`.
    pub fn set_state(
        &self,
        id: JobId,
        new_state: JobState,
        timestamp_ms: i64,
    ) -> Result<Option<(JobState, JobState)>, EngineError> {
        let (old, queue_name) = {
            let mut inner = self.inner.lock();
            let inner = &mut *inner;
            let job = inner.jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;
            if job.state == new_state {
                return Ok(None);
            }
            if !job.state.can_transition_to(new_state) {
                return Err(JobError::IllegalTransition { id, from: job.state, to: new_state }.into());
            }
            let old = job.transition(new_state).expect("checked above: states differ");
            inner.dirty.insert(id);
            (old, job.queue_name.clone())
        };

        self.logger.log_for_job(
            timestamp_ms,
            Severity::Notification,
            format!("Job '{queue_name}:{id}' has changed status from {old} to {new_state}"),
            id,
        );
        tracing::debug!(job_id = %id, %old, new = %new_state, "job state changed");
        let _ = self.events.send(RegistryEvent::StateChanged { id, old, new: new_state });
        Ok(Some((old, new_state)))
    }

    /// `set-queue-id`: update the backend-assigned id if it changed.
    pub fn set_queue_id(&self, id: JobId, queue_job_id: QueueJobId) -> Result<(), EngineError> {
        let job = {
            let mut inner = self.inner.lock();
            let inner = &mut *inner;
            let job = inner.jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;
            if job.queue_job_id.as_ref() == Some(&queue_job_id) {
                return Ok(());
            }
            job.queue_job_id = Some(queue_job_id);
            inner.dirty.insert(id);
            job.clone()
        };
        let _ = self.events.send(RegistryEvent::Updated(job));
        Ok(())
    }

    pub fn increment_failure_count(&self, id: JobId) -> Result<u32, EngineError> {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        let job = inner.jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;
        job.failure_count += 1;
        inner.dirty.insert(id);
        Ok(job.failure_count)
    }

    pub fn reset_failure_count(&self, id: JobId) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        let job = inner.jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;
        job.failure_count = 0;
        inner.dirty.insert(id);
        Ok(())
    }

    /// `load-from-disk`: reload every non-archived job, then reset the
    /// id counter past the highest loaded id (§4.3 uniqueness
    /// invariant).
    pub fn load_from_disk(&self, timestamp_ms: i64) -> usize {
        let (jobs, skipped) = mq_storage::job_store::load_from_disk(&self.base_dir);
        if skipped > 0 {
            self.logger.log(
                timestamp_ms,
                Severity::Error,
                format!("Skipped {skipped} damaged job record(s) while loading from disk."),
            );
        }
        self.ids.observe_loaded(jobs.iter().map(|j| j.id));
        let mut inner = self.inner.lock();
        for job in jobs {
            inner.jobs.insert(job.id, job);
        }
        skipped
    }

    /// `sync-to-disk`: persist every job touched since the last sync.
    pub fn sync_to_disk(&self) -> Result<usize, EngineError> {
        let (jobs, dirty_ids) = {
            let mut inner = self.inner.lock();
            let dirty_ids: Vec<JobId> = inner.dirty.drain().collect();
            let jobs: Vec<Job> = dirty_ids
                .iter()
                .filter_map(|id| inner.jobs.get(id).cloned())
                .collect();
            (jobs, dirty_ids)
        };
        for job in &jobs {
            mq_storage::job_store::save_job(&self.base_dir, job)?;
        }
        Ok(dirty_ids.len())
    }
}
