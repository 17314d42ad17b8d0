// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local executor (§4.6): an ordered pending queue and a core-count
//! budget, ticked by the caller at roughly 100 ms intervals.
//!
//! Grounded on `examples/original_source/molequeue/app/queues/local.cpp`
//! for the start/reap procedure, shaped as the teacher's tick-driven
//! executor (`crates/engine/src/executor.rs`) generic over no adapter
//! trait since a child process is already an async-friendly handle.

use crate::error::EngineError;
use crate::job_registry::JobRegistry;
use crate::launch_script::{self, RenderContext};
use crate::queue_manager::QueueManager;
use crate::logger::Logger;
use mq_core::{FileSpec, Job, JobId, JobState, LaunchSyntax, Severity};
use std::collections::{HashMap, VecDeque};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

struct RunningJob {
    cores: u32,
    child: Child,
}

/// Owns the pending queue and running-process map described in §4.6.
/// All mutation happens through `&self` methods serialized by internal
/// async mutexes, matching the single-threaded-cooperative model (§5):
/// the caller drives `tick()`/`reap()` from the same event loop that
/// drives everything else.
pub struct LocalExecutor {
    registry: Arc<JobRegistry>,
    queues: Arc<QueueManager>,
    logger: Arc<Logger>,
    max_cores: u32,
    pending: Mutex<VecDeque<JobId>>,
    running: Mutex<HashMap<JobId, RunningJob>>,
}

impl LocalExecutor {
    pub fn new(
        registry: Arc<JobRegistry>,
        queues: Arc<QueueManager>,
        logger: Arc<Logger>,
        max_cores: Option<u32>,
    ) -> Self {
        let max_cores = max_cores.unwrap_or_else(|| {
            std::thread::available_parallelism().map(|n| n.get() as u32).unwrap_or(1)
        });
        Self {
            registry,
            queues,
            logger,
            max_cores,
            pending: Mutex::new(VecDeque::new()),
            running: Mutex::new(HashMap::new()),
        }
    }

    pub async fn enqueue(&self, job_id: JobId, timestamp_ms: i64) -> Result<(), EngineError> {
        self.pending.lock().await.push_back(job_id);
        self.registry.set_state(job_id, JobState::QueuedLocal, timestamp_ms)?;
        Ok(())
    }

    /// Cancel a job this executor owns: drop it from the pending queue
    /// if it hasn't started, or request termination without waiting if
    /// it's running (§4.6 cancellation).
    pub async fn cancel(&self, job_id: JobId, timestamp_ms: i64) -> Result<(), EngineError> {
        let mut pending = self.pending.lock().await;
        let was_pending = pending.iter().any(|id| *id == job_id);
        pending.retain(|id| *id != job_id);
        drop(pending);

        let mut running = self.running.lock().await;
        if let Some(mut job) = running.remove(&job_id) {
            let _ = job.child.start_kill();
        } else if !was_pending {
            return Ok(());
        }
        self.registry.set_state(job_id, JobState::Canceled, timestamp_ms)?;
        Ok(())
    }

    /// Run one scheduling pass: while the budget allows, pop the next
    /// pending job and start it.
    pub async fn tick(&self, timestamp_ms: i64) -> Result<(), EngineError> {
        loop {
            let cores_in_use: u32 = self.running.lock().await.values().map(|r| r.cores).sum();
            let next_id = {
                let pending = self.pending.lock().await;
                pending.front().copied()
            };
            let Some(job_id) = next_id else { break };
            let Some(job) = self.registry.lookup(job_id) else {
                self.pending.lock().await.pop_front();
                continue;
            };
            if cores_in_use + job.cores > self.max_cores {
                break;
            }
            self.pending.lock().await.pop_front();
            self.start(job, timestamp_ms).await?;
        }
        Ok(())
    }

    /// Poll running children for exit without blocking, moving
    /// finished jobs to `Finished`/`Error` and handling output
    /// retrieval/cleanup.
    pub async fn reap(&self, timestamp_ms: i64) -> Result<(), EngineError> {
        let finished_ids: Vec<JobId> = {
            let mut running = self.running.lock().await;
            let mut done = Vec::new();
            for (id, job) in running.iter_mut() {
                if let Ok(Some(_status)) = job.child.try_wait() {
                    done.push(*id);
                }
            }
            for id in &done {
                running.remove(id);
            }
            done
        };

        for id in finished_ids {
            if let Some(job) = self.registry.lookup(id) {
                self.finish(&job, timestamp_ms)?;
            }
        }
        Ok(())
    }

    async fn start(&self, job: Job, timestamp_ms: i64) -> Result<(), EngineError> {
        let workdir = job.local_working_directory.clone();
        if let Err(e) = std::fs::create_dir_all(&workdir) {
            if !workdir.exists() {
                self.registry.set_state(job.id, JobState::Error, timestamp_ms)?;
                return Err(EngineError::WorkingDirectory { path: workdir.display().to_string(), source: e });
            }
            self.logger.log_for_job(
                timestamp_ms,
                Severity::Warning,
                format!("Local working directory {} already exists.", workdir.display()),
                job.id,
            );
        }

        if let Err(description) = materialize_file_specs(&job, &workdir) {
            self.logger.log_for_job(timestamp_ms, Severity::Error, description, job.id);
            self.registry.set_state(job.id, JobState::Error, timestamp_ms)?;
            return Ok(());
        }

        let (queue, program) = match self.queues.queue_and_program(&job.queue_name, &job.program_name) {
            Ok(v) => v,
            Err(e) => {
                self.logger.log_for_job(timestamp_ms, Severity::Error, e.to_string(), job.id);
                self.registry.set_state(job.id, JobState::Error, timestamp_ms)?;
                return Ok(());
            }
        };

        let input_file_name = job.input_file.filename().unwrap_or_default();
        let input_file_base_name = input_file_name
            .rsplit_once('.')
            .map(|(base, _ext)| base.to_string())
            .unwrap_or_else(|| input_file_name.clone());

        let template = if program.launch_syntax == LaunchSyntax::Custom {
            program.custom_launch_template.clone().unwrap_or_default()
        } else {
            queue.launch_template.clone()
        };
        let ctx = RenderContext {
            molequeue_id: job.id,
            input_file_name: input_file_name.clone(),
            input_file_base_name,
            number_of_cores: job.cores,
            remote_working_dir: None,
            optional_values: job
                .max_wall_time_minutes
                .map(|m| [("maxWallTime".to_string(), launch_script::format_wall_time_minutes(m))].into())
                .unwrap_or_default(),
        };
        let rendered = launch_script::render(&template, &program, &ctx, true);
        for keyword in &rendered.unhandled {
            self.logger.log_for_job(
                timestamp_ms,
                Severity::Warning,
                format!("Unhandled keyword in launch script: {}. Removing.", keyword.0),
                job.id,
            );
        }

        let script_path = workdir.join(&queue.launch_script_name);
        if let Err(e) = std::fs::write(&script_path, &rendered.script) {
            self.registry.set_state(job.id, JobState::Error, timestamp_ms)?;
            return Err(EngineError::Spawn(e));
        }
        #[cfg(unix)]
        if let Ok(metadata) = std::fs::metadata(&script_path) {
            let mut perms = metadata.permissions();
            perms.set_mode(perms.mode() | 0o111);
            let _ = std::fs::set_permissions(&script_path, perms);
        }

        let mut command = build_command(&program, &workdir, &script_path, &input_file_name);
        match command.spawn() {
            Ok(child) => {
                let pid = child.id().unwrap_or(0);
                tracing::info!(job_id = %job.id, pid, "local job started");
                self.running.lock().await.insert(job.id, RunningJob { cores: job.cores, child });
                self.registry.set_queue_id(job.id, pid.into())?;
                self.registry.set_state(job.id, JobState::RunningLocal, timestamp_ms)?;
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "failed to spawn local job");
                self.logger.log_for_job(timestamp_ms, Severity::Error, format!("Failed to start job: {e}"), job.id);
                self.registry.set_state(job.id, JobState::Error, timestamp_ms)?;
            }
        }
        Ok(())
    }

    fn finish(&self, job: &Job, timestamp_ms: i64) -> Result<(), EngineError> {
        if let Some(output_dir) = &job.output_directory {
            if output_dir != &job.local_working_directory {
                if let Err(e) = copy_dir_recursive(&job.local_working_directory, output_dir) {
                    self.logger.log_for_job(
                        timestamp_ms,
                        Severity::Error,
                        format!("Failed to copy output to {}: {e}", output_dir.display()),
                        job.id,
                    );
                }
            }
        }
        if job.clean_local_working_directory {
            let _ = std::fs::remove_dir_all(&job.local_working_directory);
        }
        self.registry.set_state(job.id, JobState::Finished, timestamp_ms)?;
        Ok(())
    }
}

fn materialize_file_specs(job: &Job, workdir: &Path) -> Result<(), String> {
    // A primary `Invalid` means submission declared no input file, which
    // is accepted at submission time; `Invalid` inside the additional
    // files list is always a validation bug further up the pipeline.
    if let FileSpec::Invalid = &job.input_file {
    } else {
        materialize_one(&job.input_file, workdir)?;
    }
    for spec in &job.additional_input_files {
        match spec {
            FileSpec::Invalid => return Err("Job has an invalid additional input file specification.".to_string()),
            spec => materialize_one(spec, workdir)?,
        }
    }
    Ok(())
}

fn materialize_one(spec: &FileSpec, workdir: &Path) -> Result<(), String> {
    match spec {
        FileSpec::Contents { filename, contents } => {
            std::fs::write(workdir.join(filename), contents)
                .map_err(|e| format!("Failed to write input file '{filename}': {e}"))?;
        }
        FileSpec::Path { path } => {
            if !path.exists() {
                return Err(format!("Input file '{}' does not exist.", path.display()));
            }
        }
        FileSpec::Invalid => return Err("Job has an invalid input file specification.".to_string()),
    }
    Ok(())
}

fn build_command(program: &mq_core::Program, workdir: &Path, script_path: &Path, input_file_name: &str) -> Command {
    let mut command = match program.launch_syntax {
        LaunchSyntax::Custom => {
            let mut c = Command::new("/bin/sh");
            c.arg(script_path);
            c
        }
        LaunchSyntax::Plain | LaunchSyntax::InputArg | LaunchSyntax::InputArgNoExt => {
            let mut c = Command::new(&program.executable);
            if !program.arguments.is_empty() {
                c.args(program.arguments.split_whitespace());
            }
            if program.launch_syntax == LaunchSyntax::InputArg {
                c.arg(input_file_name);
            } else if program.launch_syntax == LaunchSyntax::InputArgNoExt {
                c.arg(input_file_name.rsplit_once('.').map(|(b, _)| b).unwrap_or(input_file_name));
            }
            c
        }
        LaunchSyntax::Redirect | LaunchSyntax::InputArgOutputRedirect => {
            let mut c = Command::new(&program.executable);
            if !program.arguments.is_empty() {
                c.args(program.arguments.split_whitespace());
            }
            if program.launch_syntax == LaunchSyntax::Redirect {
                c.stdin(std::fs::File::open(workdir.join(input_file_name)).map(std::process::Stdio::from).unwrap_or(std::process::Stdio::null()));
            } else {
                c.arg(input_file_name);
            }
            if let Ok(out) = std::fs::File::create(workdir.join(&program.output_filename)) {
                c.stdout(std::process::Stdio::from(out));
            }
            c
        }
    };
    command.current_dir(workdir);
    command
}

fn copy_dir_recursive(from: &Path, to: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &dest)?;
        } else {
            std::fs::copy(entry.path(), dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue_manager::QueueManager;
    use mq_core::{FileSpec, Program, Queue};
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, Arc<JobRegistry>, Arc<QueueManager>, Arc<Logger>) {
        let dir = tempdir().unwrap();
        let logger = Logger::new(100);
        let registry = Arc::new(JobRegistry::new(dir.path(), logger.clone()));
        let queues = Arc::new(QueueManager::new(dir.path()));
        let mut queue = Queue::new_local("local");
        queue.programs.insert("echo".into(), {
            let mut p = Program::new("echo", "echo");
            p.arguments = "hello".into();
            p
        });
        queues.add_queue(queue).unwrap();
        (dir, registry, queues, logger)
    }

    #[tokio::test]
    async fn enqueue_moves_job_to_queued_local() {
        let (_dir, registry, queues, logger) = setup();
        let executor = LocalExecutor::new(registry.clone(), queues, logger, Some(4));
        let job = registry
            .new_job(0, |j| {
                j.queue_name = "local".into();
                j.program_name = "echo".into();
                j.input_file = FileSpec::Invalid;
            })
            .unwrap();
        executor.enqueue(job.id, 0).await.unwrap();
        assert_eq!(registry.lookup(job.id).unwrap().state, JobState::QueuedLocal);
    }

    #[tokio::test]
    async fn tick_starts_job_within_budget_and_reap_finishes_it() {
        let (_dir, registry, queues, logger) = setup();
        let executor = LocalExecutor::new(registry.clone(), queues, logger, Some(4));
        let job = registry
            .new_job(0, |j| {
                j.queue_name = "local".into();
                j.program_name = "echo".into();
                j.cores = 1;
                j.input_file = FileSpec::Invalid;
            })
            .unwrap();
        executor.enqueue(job.id, 0).await.unwrap();
        executor.tick(0).await.unwrap();
        assert_eq!(registry.lookup(job.id).unwrap().state, JobState::RunningLocal);

        for _ in 0..50 {
            executor.reap(0).await.unwrap();
            if registry.lookup(job.id).unwrap().state == JobState::Finished {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(registry.lookup(job.id).unwrap().state, JobState::Finished);
    }

    #[tokio::test]
    async fn cancel_removes_pending_job_without_starting() {
        let (_dir, registry, queues, logger) = setup();
        let executor = LocalExecutor::new(registry.clone(), queues, logger, Some(4));
        let job = registry
            .new_job(0, |j| {
                j.queue_name = "local".into();
                j.program_name = "echo".into();
                j.input_file = FileSpec::Invalid;
            })
            .unwrap();
        executor.enqueue(job.id, 0).await.unwrap();
        executor.cancel(job.id, 0).await.unwrap();
        executor.tick(0).await.unwrap();
        assert_eq!(registry.lookup(job.id).unwrap().state, JobState::Canceled);
    }

    #[tokio::test]
    async fn over_budget_job_stays_pending() {
        let (_dir, registry, queues, logger) = setup();
        let executor = LocalExecutor::new(registry.clone(), queues, logger, Some(1));
        let job = registry
            .new_job(0, |j| {
                j.queue_name = "local".into();
                j.program_name = "echo".into();
                j.cores = 8;
                j.input_file = FileSpec::Invalid;
            })
            .unwrap();
        executor.enqueue(job.id, 0).await.unwrap();
        executor.tick(0).await.unwrap();
        assert_eq!(registry.lookup(job.id).unwrap().state, JobState::QueuedLocal);
    }
}
