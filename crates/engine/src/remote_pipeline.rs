// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote-queue pipeline (§4.7): writeInputFiles → copyInputFilesToHost
//! → submitJobToRemoteQueue → poll → finalize, shared by every batch
//! scheduler type and parameterized only by the queue's
//! [`mq_adapters::SchedulerProtocol`] and
//! [`mq_adapters::RemoteShellTransport`].
//!
//! Grounded on
//! `examples/original_source/molequeue/app/queues/remote.cpp`'s stage
//! sequence, shaped as the teacher's stage-machine executor
//! (`crates/engine/src/runtime`) — explicit async functions returning
//! the next state rather than a generic state-machine type, since each
//! stage here does meaningfully different I/O.

use crate::error::EngineError;
use crate::job_registry::JobRegistry;
use crate::launch_script::{self, RenderContext};
use crate::logger::Logger;
use crate::queue_manager::QueueManager;
use mq_adapters::{self as adapters, guard_against_root, RemoteShellTransport};
use mq_core::{FileSpec, Job, JobId, JobState, LaunchSyntax, QueueJobId, Severity};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// One transport per remote queue, registered by name at daemon
/// startup from the queue's `RemoteSettings`.
pub struct RemotePipeline {
    registry: Arc<JobRegistry>,
    queues: Arc<QueueManager>,
    logger: Arc<Logger>,
    transports: Mutex<HashMap<String, Arc<dyn RemoteShellTransport>>>,
}

impl RemotePipeline {
    pub fn new(registry: Arc<JobRegistry>, queues: Arc<QueueManager>, logger: Arc<Logger>) -> Self {
        Self { registry, queues, logger, transports: Mutex::new(HashMap::new()) }
    }

    pub fn register_transport(&self, queue_name: impl Into<String>, transport: Arc<dyn RemoteShellTransport>) {
        self.transports.lock().insert(queue_name.into(), transport);
    }

    fn transport(&self, queue_name: &str) -> Option<Arc<dyn RemoteShellTransport>> {
        self.transports.lock().get(queue_name).cloned()
    }

    /// Drive one job from `Accepted` through `writeInputFiles`,
    /// `copyInputFilesToHost`, and `submitJobToRemoteQueue` to
    /// `Submitted`. On any failure, increments the job's failure
    /// counter; at the configured budget the job moves to `Error`,
    /// otherwise it is left in place for the caller's retry tick to
    /// try again.
    pub async fn submit(&self, job_id: JobId, timestamp_ms: i64) -> Result<(), EngineError> {
        let Some(job) = self.registry.lookup(job_id) else { return Ok(()) };
        let (queue, program) = self.queues.queue_and_program(&job.queue_name, &job.program_name)?;
        let Some(remote) = queue.remote.clone() else {
            return Err(EngineError::Backend(adapters::BackendError::NotConfigured("queue has no remote settings")));
        };
        let Some(transport) = self.transport(&job.queue_name) else {
            return Err(EngineError::Backend(adapters::BackendError::NotConfigured("no transport registered for queue")));
        };

        let result = self
            .try_submit(&job, queue.queue_type, &queue.launch_template, &queue.launch_script_name, &program, &remote, transport.as_ref())
            .await;
        match result {
            Ok(queue_job_id) => {
                tracing::info!(job_id = %job.id, queue_job_id = %queue_job_id, "job submitted to remote queue");
                self.registry.set_queue_id(job.id, queue_job_id)?;
                self.registry.reset_failure_count(job.id)?;
                self.registry.set_state(job.id, JobState::Submitted, timestamp_ms)?;
                Ok(())
            }
            Err(message) => {
                let failures = self.registry.increment_failure_count(job.id)?;
                tracing::warn!(job_id = %job.id, failures, %message, "remote submission stage failed");
                self.logger.log_for_job(timestamp_ms, Severity::Error, message, job.id);
                if failures >= remote.max_submission_failures {
                    self.registry.set_state(job.id, JobState::Error, timestamp_ms)?;
                }
                Ok(())
            }
        }
    }

    async fn try_submit(
        &self,
        job: &Job,
        queue_type: mq_core::QueueType,
        launch_template: &str,
        launch_script_name: &str,
        program: &mq_core::Program,
        remote: &mq_core::RemoteSettings,
        transport: &dyn RemoteShellTransport,
    ) -> Result<QueueJobId, String> {
        materialize_file_specs(job).map_err(|e| format!("Failed to materialize input files: {e}"))?;

        let remote_dir = format!("{}/{}", remote.working_directory_base, job.id);
        let input_file_name = job.input_file.filename().unwrap_or_default();
        let input_file_base_name = input_file_name
            .rsplit_once('.')
            .map(|(base, _ext)| base.to_string())
            .unwrap_or_else(|| input_file_name.clone());
        let template = if program.launch_syntax == LaunchSyntax::Custom {
            program.custom_launch_template.clone().unwrap_or_default()
        } else {
            launch_template.to_string()
        };
        let ctx = RenderContext {
            molequeue_id: job.id,
            input_file_name: input_file_name.clone(),
            input_file_base_name,
            number_of_cores: job.cores,
            remote_working_dir: Some(remote_dir.clone()),
            optional_values: job
                .max_wall_time_minutes
                .or(remote.default_max_wall_time_minutes)
                .map(|m| [("maxWallTime".to_string(), launch_script::format_wall_time_minutes(m))].into())
                .unwrap_or_default(),
        };
        let rendered = launch_script::render(&template, program, &ctx, true);
        let script_path = job.local_working_directory.join(launch_script_name);
        std::fs::write(&script_path, &rendered.script).map_err(|e| format!("Failed to write launch script: {e}"))?;

        match transport.copy_dir_to(&job.local_working_directory, &remote_dir).await {
            Ok(()) => {}
            Err(e) if e.to_string().contains("No such file or directory") => {
                transport
                    .execute(&format!("mkdir -p {}", remote.working_directory_base))
                    .await
                    .map_err(|e| format!("Failed to create remote base directory: {e}"))?;
                transport
                    .copy_dir_to(&job.local_working_directory, &remote_dir)
                    .await
                    .map_err(|e| format!("Failed to copy input files to host: {e}"))?;
            }
            Err(e) => return Err(format!("Failed to copy input files to host: {e}")),
        }

        let command = format!("cd {remote_dir} && {} {launch_script_name}", remote.submission_command);
        let output = transport.execute(&command).await.map_err(|e| format!("Submission command failed: {e}"))?;
        if !output.success() {
            return Err(format!("Submission command exited {}: {}", output.exit_code, output.combined_output));
        }

        let protocol = adapters::for_queue_type(queue_type);
        protocol
            .parse_submit_output(&output.combined_output)
            .ok_or_else(|| format!("Could not parse a job id from submission output: {}", output.combined_output))
    }

    /// Poll every `Submitted`/`QueuedRemote`/`RunningRemote` job on
    /// `queue_name` in a single status-listing call, then finalize any
    /// queue id the listing no longer reports.
    pub async fn poll(&self, queue_name: &str, timestamp_ms: i64) -> Result<(), EngineError> {
        let Some(queue) = self.queues.get(queue_name) else { return Ok(()) };
        let Some(remote) = queue.remote.clone() else { return Ok(()) };
        let Some(transport) = self.transport(queue_name) else { return Ok(()) };

        let tracked: Vec<Job> = self
            .registry
            .all()
            .into_iter()
            .filter(|j| j.queue_name == queue_name && !j.state.is_terminal() && j.queue_job_id.is_some())
            .collect();
        if tracked.is_empty() {
            return Ok(());
        }

        let ids: Vec<String> = tracked.iter().filter_map(|j| j.queue_job_id.as_ref().map(|q| q.as_str().to_string())).collect();
        let command = format!("{} {}", remote.queue_status_command, ids.join(" "));
        let output = match transport.execute(&command).await {
            Ok(out) => out,
            Err(e) => {
                self.logger.log(timestamp_ms, Severity::Warning, format!("Queue status command failed for '{queue_name}': {e}"));
                return Ok(());
            }
        };

        tracing::debug!(queue_name, tracked = tracked.len(), "polled remote queue status");
        let protocol = adapters::for_queue_type(queue.queue_type);
        let mut seen: HashMap<String, JobState> = HashMap::new();
        for line in output.combined_output.lines() {
            if let Some((queue_job_id, state)) = protocol.parse_status_line(line) {
                seen.insert(queue_job_id.as_str().to_string(), state);
            }
        }

        for job in tracked {
            let Some(queue_job_id) = job.queue_job_id.as_ref() else { continue };
            match seen.get(queue_job_id.as_str()) {
                Some(state) => {
                    if *state != job.state {
                        self.registry.set_state(job.id, *state, timestamp_ms)?;
                    }
                }
                None => self.finalize(job.id, timestamp_ms, &queue, transport.as_ref()).await?,
            }
        }
        Ok(())
    }

    async fn finalize(&self, job_id: JobId, timestamp_ms: i64, queue: &mq_core::Queue, transport: &dyn RemoteShellTransport) -> Result<(), EngineError> {
        let Some(job) = self.registry.lookup(job_id) else { return Ok(()) };
        let Some(remote) = &queue.remote else { return Ok(()) };
        let remote_dir = format!("{}/{}", remote.working_directory_base, job.id);

        if job.state == JobState::QueuedRemote {
            // A job can vanish from a listing between two polls without
            // ever being observed running; bridge through RunningRemote
            // so the terminal transition below stays legal.
            let _ = self.registry.set_state(job.id, JobState::RunningRemote, timestamp_ms);
        }

        if job.retrieve_output {
            if let Err(e) = transport.copy_dir_from(&remote_dir, &job.local_working_directory).await {
                self.logger.log_for_job(timestamp_ms, Severity::Error, format!("Failed to retrieve output from host: {e}"), job.id);
            }
        }

        if let Some(output_dir) = &job.output_directory {
            if output_dir != &job.local_working_directory {
                if let Err(e) = copy_dir_local(&job.local_working_directory, output_dir) {
                    self.logger.log_for_job(timestamp_ms, Severity::Error, format!("Failed to copy output to {}: {e}", output_dir.display()), job.id);
                }
            }
        }

        if job.clean_local_working_directory {
            let _ = std::fs::remove_dir_all(&job.local_working_directory);
        }
        if job.clean_remote_files {
            match guard_against_root(&remote_dir) {
                Ok(()) => {
                    let _ = transport.execute(&format!("rm -rf {remote_dir}")).await;
                }
                Err(e) => self.logger.log_for_job(timestamp_ms, Severity::Error, e.to_string(), job.id),
            }
        }

        tracing::info!(job_id = %job.id, "remote job finalized");
        self.registry.set_state(job.id, JobState::Finished, timestamp_ms)?;
        Ok(())
    }

    /// `killJob`: issue the cancellation command, move to `Canceled` on
    /// transport success, log a warning and leave the job alone on
    /// failure (§4.7 cancellation — no automatic retry).
    pub async fn cancel(&self, job_id: JobId, timestamp_ms: i64) -> Result<(), EngineError> {
        let Some(job) = self.registry.lookup(job_id) else { return Ok(()) };
        let Some(queue_job_id) = &job.queue_job_id else { return Ok(()) };
        let (queue, _) = self.queues.queue_and_program(&job.queue_name, &job.program_name)?;
        let Some(remote) = &queue.remote else { return Ok(()) };
        let Some(transport) = self.transport(&job.queue_name) else { return Ok(()) };

        let command = format!("{} {}", remote.cancellation_command, queue_job_id.as_str());
        match transport.execute(&command).await {
            Ok(out) if out.success() => {
                self.registry.set_state(job.id, JobState::Canceled, timestamp_ms)?;
            }
            Ok(out) => {
                self.logger.log_for_job(timestamp_ms, Severity::Warning, format!("Cancellation command exited {}: {}", out.exit_code, out.combined_output), job.id);
            }
            Err(e) => {
                self.logger.log_for_job(timestamp_ms, Severity::Warning, format!("Cancellation command failed: {e}"), job.id);
            }
        }
        Ok(())
    }
}

fn materialize_file_specs(job: &Job) -> Result<(), String> {
    for spec in std::iter::once(&job.input_file).chain(job.additional_input_files.iter()) {
        match spec {
            FileSpec::Contents { filename, contents } => {
                std::fs::write(job.local_working_directory.join(filename), contents)
                    .map_err(|e| format!("'{filename}': {e}"))?;
            }
            FileSpec::Path { path } => {
                if !path.exists() {
                    return Err(format!("'{}' does not exist", path.display()));
                }
            }
            FileSpec::Invalid => return Err("invalid input file specification".to_string()),
        }
    }
    Ok(())
}

fn copy_dir_local(from: &std::path::Path, to: &std::path::Path) -> std::io::Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_local(&entry.path(), &dest)?;
        } else {
            std::fs::copy(entry.path(), dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mq_adapters::FakeTransport;
    use mq_core::{Program, Queue, RemoteSettings};
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, Arc<JobRegistry>, Arc<QueueManager>, Arc<Logger>, RemotePipeline, Arc<FakeTransport>) {
        let dir = tempdir().unwrap();
        let logger = Logger::new(100);
        let registry = Arc::new(JobRegistry::new(dir.path(), logger.clone()));
        let queues = Arc::new(QueueManager::new(dir.path()));

        let mut queue = Queue::new_local("cluster");
        queue.queue_type = mq_core::QueueType::Slurm;
        queue.remote = Some(RemoteSettings {
            host: "login.example.edu".into(),
            username: "molequeue".into(),
            ssh_port: 22,
            working_directory_base: "/scratch/molequeue".into(),
            submission_command: "sbatch".into(),
            queue_status_command: "squeue -h -o %i %T -j".into(),
            cancellation_command: "scancel".into(),
            default_max_wall_time_minutes: None,
            queue_poll_interval_secs: 60,
            max_submission_failures: 2,
        });
        queue.programs.insert("psi4".into(), Program::new("psi4", "psi4"));
        queues.add_queue(queue).unwrap();

        let pipeline = RemotePipeline::new(registry.clone(), queues.clone(), logger.clone());
        let transport = Arc::new(FakeTransport::new());
        pipeline.register_transport("cluster", transport.clone());
        (dir, registry, queues, logger, pipeline, transport)
    }

    fn sample_job(registry: &JobRegistry) -> Job {
        registry
            .new_job(0, |j| {
                j.queue_name = "cluster".into();
                j.program_name = "psi4".into();
                j.input_file = mq_core::FileSpec::Contents { filename: "in.dat".into(), contents: b"contents".to_vec() };
            })
            .unwrap()
    }

    #[tokio::test]
    async fn submit_success_sets_submitted_and_queue_job_id() {
        let (_dir, registry, _queues, _logger, pipeline, transport) = setup();
        let job = sample_job(&registry);
        std::fs::create_dir_all(&job.local_working_directory).unwrap();
        transport.push_execute_ok("Submitted batch job 555\n");

        pipeline.submit(job.id, 0).await.unwrap();

        let job = registry.lookup(job.id).unwrap();
        assert_eq!(job.state, JobState::Submitted);
        assert_eq!(job.queue_job_id.unwrap().as_str(), "555");
    }

    #[tokio::test]
    async fn submit_failure_increments_counter_without_erroring_below_threshold() {
        let (_dir, registry, _queues, _logger, pipeline, transport) = setup();
        let job = sample_job(&registry);
        std::fs::create_dir_all(&job.local_working_directory).unwrap();
        transport.set_fail_copies(true);

        pipeline.submit(job.id, 0).await.unwrap();

        let job = registry.lookup(job.id).unwrap();
        assert_eq!(job.state, JobState::Accepted);
        assert_eq!(job.failure_count, 1);
    }

    #[tokio::test]
    async fn submit_failure_at_threshold_moves_to_error() {
        let (_dir, registry, _queues, _logger, pipeline, transport) = setup();
        let job = sample_job(&registry);
        std::fs::create_dir_all(&job.local_working_directory).unwrap();
        transport.set_fail_copies(true);

        pipeline.submit(job.id, 0).await.unwrap();
        pipeline.submit(job.id, 0).await.unwrap();

        let job = registry.lookup(job.id).unwrap();
        assert_eq!(job.state, JobState::Error);
    }

    #[tokio::test]
    async fn poll_transitions_running_job_and_finalizes_when_it_disappears() {
        let (_dir, registry, _queues, _logger, pipeline, transport) = setup();
        let job = sample_job(&registry);
        std::fs::create_dir_all(&job.local_working_directory).unwrap();
        transport.push_execute_ok("Submitted batch job 555\n");
        pipeline.submit(job.id, 0).await.unwrap();

        transport.push_execute_ok("555 RUNNING\n");
        pipeline.poll("cluster", 1).await.unwrap();
        assert_eq!(registry.lookup(job.id).unwrap().state, JobState::RunningRemote);

        transport.push_execute_ok("");
        pipeline.poll("cluster", 2).await.unwrap();
        assert_eq!(registry.lookup(job.id).unwrap().state, JobState::Finished);
    }

    #[tokio::test]
    async fn cancel_moves_job_to_canceled_on_success() {
        let (_dir, registry, _queues, _logger, pipeline, transport) = setup();
        let job = sample_job(&registry);
        std::fs::create_dir_all(&job.local_working_directory).unwrap();
        transport.push_execute_ok("Submitted batch job 555\n");
        pipeline.submit(job.id, 0).await.unwrap();

        transport.push_execute_ok("");
        pipeline.cancel(job.id, 1).await.unwrap();
        assert_eq!(registry.lookup(job.id).unwrap().state, JobState::Canceled);
    }
}
