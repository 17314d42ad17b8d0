// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `molequeued` — the daemon binary. Wires the transport listener,
//! the JSON-RPC dispatcher, and the engine's registry/executors/pipeline
//! together, then drives the periodic ticks described in §4.6-§4.8 and
//! §5 until a clean shutdown is requested.

mod config;
mod dispatcher;
mod lifecycle;
mod listener;
mod open_with;

use std::sync::Arc;
use std::time::Duration;

use config::{Config, DEFAULT_SOCKET_NAME};
use dispatcher::Dispatcher;
use lifecycle::{LifecycleError, StartupResult};
use mq_adapters::{RemoteShellTransport, SshTransport, UitTransport};
use mq_core::{Clock, JobState, QueueType, Severity, SystemClock};
use mq_engine::{JobRegistry, LocalExecutor, Logger, QueueManager, RemotePipeline, DEFAULT_MAX_ENTRIES};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("molequeued {}", concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH")));
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            _ => {}
        }
    }

    let config = Config::from_args(std::env::args().skip(1)).map_err(|e| {
        eprintln!("error: {e}");
        print_help();
        e
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();

    let StartupResult { listener: unix_listener, .. } = match lifecycle::startup(&config) {
        Ok(result) => result,
        Err(LifecycleError::LockFailed { path, .. }) => {
            eprintln!("molequeued is already running (lock held at {})", path.display());
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!(%e, "failed to start daemon");
            return Err(e.into());
        }
    };

    let clock = SystemClock;
    let timestamp_ms = clock.epoch_ms();

    let persisted_log = mq_storage::logger_store::load(&config.working_directory_base, DEFAULT_MAX_ENTRIES)?;
    let logger = Logger::from_persisted(persisted_log.max_entries, persisted_log.entries);

    let registry = Arc::new(JobRegistry::new(&config.working_directory_base, logger.clone()));
    let skipped_jobs = registry.load_from_disk(timestamp_ms);
    if skipped_jobs > 0 {
        logger.log(timestamp_ms, Severity::Error, format!("Skipped {skipped_jobs} damaged job record(s) on load."));
    }

    let queues = Arc::new(QueueManager::new(&config.working_directory_base));
    let skipped_queues = queues.load_from_disk();
    if skipped_queues > 0 {
        logger.log(timestamp_ms, Severity::Error, format!("Skipped {skipped_queues} damaged queue config(s) on load."));
    }

    let local = Arc::new(LocalExecutor::new(registry.clone(), queues.clone(), logger.clone(), None));
    let remote = Arc::new(RemotePipeline::new(registry.clone(), queues.clone(), logger.clone()));
    register_remote_transports(&queues, &remote);

    let shutdown = CancellationToken::new();
    let dispatcher = Dispatcher::new(registry.clone(), queues.clone(), logger.clone(), local.clone(), remote.clone(), shutdown.clone());
    dispatcher.spawn_notification_router();

    recover_in_flight_jobs(&registry, &queues, &local, &remote, timestamp_ms).await;

    tokio::spawn(listener::run(unix_listener, dispatcher.clone(), shutdown.clone()));
    spawn_local_tick(local.clone());
    spawn_remote_poll(queues.clone(), remote.clone());
    spawn_persistence_tick(registry.clone(), logger.clone());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tracing::info!(socket = %config.socket_path().display(), "molequeued ready");

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
        () = shutdown.cancelled() => tracing::info!("shutdown requested via rpcKill"),
    }

    let _ = registry.sync_to_disk();
    let _ = mq_storage::logger_store::save(
        &config.working_directory_base,
        &mq_storage::logger_store::PersistedLog { max_entries: logger.max_entries(), entries: logger.entries() },
    );
    lifecycle::cleanup_on_shutdown(&config);
    Ok(())
}

fn print_help() {
    println!("molequeued {}", concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH")));
    println!("Background daemon that accepts job descriptions over a local JSON-RPC");
    println!("endpoint and runs them on a local or remote execution backend.");
    println!();
    println!("USAGE:");
    println!("    molequeued [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --working-directory-base <path>  Daemon state directory (default: ~/.molequeue)");
    println!("    --socket-name <name>              IPC endpoint name (default: {DEFAULT_SOCKET_NAME})");
    println!("    --force-start                      Remove a stale endpoint artifact and retry once");
    println!("    -h, --help                         Print help information");
    println!("    -V, --version                      Print version information");
}

/// Build one [`RemoteShellTransport`] per configured remote queue and
/// register it with the pipeline (§4.7). UIT queues get the SOAP-stub
/// transport (§1 out-of-scope collaborator); every other remote type
/// is SSH-backed.
fn register_remote_transports(queues: &Arc<QueueManager>, remote: &Arc<RemotePipeline>) {
    for name in queues.list_queues().keys().cloned().collect::<Vec<_>>() {
        let Some(queue) = queues.get(&name) else { continue };
        let Some(settings) = &queue.remote else { continue };
        let transport: Arc<dyn RemoteShellTransport> = match queue.queue_type {
            QueueType::Uit => Arc::new(UitTransport::new()),
            _ => Arc::new(SshTransport::new(settings.host.clone(), settings.username.clone(), settings.ssh_port)),
        };
        remote.register_transport(name, transport);
    }
}

/// Crash recovery (§6, §8): re-enqueue local jobs the daemon was about
/// to run, resubmit remote jobs that never made it past `Accepted`,
/// and leave already-`Submitted`/running remote jobs alone — the next
/// poll tick discovers them by queue id without any in-memory state.
/// A `RunningLocal` job lost its child-process handle across the
/// restart, so it can't be resumed; it is marked `Error` instead.
async fn recover_in_flight_jobs(
    registry: &Arc<JobRegistry>,
    queues: &Arc<QueueManager>,
    local: &Arc<LocalExecutor>,
    remote: &Arc<RemotePipeline>,
    timestamp_ms: i64,
) {
    for job in registry.all() {
        let Some(queue) = queues.get(&job.queue_name) else { continue };
        match job.state {
            JobState::QueuedLocal if !queue.queue_type.is_remote() => {
                let _ = local.enqueue(job.id, timestamp_ms).await;
            }
            JobState::RunningLocal if !queue.queue_type.is_remote() => {
                let _ = registry.set_state(job.id, JobState::Error, timestamp_ms);
            }
            JobState::Accepted if queue.queue_type.is_remote() => {
                let remote = remote.clone();
                let job_id = job.id;
                tokio::spawn(async move {
                    let _ = remote.submit(job_id, timestamp_ms).await;
                });
            }
            _ => {}
        }
    }
}

/// Drive the local executor's scheduling pass and reap loop at the
/// ~100 ms cadence §4.6 specifies.
fn spawn_local_tick(local: Arc<LocalExecutor>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(100));
        loop {
            interval.tick().await;
            let timestamp_ms = SystemClock.epoch_ms();
            let _ = local.tick(timestamp_ms).await;
            let _ = local.reap(timestamp_ms).await;
        }
    });
}

/// One polling task per remote queue, each on its own configured
/// interval (§4.7 polling, default 60 s). Queues are re-read from the
/// manager on every tick so a queue added after startup gets picked up
/// the next time this sweep runs.
fn spawn_remote_poll(queues: Arc<QueueManager>, remote: Arc<RemotePipeline>) {
    tokio::spawn(async move {
        let mut last_poll: std::collections::HashMap<String, Duration> = std::collections::HashMap::new();
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        let started = tokio::time::Instant::now();
        loop {
            interval.tick().await;
            let elapsed = started.elapsed();
            for name in queues.list_queues().keys().cloned().collect::<Vec<_>>() {
                let Some(queue) = queues.get(&name) else { continue };
                let Some(settings) = &queue.remote else { continue };
                let due = elapsed - *last_poll.get(&name).unwrap_or(&Duration::ZERO) >= Duration::from_secs(settings.queue_poll_interval_secs);
                if due {
                    last_poll.insert(name.clone(), elapsed);
                    let timestamp_ms = SystemClock.epoch_ms();
                    let _ = remote.poll(&name, timestamp_ms).await;
                }
            }
        }
    });
}

/// The server's low-frequency tick (§4.8, ~10 s): persist dirty job
/// records. The logger persists only at clean shutdown (§4.4), so it
/// isn't ticked here.
fn spawn_persistence_tick(registry: Arc<JobRegistry>, logger: Arc<Logger>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(10));
        loop {
            interval.tick().await;
            if let Err(e) = registry.sync_to_disk() {
                logger.log(SystemClock.epoch_ms(), Severity::Error, format!("Failed to sync registry to disk: {e}"));
            }
        }
    });
}
