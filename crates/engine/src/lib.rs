// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon's stateful runtime layer: the job registry, the
//! process-wide log, queue configuration, and the two execution
//! pipelines (§4 of the job-submission design).
//!
//! `mq-core` stays pure types, `mq-storage` stays pure persistence; this
//! crate is where they're wired together into running state.

pub mod error;
pub mod job_registry;
pub mod launch_script;
pub mod local_executor;
pub mod logger;
pub mod queue_manager;
pub mod remote_pipeline;

pub use error::EngineError;
pub use job_registry::{JobRegistry, RegistryEvent};
pub use launch_script::{format_wall_time_minutes, render, RenderContext, Rendered, UnhandledKeyword};
pub use local_executor::LocalExecutor;
pub use logger::{LogEvent, Logger, DEFAULT_MAX_ENTRIES};
pub use queue_manager::QueueManager;
pub use remote_pipeline::RemotePipeline;
