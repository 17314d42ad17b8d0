// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The JSON-RPC method table (§4.8): one async `handle` entry point the
//! listener calls per decoded message, plus the `jobStateChanged`
//! notification router that the registry's event stream feeds.
//!
//! Grounded on the teacher's `listener/mod.rs` single `match
//! request { ... }` dispatch shape, rebuilt from scratch against this
//! daemon's much smaller method table and `mq-wire`'s JSON-RPC types
//! rather than the teacher's own protocol module.

use crate::open_with::{OpenWithHandler, OpenWithRegistry};
use mq_core::{Clock, FileSpec, Job, JobId, JobState, SystemClock};
use mq_engine::{JobRegistry, LocalExecutor, Logger, QueueManager, RegistryEvent, RemotePipeline};
use mq_wire::{EndpointId, ErrorResponse, Message, Request, Response, RpcError, RpcErrorCode, RpcId};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

type OutboundSender = UnboundedSender<Vec<u8>>;

pub struct Dispatcher {
    registry: Arc<JobRegistry>,
    queues: Arc<QueueManager>,
    logger: Arc<Logger>,
    local: Arc<LocalExecutor>,
    remote: Arc<RemotePipeline>,
    open_with: OpenWithRegistry,
    routes: Mutex<HashMap<JobId, (EndpointId, OutboundSender)>>,
    clock: SystemClock,
    pub shutdown: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<JobRegistry>,
        queues: Arc<QueueManager>,
        logger: Arc<Logger>,
        local: Arc<LocalExecutor>,
        remote: Arc<RemotePipeline>,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            queues,
            logger,
            local,
            remote,
            open_with: OpenWithRegistry::new(),
            routes: Mutex::new(HashMap::new()),
            clock: SystemClock,
            shutdown,
        })
    }

    /// Drop every routing entry left over from a disconnected
    /// endpoint, so a later `state-changed` for one of its jobs isn't
    /// routed anywhere (§4.8 notification routing).
    pub fn purge_endpoint(&self, endpoint: EndpointId) {
        self.routes.lock().retain(|_, (ep, _)| *ep != endpoint);
    }

    /// Spawn the background task that turns registry `StateChanged`
    /// events into `jobStateChanged` notifications on the originating
    /// connection. Run once, at daemon startup.
    pub fn spawn_notification_router(self: &Arc<Self>) {
        let dispatcher = self.clone();
        let mut events = self.registry.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                if let RegistryEvent::StateChanged { id, old, new } = event {
                    dispatcher.route_state_changed(id, old, new);
                }
            }
        });
    }

    fn route_state_changed(&self, id: JobId, old: JobState, new: JobState) {
        let route = self.routes.lock().get(&id).cloned();
        let Some((_endpoint, sender)) = route else { return };
        let notification = Message::Notification(mq_wire::Notification {
            method: "jobStateChanged".to_string(),
            params: Some(json!({ "moleQueueId": id, "oldState": old.to_string(), "newState": new.to_string() })),
        });
        if let Ok(payload) = mq_wire::encode_many(&[notification]) {
            let _ = sender.send(payload);
        }
        if new.is_terminal() {
            self.routes.lock().remove(&id);
        }
    }

    /// Dispatch one already-decoded client message. Notifications and
    /// responses from a client are accepted on the wire but produce no
    /// reply (this daemon never originates requests a client would
    /// respond to).
    pub async fn handle(&self, endpoint: EndpointId, outbound: OutboundSender, message: Message) -> Option<Message> {
        match message {
            Message::Request(request) => Some(self.handle_request(endpoint, outbound, request).await),
            Message::Notification(_) | Message::Response(_) | Message::Error(_) => None,
        }
    }

    async fn handle_request(&self, endpoint: EndpointId, outbound: OutboundSender, request: Request) -> Message {
        let Request { id, method, params } = request;
        let result = match method.as_str() {
            "listQueues" => Ok(json!(self.queues.list_queues())),
            "submitJob" => self.submit_job(endpoint, outbound, params),
            "cancelJob" => self.cancel_job(params).await,
            "lookupJob" => self.lookup_job(params),
            "removeJob" => self.remove_job(params),
            "exportQueue" => self.export_queue(params),
            "registerOpenWith" => self.register_open_with(params),
            "listOpenWithNames" => Ok(json!(self.open_with.names())),
            "unregisterOpenWith" => self.unregister_open_with(params),
            "rpcKill" => {
                self.shutdown.cancel();
                Ok(json!(true))
            }
            _ => Err(RpcError::new(RpcErrorCode::MethodNotFound)),
        };

        match result {
            Ok(value) => Message::Response(Response { id, result: value }),
            Err(error) => Message::Error(ErrorResponse { id: Some(id), error }),
        }
    }

    fn submit_job(&self, endpoint: EndpointId, outbound: OutboundSender, params: Option<Value>) -> Result<Value, RpcError> {
        let Some(Value::Object(obj)) = params else {
            return Err(RpcError::with_description(RpcErrorCode::InvalidParams, "params must be an object"));
        };

        let queue_name = match obj.get("queue") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(RpcError::with_description(RpcErrorCode::InvalidParams, "'queue' must be a string")),
        };
        let program_name = match obj.get("program") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(RpcError::with_description(RpcErrorCode::InvalidParams, "'program' must be a string")),
        };
        let (queue, _program) = self
            .queues
            .queue_and_program(&queue_name, &program_name)
            .map_err(|e| RpcError::with_description(RpcErrorCode::InvalidParams, e.to_string()))?;

        // No `inputFile` key at all means the program needs none (a
        // `LaunchSyntax::Plain` program, say); a key that's present but
        // doesn't parse is a malformed request and must be rejected
        // here, not left to fail asynchronously once the job is running.
        let input_file = match obj.get("inputFile") {
            None => FileSpec::Invalid,
            Some(value) => {
                let spec = FileSpec::from_json(value);
                if !spec.is_valid() {
                    return Err(RpcError::with_description(RpcErrorCode::InvalidParams, "'inputFile' is not a valid file specification"));
                }
                spec
            }
        };
        let additional_input_files = match obj.get("additionalInputFiles").and_then(|v| v.as_array()) {
            None => Vec::new(),
            Some(items) => {
                let mut specs = Vec::with_capacity(items.len());
                for item in items {
                    let spec = FileSpec::from_json(item);
                    if !spec.is_valid() {
                        return Err(RpcError::with_description(RpcErrorCode::InvalidParams, "'additionalInputFiles' entry is not a valid file specification"));
                    }
                    specs.push(spec);
                }
                specs
            }
        };
        let description = obj.get("description").and_then(|v| v.as_str()).unwrap_or_default().to_string();
        let cores = obj.get("numberOfCores").and_then(|v| v.as_u64()).map(|n| n as u32).unwrap_or(1);
        let max_wall_time_minutes = obj.get("maxWallTime").and_then(|v| v.as_u64()).map(|n| n as u32);
        let output_directory = obj.get("outputDirectory").and_then(|v| v.as_str()).map(std::path::PathBuf::from);
        let retrieve_output = obj.get("retrieveOutput").and_then(|v| v.as_bool()).unwrap_or(true);
        let clean_local_working_directory = obj.get("cleanLocalWorkingDirectory").and_then(|v| v.as_bool()).unwrap_or(false);
        let clean_remote_files = obj.get("cleanRemoteFiles").and_then(|v| v.as_bool()).unwrap_or(false);

        // The route must exist before the job does: `new_job_with_id`
        // fires the `None -> Accepted` transition synchronously, and the
        // notification router runs on its own task, so registering the
        // route only after the job is created would race it.
        let timestamp_ms = self.clock.epoch_ms();
        let job_id = self.registry.allocate_id();
        self.routes.lock().insert(job_id, (endpoint, outbound));

        let job = match self.registry.new_job_with_id(job_id, timestamp_ms, |job| {
            job.queue_name = queue_name.clone();
            job.program_name = program_name.clone();
            job.description = description;
            job.cores = cores;
            job.max_wall_time_minutes = max_wall_time_minutes;
            job.input_file = input_file;
            job.additional_input_files = additional_input_files;
            job.output_directory = output_directory;
            job.retrieve_output = retrieve_output;
            job.clean_local_working_directory = clean_local_working_directory;
            job.clean_remote_files = clean_remote_files;
        }) {
            Ok(job) => job,
            Err(e) => {
                self.routes.lock().remove(&job_id);
                return Err(RpcError::internal(json!({ "description": e.to_string() })));
            }
        };

        if queue.queue_type.is_remote() {
            let remote = self.remote.clone();
            let job_id = job.id;
            tokio::spawn(async move {
                let _ = remote.submit(job_id, timestamp_ms).await;
            });
        } else {
            let local = self.local.clone();
            let job_id = job.id;
            tokio::spawn(async move {
                let _ = local.enqueue(job_id, timestamp_ms).await;
            });
        }

        Ok(json!({ "moleQueueId": job.id }))
    }

    async fn cancel_job(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let id = parse_job_id(params.as_ref())?;
        let job = self.registry.lookup(id).ok_or_else(|| RpcError::with_description(RpcErrorCode::InvalidParams, format!("unknown job {id}")))?;
        let queue = self.queues.get(&job.queue_name);
        let timestamp_ms = self.clock.epoch_ms();

        let outcome = match queue {
            Some(queue) if !queue.queue_type.is_remote() => self.local.cancel(id, timestamp_ms).await.map_err(|e| e.to_string()),
            _ if job.queue_job_id.is_some() => self.remote.cancel(id, timestamp_ms).await.map_err(|e| e.to_string()),
            _ => self.registry.set_state(id, JobState::Canceled, timestamp_ms).map(|_| ()).map_err(|e| e.to_string()),
        };
        outcome.map_err(|e| RpcError::internal(json!({ "description": e })))?;
        Ok(json!({ "moleQueueId": id }))
    }

    /// `removeJob`: archive the record on disk and forget it in memory
    /// (§4.3 `remove`). Drops the job's notification route too, since
    /// nothing will ever transition it again.
    fn remove_job(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let id = parse_job_id(params.as_ref())?;
        self.registry
            .remove(id)
            .map_err(|e| RpcError::with_description(RpcErrorCode::InvalidParams, e.to_string()))?;
        self.routes.lock().remove(&id);
        Ok(json!({ "moleQueueId": id }))
    }

    /// `exportQueue`: the queue-export-file JSON (`spec.md` §6), or
    /// just one program's portion of it when `program` is given.
    fn export_queue(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let obj = params
            .as_ref()
            .and_then(|v| v.as_object())
            .ok_or_else(|| RpcError::with_description(RpcErrorCode::InvalidParams, "params must be an object"))?;
        let queue_name = match obj.get("queue") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(RpcError::with_description(RpcErrorCode::InvalidParams, "'queue' must be a string")),
        };
        let queue = self
            .queues
            .get(&queue_name)
            .ok_or_else(|| RpcError::with_description(RpcErrorCode::InvalidParams, format!("unknown queue '{queue_name}'")))?;

        match obj.get("program") {
            Some(Value::String(program_name)) => {
                let program = queue
                    .program(program_name)
                    .ok_or_else(|| RpcError::with_description(RpcErrorCode::InvalidParams, format!("unknown program '{program_name}'")))?;
                Ok(serde_json::to_value(program.to_export()).unwrap_or(Value::Null))
            }
            _ => Ok(serde_json::to_value(queue.to_export()).unwrap_or(Value::Null)),
        }
    }

    fn lookup_job(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let id = parse_job_id(params.as_ref())?;
        let job: Job = self.registry.lookup(id).ok_or_else(|| RpcError::with_description(RpcErrorCode::InvalidParams, format!("unknown job {id}")))?;
        Ok(serde_json::to_value(job).unwrap_or(Value::Null))
    }

    fn register_open_with(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let Some(value) = params else {
            return Err(RpcError::with_description(RpcErrorCode::InvalidParams, "params must be an object"));
        };
        let handler: OpenWithHandler = serde_json::from_value(value)
            .map_err(|e| RpcError::with_description(RpcErrorCode::InvalidParams, e.to_string()))?;
        self.open_with.register(handler);
        Ok(json!(true))
    }

    fn unregister_open_with(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let Some(Value::Object(obj)) = params else {
            return Err(RpcError::with_description(RpcErrorCode::InvalidParams, "params must be an object"));
        };
        let name = match obj.get("name") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(RpcError::with_description(RpcErrorCode::InvalidParams, "'name' must be a string")),
        };
        self.open_with.unregister(&name);
        Ok(json!(true))
    }

    pub async fn log_flush_and_persist(&self) {
        let _ = self.registry.sync_to_disk();
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }
}

fn parse_job_id(params: Option<&Value>) -> Result<JobId, RpcError> {
    let obj = params
        .and_then(|v| v.as_object())
        .ok_or_else(|| RpcError::with_description(RpcErrorCode::InvalidParams, "params must be an object"))?;
    let raw = obj
        .get("moleQueueId")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| RpcError::with_description(RpcErrorCode::InvalidParams, "'moleQueueId' must be an integer"))?;
    Ok(JobId::from_raw(raw))
}
