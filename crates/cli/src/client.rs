// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A thin synchronous-looking JSON-RPC client over the daemon's
//! framed local socket (§4.1, §4.2). One request per connection is
//! enough for a command-line tool; there is no need for this client to
//! juggle id correlation across a long-lived connection the way the
//! daemon's origin table does for its own server-initiated requests.

use std::path::PathBuf;

use mq_wire::{decode, encode_many, read_message, write_message, Message, Request, RpcId};
use thiserror::Error;
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to daemon at {path}: {source}")]
    Connect { path: PathBuf, source: std::io::Error },
    #[error("transport error: {0}")]
    Frame(#[from] mq_wire::FrameError),
    #[error("daemon closed the connection before replying")]
    ConnectionClosed,
    #[error("malformed response from daemon: {0}")]
    Malformed(String),
    #[error("daemon reported an error ({code}): {message}{detail}")]
    Rpc { code: i64, message: String, detail: String },
}

pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    /// Send one JSON-RPC request and wait for its matching response.
    /// Opens a fresh connection per call — correlating multiple
    /// in-flight requests on one connection is the daemon's problem,
    /// not this client's (§4.2 id-correlation table).
    pub async fn call(&self, method: &str, params: Option<serde_json::Value>) -> Result<serde_json::Value, ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| ClientError::Connect { path: self.socket_path.clone(), source: e })?;

        let request = Message::Request(Request { id: RpcId::Number(1), method: method.to_string(), params });
        let payload = encode_many(&[request]).map_err(|e| ClientError::Malformed(e.to_string()))?;
        write_message(&mut stream, &payload).await?;

        let Some(response_payload) = read_message(&mut stream).await? else {
            return Err(ClientError::ConnectionClosed);
        };
        let messages = decode(&response_payload).map_err(|e| ClientError::Malformed(e.message))?;
        let message = messages
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Malformed("empty response batch".to_string()))?
            .map_err(|e| ClientError::Malformed(e.message))?;

        match message {
            Message::Response(response) => Ok(response.result),
            Message::Error(error_response) => {
                let detail = error_response
                    .error
                    .data
                    .as_ref()
                    .and_then(|d| d.get("description"))
                    .and_then(|d| d.as_str())
                    .map(|d| format!(" ({d})"))
                    .unwrap_or_default();
                Err(ClientError::Rpc { code: error_response.error.code, message: error_response.error.message, detail })
            }
            other => Err(ClientError::Malformed(format!("unexpected message shape: {other:?}"))),
        }
    }
}
