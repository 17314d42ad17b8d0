// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC 2.0 message types (§4.2).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A JSON-RPC id is either a number or a string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(i64),
    String(String),
}

impl fmt::Display for RpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcId::Number(n) => write!(f, "{n}"),
            RpcId::String(s) => write!(f, "{s}"),
        }
    }
}

/// Standard JSON-RPC 2.0 error codes used by this daemon (§4.2, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
}

impl RpcErrorCode {
    pub fn code(self) -> i64 {
        match self {
            RpcErrorCode::ParseError => -32700,
            RpcErrorCode::InvalidRequest => -32600,
            RpcErrorCode::MethodNotFound => -32601,
            RpcErrorCode::InvalidParams => -32602,
            RpcErrorCode::InternalError => -32000,
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            RpcErrorCode::ParseError => "Parse error",
            RpcErrorCode::InvalidRequest => "Invalid Request",
            RpcErrorCode::MethodNotFound => "Method not found",
            RpcErrorCode::InvalidParams => "Invalid params",
            RpcErrorCode::InternalError => "Internal error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: RpcErrorCode) -> Self {
        Self { code: code.code(), message: code.default_message().to_string(), data: None }
    }

    pub fn with_description(code: RpcErrorCode, description: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: code.default_message().to_string(),
            data: Some(serde_json::json!({ "description": description.into() })),
        }
    }

    pub fn internal(data: Value) -> Self {
        Self {
            code: RpcErrorCode::InternalError.code(),
            message: RpcErrorCode::InternalError.default_message().to_string(),
            data: Some(data),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: RpcId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: RpcId,
    pub result: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub id: Option<RpcId>,
    pub error: RpcError,
}

/// A parsed, already-validated JSON-RPC message.
#[derive(Debug, Clone)]
pub enum Message {
    Request(Request),
    Notification(Notification),
    Response(Response),
    Error(ErrorResponse),
}

impl Message {
    pub fn id(&self) -> Option<RpcId> {
        match self {
            Message::Request(r) => Some(r.id.clone()),
            Message::Notification(_) => None,
            Message::Response(r) => Some(r.id.clone()),
            Message::Error(e) => e.id.clone(),
        }
    }
}

impl Serialize for Message {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("jsonrpc", "2.0")?;
        match self {
            Message::Request(r) => {
                map.serialize_entry("id", &r.id)?;
                map.serialize_entry("method", &r.method)?;
                if let Some(params) = &r.params {
                    map.serialize_entry("params", params)?;
                }
            }
            Message::Notification(n) => {
                map.serialize_entry("method", &n.method)?;
                if let Some(params) = &n.params {
                    map.serialize_entry("params", params)?;
                }
            }
            Message::Response(r) => {
                map.serialize_entry("id", &r.id)?;
                map.serialize_entry("result", &r.result)?;
            }
            Message::Error(e) => {
                map.serialize_entry("id", &e.id)?;
                map.serialize_entry("error", &e.error)?;
            }
        }
        map.end()
    }
}

/// Parse and validate one already-deserialized JSON value into a
/// [`Message`], per the envelope rules in §4.2. Does not parse bytes —
/// see [`crate::decode`] for that, which also handles batching.
pub fn parse_value(value: Value) -> Result<Message, RpcError> {
    let obj = value
        .as_object()
        .ok_or_else(|| RpcError::new(RpcErrorCode::InvalidRequest))?;

    match obj.get("jsonrpc") {
        Some(Value::String(v)) if v == "2.0" => {}
        _ => return Err(RpcError::new(RpcErrorCode::InvalidRequest)),
    }

    let has_result = obj.contains_key("result");
    let has_error = obj.contains_key("error");
    if has_result && has_error {
        return Err(RpcError::new(RpcErrorCode::InvalidRequest));
    }

    if has_result || has_error {
        let id = match obj.get("id") {
            None | Some(Value::Null) => None,
            Some(v) => Some(
                serde_json::from_value::<RpcId>(v.clone())
                    .map_err(|_| RpcError::new(RpcErrorCode::InvalidRequest))?,
            ),
        };
        if has_result {
            let id = id.ok_or_else(|| RpcError::new(RpcErrorCode::InvalidRequest))?;
            let result = obj.get("result").cloned().unwrap_or(Value::Null);
            return Ok(Message::Response(Response { id, result }));
        }
        let error_value = obj.get("error").cloned().ok_or_else(|| RpcError::new(RpcErrorCode::InvalidRequest))?;
        let error: RpcError = serde_json::from_value(error_value)
            .map_err(|_| RpcError::new(RpcErrorCode::InvalidRequest))?;
        return Ok(Message::Error(ErrorResponse { id, error }));
    }

    let method = match obj.get("method") {
        Some(Value::String(m)) => m.clone(),
        _ => return Err(RpcError::new(RpcErrorCode::InvalidRequest)),
    };
    let params = obj.get("params").cloned();

    match obj.get("id") {
        None => Ok(Message::Notification(Notification { method, params })),
        Some(Value::Null) => Ok(Message::Notification(Notification { method, params })),
        Some(id_value) => {
            let id = serde_json::from_value::<RpcId>(id_value.clone())
                .map_err(|_| RpcError::new(RpcErrorCode::InvalidRequest))?;
            Ok(Message::Request(Request { id, method, params }))
        }
    }
}

/// Decode one frame payload into one or more messages, honoring JSON-RPC
/// batching (a top-level array is processed element-by-element; a
/// malformed byte stream is a single `ParseError`).
pub fn decode(bytes: &[u8]) -> Result<Vec<Result<Message, RpcError>>, RpcError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|_| RpcError::new(RpcErrorCode::ParseError))?;
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(RpcError::new(RpcErrorCode::InvalidRequest));
            }
            Ok(items.into_iter().map(parse_value).collect())
        }
        single => Ok(vec![parse_value(single)]),
    }
}

/// Serialize a response message to a frame payload, including batching
/// when more than one response was produced for a batch request.
pub fn encode_many(messages: &[Message]) -> Result<Vec<u8>, serde_json::Error> {
    if messages.len() == 1 {
        serde_json::to_vec(&messages[0])
    } else {
        serde_json::to_vec(messages)
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
