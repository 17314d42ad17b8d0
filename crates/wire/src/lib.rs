// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for daemon communication: JSON-RPC 2.0 over a
//! length-prefixed local socket (§4.1, §4.2).

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod correlation;
mod framing;
mod message;

pub use correlation::{EndpointAllocator, EndpointId, OriginTable};
pub use framing::{read_message, write_message, FrameError, PROTOCOL_VERSION};
pub use message::{
    decode, encode_many, parse_value, ErrorResponse, Message, Notification, Request, Response,
    RpcError, RpcErrorCode, RpcId,
};
