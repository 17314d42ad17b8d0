// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response correlation across peers (§4.2).
//!
//! The RPC layer never itself needs a table for client-originated
//! requests: their ids are opaque and echoed straight back on the same
//! connection. The table in this module exists for the rarer direction —
//! when the server originates a request to a client — since two
//! different clients may happen to pick overlapping numeric ids and the
//! server must still route each response back to the peer that should
//! see it.

use crate::message::RpcId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// Opaque per-connection endpoint identifier, assigned on connect
/// (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(u64);

/// Hands out strictly increasing [`EndpointId`]s for new connections.
#[derive(Debug, Default)]
pub struct EndpointAllocator {
    next: AtomicI64,
}

impl EndpointAllocator {
    pub fn new() -> Self {
        Self { next: AtomicI64::new(1) }
    }

    pub fn allocate(&self) -> EndpointId {
        EndpointId(self.next.fetch_add(1, Ordering::SeqCst) as u64)
    }
}

/// Maps `(connection, peer-id)` to the id the server actually put on the
/// wire when it originated a request, so the reply can be routed back
/// and re-keyed on the peer's original id.
#[derive(Debug, Default)]
pub struct OriginTable {
    next_server_id: AtomicI64,
    outstanding: Mutex<HashMap<i64, (EndpointId, RpcId)>>,
}

impl OriginTable {
    pub fn new() -> Self {
        Self { next_server_id: AtomicI64::new(1), outstanding: Mutex::new(HashMap::new()) }
    }

    /// Allocate a fresh server-side id for an outgoing server-initiated
    /// request and remember which peer/id pair it correlates to.
    pub fn originate(&self, endpoint: EndpointId, client_visible_id: RpcId) -> RpcId {
        let server_id = self.next_server_id.fetch_add(1, Ordering::SeqCst);
        self.outstanding.lock().insert(server_id, (endpoint, client_visible_id));
        RpcId::Number(server_id)
    }

    /// Resolve an incoming response's id back to the endpoint and
    /// original id, removing the entry (a response is consumed once).
    pub fn resolve(&self, server_id: &RpcId) -> Option<(EndpointId, RpcId)> {
        let key = match server_id {
            RpcId::Number(n) => *n,
            RpcId::String(_) => return None,
        };
        self.outstanding.lock().remove(&key)
    }

    /// Drop every pending origin entry for a disconnected endpoint
    /// (§4.2 cancellation: a closed connection's pending entries are
    /// dropped silently).
    pub fn purge_endpoint(&self, endpoint: EndpointId) {
        self.outstanding.lock().retain(|_, (ep, _)| *ep != endpoint);
    }
}

#[cfg(test)]
#[path = "correlation_tests.rs"]
mod tests;
