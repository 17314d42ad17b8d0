// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UIT transport stub.
//!
//! The real UIT backend submits over a Kerberos-authenticated SOAP
//! gateway (DoD HPC's "UIT" web service), not a shell. Building a SOAP
//! client and Kerberos ticket management is out of scope here (§11
//! supplemented features records the cache shape for a future
//! implementation); this module keeps the session-cache bookkeeping the
//! original dropped but declines every actual transport operation so a
//! `Uit` queue fails fast and legibly instead of silently behaving like
//! SSH.

use crate::error::BackendError;
use crate::transport::{ExecOutput, RemoteShellTransport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;

/// Identifies a cached Kerberos session: a user principal within a
/// realm, e.g. `("alice", "HPC.MIL")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub username: String,
    pub realm: String,
}

/// A cached ticket handle, opaque to everything but the (unimplemented)
/// SOAP client. `expires_at_epoch_ms` lets callers evict stale entries
/// without needing the real ticket's own expiry parser.
#[derive(Debug, Clone)]
pub struct CachedSession {
    pub ticket: String,
    pub expires_at_epoch_ms: i64,
}

/// Keeps at most one session per `(user, realm)` pair alive at a time,
/// mirroring the original's one-ticket-per-principal assumption.
#[derive(Default)]
pub struct KerberosSessionCache {
    sessions: Mutex<HashMap<SessionKey, CachedSession>>,
}

impl KerberosSessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: SessionKey, session: CachedSession) {
        self.sessions.lock().insert(key, session);
    }

    pub fn get(&self, key: &SessionKey, now_epoch_ms: i64) -> Option<CachedSession> {
        let sessions = self.sessions.lock();
        let session = sessions.get(key)?;
        if session.expires_at_epoch_ms <= now_epoch_ms {
            return None;
        }
        Some(session.clone())
    }

    pub fn evict_expired(&self, now_epoch_ms: i64) {
        self.sessions
            .lock()
            .retain(|_, session| session.expires_at_epoch_ms > now_epoch_ms);
    }
}

/// A [`RemoteShellTransport`] that always reports itself unconfigured.
/// Exists so `QueueType::Uit` has a value to construct and route
/// through the same pipeline code path as the SSH-backed schedulers,
/// without pretending to speak the SOAP protocol it hasn't implemented.
pub struct UitTransport {
    cache: KerberosSessionCache,
}

impl UitTransport {
    pub fn new() -> Self {
        Self { cache: KerberosSessionCache::new() }
    }

    pub fn session_cache(&self) -> &KerberosSessionCache {
        &self.cache
    }
}

impl Default for UitTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteShellTransport for UitTransport {
    async fn execute(&self, _command: &str) -> Result<ExecOutput, BackendError> {
        tracing::warn!("UIT queue operation attempted but the SOAP transport is not implemented");
        Err(BackendError::NotConfigured("UIT SOAP transport is not implemented"))
    }

    async fn copy_to(&self, _local_path: &Path, _remote_path: &str) -> Result<(), BackendError> {
        Err(BackendError::NotConfigured("UIT SOAP transport is not implemented"))
    }

    async fn copy_from(&self, _remote_path: &str, _local_path: &Path) -> Result<(), BackendError> {
        Err(BackendError::NotConfigured("UIT SOAP transport is not implemented"))
    }

    async fn copy_dir_to(&self, _local_dir: &Path, _remote_dir: &str) -> Result<(), BackendError> {
        Err(BackendError::NotConfigured("UIT SOAP transport is not implemented"))
    }

    async fn copy_dir_from(&self, _remote_dir: &str, _local_dir: &Path) -> Result<(), BackendError> {
        Err(BackendError::NotConfigured("UIT SOAP transport is not implemented"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_forgets_expired_sessions() {
        let cache = KerberosSessionCache::new();
        let key = SessionKey { username: "alice".into(), realm: "HPC.MIL".into() };
        cache.insert(key.clone(), CachedSession { ticket: "t1".into(), expires_at_epoch_ms: 1_000 });
        assert!(cache.get(&key, 500).is_some());
        assert!(cache.get(&key, 1_500).is_none());
    }

    #[test]
    fn evict_expired_removes_only_stale_entries() {
        let cache = KerberosSessionCache::new();
        let fresh = SessionKey { username: "bob".into(), realm: "HPC.MIL".into() };
        let stale = SessionKey { username: "carol".into(), realm: "HPC.MIL".into() };
        cache.insert(fresh.clone(), CachedSession { ticket: "t2".into(), expires_at_epoch_ms: 10_000 });
        cache.insert(stale.clone(), CachedSession { ticket: "t3".into(), expires_at_epoch_ms: 100 });
        cache.evict_expired(1_000);
        assert!(cache.get(&fresh, 1_000).is_some());
        assert!(cache.get(&stale, 1_000).is_none());
    }

    #[tokio::test]
    async fn transport_operations_report_not_configured() {
        let t = UitTransport::new();
        assert!(matches!(t.execute("anything").await, Err(BackendError::NotConfigured(_))));
    }
}
