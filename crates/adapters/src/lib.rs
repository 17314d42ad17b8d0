// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote batch scheduler adapters: the transport capability trait
//! (§4.7, §9), its SSH-backed and UIT-stub implementations, and the
//! per-scheduler output parsers that sit on top of either.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod error;
pub mod protocol;
pub mod ssh_transport;
pub mod transport;
pub mod uit;

#[cfg(feature = "test-support")]
pub mod fake_transport;

pub use error::BackendError;
pub use protocol::{for_queue_type, OarProtocol, PbsProtocol, SchedulerProtocol, SgeProtocol, SlurmProtocol};
pub use ssh_transport::SshTransport;
pub use transport::{guard_against_root, ExecOutput, RemoteShellTransport};
pub use uit::{CachedSession, KerberosSessionCache, SessionKey, UitTransport};

#[cfg(feature = "test-support")]
pub use fake_transport::{Call, FakeTransport};
