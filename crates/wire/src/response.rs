// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Responses carried over the Orchestration-Controls binding (C9).

use orchestra_core::{JobConfig, JobInfo, LeaseId, Progress, Report, Token};
use serde::{Deserialize, Serialize};

/// Snapshot of Controller/Daemon health, returned by `ControllerStatus`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControllerStatusPayload {
    pub running: bool,
    pub active_leases: usize,
    pub queue_depth: usize,
    pub uptime_secs: u64,
}

/// Wire form of `controller::Leased`, returned by a `Request::Lease` call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeasedPayload {
    pub config: JobConfig,
    pub lease_id: LeaseId,
}

/// Response from the daemon back to a CLI or peer replica.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success with no payload.
    Ok,

    /// Health check response.
    Pong,

    /// Version handshake response.
    Hello { version: String },

    /// Job accepted onto the Queue.
    Submitted { token: Token },

    /// `JobInfo` for a token, `None` if unknown or already garbage-collected.
    Info { info: Option<Box<JobInfo>> },

    /// `Report` for a token, `None` if unknown.
    Report { report: Option<Box<Report>> },

    /// `Progress` for a token, `None` if unknown.
    Progress { progress: Option<Progress> },

    /// Controller/Daemon status snapshot.
    ControllerStatus { status: ControllerStatusPayload },

    /// Request failed; `status_hint` mirrors `OrchestraError::status_hint`.
    Error { message: String, status_hint: u16 },

    /// Response to `Request::Lease`; `None` means nothing was leasable.
    Leased { leased: Option<LeasedPayload> },
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
