// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requests carried over the Orchestration-Controls binding (C9).

use orchestra_core::{JobConfig, LeaseId, Report, Token, WorkerId};
use serde::{Deserialize, Serialize};

/// Request from a CLI or peer replica to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check.
    Ping,

    /// Protocol version handshake, first message on a new connection.
    Hello { version: String },

    /// Submit a new job (`ServiceAdapter::submit`).
    Submit { config: JobConfig },

    /// Non-blocking check of whether a job is still queued/running
    /// (`ServiceAdapter::poll`).
    Poll { token: Token },

    /// Fetch the current `JobInfo` (`ServiceAdapter::get_info`).
    GetInfo { token: Token },

    /// Fetch the current `Report` (`ServiceAdapter::get_report`).
    GetReport { token: Token },

    /// Fetch just the current `Progress` (`ServiceAdapter::progress`).
    Progress { token: Token },

    /// Request cooperative abort of a running job, cascading to children
    /// (`ServiceAdapter::abort`).
    Abort { token: Token, origin: String, reason: String },

    /// Controller/Daemon status snapshot.
    ControllerStatus,

    /// Start the Controller dispatch loop if it isn't already running.
    ControllerStart,

    /// Ask the Controller to stop accepting new leases and drain.
    ControllerStop,

    /// Forcibly kill the Controller's current worker without draining.
    ControllerKill,

    /// `Controller::lease`, sent by a Worker dialing a remote Controller.
    Lease { owner: WorkerId, ttl_secs: i64 },

    /// `Controller::refresh`.
    Refresh { token: Token, lease_id: LeaseId, ttl_secs: i64 },

    /// `Controller::push`.
    Push { info: Box<orchestra_core::JobInfo>, lease_id: LeaseId },

    /// `Controller::complete`.
    Complete { token: Token, lease_id: LeaseId, report: Box<Report> },

    /// `Controller::fail`.
    Fail { token: Token, lease_id: LeaseId, reason: String, requeue: bool },
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
