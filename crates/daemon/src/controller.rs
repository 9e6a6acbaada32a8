// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Controller (C5): the single seam Workers dispatch through. Two
//! dialects share this trait — [`crate::sqlite_controller::SqliteController`]
//! (strict, transactional exclusivity over a local SQLite file) and
//! [`crate::http_controller::HttpController`] (a thin client over the
//! Orchestration-Controls API, for a remote/shared Controller). Workers
//! never touch `orchestra_storage::{Queue, Registry}` directly; they go
//! through whichever dialect is configured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orchestra_core::{JobConfig, JobInfo, LeaseId, OrchestraError, Report, Token, WorkerId};

/// Snapshot returned by `GET /orchestration`: cheap counters plus the set of
/// tokens currently running in this replica.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ControllerStatus {
    pub queue_size: usize,
    pub registry_size: usize,
    pub running_tokens: Vec<Token>,
}

/// Outcome of a successful lease: the job to run plus the lease id the
/// Worker must present on every subsequent `refresh`/`complete`/`fail`.
#[derive(Debug, Clone)]
pub struct Leased {
    pub config: JobConfig,
    pub lease_id: LeaseId,
}

/// Contract shared by every Controller dialect. Operations mirror §4.5:
/// `lease`, `refresh`, `complete`, `fail`, `abort_mark`, plus `submit` and
/// `status` to round out what a Worker and a ServiceAdapter both need.
#[async_trait]
pub trait Controller: Send + Sync {
    /// Enqueue a new job. Returns once the Queue write is durable.
    async fn submit(&self, config: JobConfig, now: DateTime<Utc>) -> Result<(), OrchestraError>;

    /// Attempt to lease the oldest dispatchable entry for `owner`. `None`
    /// means there is nothing leasable right now — the Worker's lease loop
    /// should sleep for `worker_interval` and retry.
    async fn lease(&self, owner: WorkerId, ttl: chrono::Duration, now: DateTime<Utc>) -> Result<Option<Leased>, OrchestraError>;

    /// Extend a held lease. A `LeaseLost` error means another worker has
    /// already re-leased the token; the caller must stop processing and
    /// must not issue any further Registry writes for it.
    async fn refresh(&self, token: &Token, lease_id: LeaseId, ttl: chrono::Duration, now: DateTime<Utc>) -> Result<(), OrchestraError>;

    /// Record the Registry snapshot for a job still in flight (periodic
    /// progress push). CAS-guarded by `lease_id`, same as `refresh`.
    async fn push(&self, info: JobInfo, lease_id: LeaseId) -> Result<(), OrchestraError>;

    /// Mark a leased job `completed`, release its lease, and drop its Queue
    /// entry.
    async fn complete(&self, token: &Token, lease_id: LeaseId, report: Report, now: DateTime<Utc>) -> Result<(), OrchestraError>;

    /// A job ended abnormally (crash or timeout). If `requeue` is true and
    /// the retry budget isn't exhausted, the job goes back onto the Queue;
    /// otherwise it's marked `aborted` with `reason` logged.
    async fn fail(&self, token: &Token, lease_id: LeaseId, reason: &str, requeue: bool, now: DateTime<Utc>) -> Result<(), OrchestraError>;

    /// Force a job to `aborted` regardless of lease ownership (invariant 6).
    /// Used by the Abort Coordinator; idempotent, no-ops if already
    /// terminal.
    async fn abort_mark(&self, token: &Token, origin: &str, reason: &str, now: DateTime<Utc>) -> Result<(), OrchestraError>;

    async fn get_info(&self, token: &Token) -> Result<Option<JobInfo>, OrchestraError>;

    async fn status(&self) -> Result<ControllerStatus, OrchestraError>;
}
