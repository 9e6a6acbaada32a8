// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A [`Controller`] built directly on `orchestra_storage::{Queue, Registry}`.
//!
//! This is the generic dialect: it works with any `KvStore` (memory, disk,
//! or the HTTP-proxied KV), which makes it the natural Controller for unit
//! tests and for single-process deployments that don't need the strict,
//! transactional exclusivity `SqliteController` buys with raw `UPDATE …
//! WHERE` guards. Exclusivity here is the Queue/Registry's best-effort CAS,
//! not a database transaction.

use crate::controller::{Controller, ControllerStatus, Leased};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orchestra_core::{JobConfig, JobInfo, LeaseId, LogCategory, LogMessage, OrchestraError, Progress, Report, Token, WorkerId};
use orchestra_storage::{Queue, Registry};

/// Default bound on `requeue_count` before a persistently-crashing job is
/// marked `aborted` instead of requeued again (§9 open question (a)).
const DEFAULT_MAX_REQUEUES: u32 = 5;

pub struct KvController {
    queue: Queue,
    registry: Registry,
    max_requeues: u32,
}

impl KvController {
    pub fn new(queue: Queue, registry: Registry) -> Self {
        Self { queue, registry, max_requeues: DEFAULT_MAX_REQUEUES }
    }

    pub fn with_max_requeues(mut self, max_requeues: u32) -> Self {
        self.max_requeues = max_requeues;
        self
    }
}

#[async_trait]
impl Controller for KvController {
    async fn submit(&self, config: JobConfig, now: DateTime<Utc>) -> Result<(), OrchestraError> {
        self.queue.submit(config, now).await
    }

    async fn lease(&self, owner: WorkerId, ttl: chrono::Duration, now: DateTime<Utc>) -> Result<Option<Leased>, OrchestraError> {
        let Some(acquired) = self.queue.try_lease(owner.clone(), now, ttl).await? else {
            return Ok(None);
        };
        let info = JobInfo::start(owner.as_str(), acquired.config.clone(), owner, now);
        self.registry.start(info, acquired.lease.id).await?;
        Ok(Some(Leased {
            config: acquired.config,
            lease_id: acquired.lease.id,
        }))
    }

    async fn refresh(&self, token: &Token, lease_id: LeaseId, ttl: chrono::Duration, now: DateTime<Utc>) -> Result<(), OrchestraError> {
        self.queue.refresh_lease(token, lease_id, now, ttl).await
    }

    async fn push(&self, info: JobInfo, lease_id: LeaseId) -> Result<(), OrchestraError> {
        self.registry.write(info, lease_id).await
    }

    async fn complete(&self, token: &Token, lease_id: LeaseId, report: Report, now: DateTime<Utc>) -> Result<(), OrchestraError> {
        let mut info = self
            .registry
            .get(token)
            .await?
            .ok_or_else(|| OrchestraError::UnknownToken(token.to_string()))?;
        info.report = report;
        info.apply_progress(Progress::completed(), now);
        self.registry.write(info, lease_id).await?;
        self.registry.release_lease(token).await?;
        self.queue.remove(token).await
    }

    async fn fail(&self, token: &Token, lease_id: LeaseId, reason: &str, requeue: bool, now: DateTime<Utc>) -> Result<(), OrchestraError> {
        let mut info = self
            .registry
            .get(token)
            .await?
            .ok_or_else(|| OrchestraError::UnknownToken(token.to_string()))?;

        let requeue_count = self.queue.requeue_count(token).await?;
        if requeue && requeue_count < self.max_requeues {
            info.report.log(LogCategory::Warning, LogMessage::new(now, "worker", reason));
            let config = info.config.clone();
            self.queue.requeue(token, config, now).await?;
            info.requeue(now);
            self.registry.write(info, lease_id).await?;
            self.registry.release_lease(token).await
        } else {
            let reason = if requeue {
                format!("requeue limit ({}) exceeded: {reason}", self.max_requeues)
            } else {
                reason.to_string()
            };
            self.registry.force_abort(token, reason, now).await?;
            self.queue.remove(token).await
        }
    }

    async fn abort_mark(&self, token: &Token, origin: &str, reason: &str, now: DateTime<Utc>) -> Result<(), OrchestraError> {
        let verbose = format!("{origin}: {reason}");
        self.registry.force_abort(token, verbose, now).await
    }

    async fn get_info(&self, token: &Token) -> Result<Option<JobInfo>, OrchestraError> {
        self.registry.get(token).await
    }

    async fn status(&self) -> Result<ControllerStatus, OrchestraError> {
        Ok(ControllerStatus {
            queue_size: self.queue.len().await?,
            registry_size: self.registry.len().await?,
            running_tokens: self.registry.running_tokens().await?,
        })
    }
}

#[cfg(test)]
#[path = "kv_controller_tests.rs"]
mod tests;
