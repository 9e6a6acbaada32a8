// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Queue (C2): KV-backed storage of pending [`JobConfig`]s plus the
//! lease bookkeeping that makes dispatch exclusive. Built on any
//! [`KvStore`], so exclusivity here is best-effort/eventually-consistent —
//! strict, transactional exclusivity lives in the SQLite Controller dialect,
//! which bypasses this type entirely.

use crate::kv::KvStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orchestra_core::{JobConfig, Lease, LeaseId, OrchestraError, QueueEntry, Token, WorkerId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn queue_key(token: &Token) -> String {
    format!("queue:{token}")
}

/// What the Queue actually stores per pending job: the immutable config the
/// client submitted, plus the mutable lease/requeue bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct QueueRecord {
    config: JobConfig,
    entry: QueueEntry,
}

/// Outcome of a successful lease acquisition: the config to hand the worker
/// plus the lease id it must present on every subsequent Queue/Registry
/// write (invariant 2's CAS guard).
#[derive(Debug, Clone)]
pub struct Acquired {
    pub config: JobConfig,
    pub lease: Lease,
}

pub struct Queue {
    store: Arc<dyn KvStore>,
}

impl Queue {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Submit a job: writes its `JobConfig` into the Queue with a fresh,
    /// unleased entry. `JobConfig` is immutable from this point on.
    pub async fn submit(&self, config: JobConfig, now: DateTime<Utc>) -> Result<(), OrchestraError> {
        let record = QueueRecord {
            entry: QueueEntry::new(config.token.clone(), now),
            config,
        };
        self.write(&record).await
    }

    /// Attempt to lease the next dispatchable entry (oldest `enqueued_at`
    /// among those with no valid lease). Returns `None` if the Queue has no
    /// leasable work right now.
    pub async fn try_lease(
        &self,
        owner: WorkerId,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Result<Option<Acquired>, OrchestraError> {
        // `next` gives a fair, non-deterministic rotation; skip entries that
        // are currently leased by someone else and keep scanning.
        let mut scanned = 0usize;
        loop {
            let Some(entry) = self
                .store
                .next(false)
                .await
                .map_err(|e| OrchestraError::BackendUnavailable(e.to_string()))?
            else {
                return Ok(None);
            };
            scanned += 1;
            let Ok(mut record) = serde_json::from_value::<QueueRecord>(entry.value.clone()) else {
                continue;
            };
            if record.entry.is_leasable(now) {
                let lease = Lease::new(owner, now, ttl);
                record.entry.lease = Some(lease.clone());
                self.write(&record).await?;
                return Ok(Some(Acquired {
                    config: record.config,
                    lease,
                }));
            }
            // Bound the scan to the number of keys currently present so a
            // queue that's entirely leased doesn't spin forever.
            if scanned >= self.store.keys().await.map(|k| k.len()).unwrap_or(scanned).max(1) {
                return Ok(None);
            }
        }
    }

    /// Extend a held lease. Fails with `LEASE_LOST` if the caller's
    /// `lease_id` no longer matches what's stored (someone else re-leased
    /// after expiry) or the entry has been removed (job completed/aborted).
    pub async fn refresh_lease(
        &self,
        token: &Token,
        lease_id: LeaseId,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Result<(), OrchestraError> {
        let mut record = self.read(token).await?.ok_or_else(|| OrchestraError::LeaseLost(token.to_string()))?;
        match &mut record.entry.lease {
            Some(lease) if lease.id == lease_id => {
                lease.refresh(now, ttl);
                self.write(&record).await
            }
            _ => Err(OrchestraError::LeaseLost(token.to_string())),
        }
    }

    /// Remove a Queue entry once its job has started running (dispatch is
    /// complete; further state lives only in the Registry).
    pub async fn remove(&self, token: &Token) -> Result<(), OrchestraError> {
        self.store
            .delete(&queue_key(token))
            .await
            .map_err(|e| OrchestraError::BackendUnavailable(e.to_string()))
    }

    /// Invariant 3's one permitted back-edge: put a running job's token back
    /// onto the Queue as freshly leasable, bumping `requeue_count`.
    pub async fn requeue(&self, token: &Token, config: JobConfig, now: DateTime<Utc>) -> Result<(), OrchestraError> {
        let requeue_count = self
            .read(token)
            .await?
            .map(|r| r.entry.requeue_count + 1)
            .unwrap_or(1);
        let mut entry = QueueEntry::new(token.clone(), now);
        entry.requeue_count = requeue_count;
        self.write(&QueueRecord { config, entry }).await
    }

    /// Current `requeue_count` for a token still sitting in the Queue, for
    /// the Controller's bounded-requeue check ahead of `fail(..., requeue)`.
    /// `0` if the token isn't present (never requeued yet).
    pub async fn requeue_count(&self, token: &Token) -> Result<u32, OrchestraError> {
        Ok(self.read(token).await?.map(|r| r.entry.requeue_count).unwrap_or(0))
    }

    /// Count of entries currently in the Queue (leased or not), for the
    /// cheap `GET /orchestration` status snapshot.
    pub async fn len(&self) -> Result<usize, OrchestraError> {
        self.store
            .keys()
            .await
            .map(|k| k.iter().filter(|k| k.starts_with("queue:")).count())
            .map_err(|e| OrchestraError::BackendUnavailable(e.to_string()))
    }

    async fn read(&self, token: &Token) -> Result<Option<QueueRecord>, OrchestraError> {
        let raw = self
            .store
            .read(&queue_key(token), false)
            .await
            .map_err(|e| OrchestraError::BackendUnavailable(e.to_string()))?;
        raw.map(|v| serde_json::from_value(v).map_err(|e| OrchestraError::BadRequest(e.to_string())))
            .transpose()
    }

    async fn write(&self, record: &QueueRecord) -> Result<(), OrchestraError> {
        let value = serde_json::to_value(record).map_err(|e| OrchestraError::BadRequest(e.to_string()))?;
        self.store
            .write(&queue_key(&record.entry.token), value, None)
            .await
            .map_err(|e| OrchestraError::BackendUnavailable(e.to_string()))
    }
}

/// Thin seam so callers that only need `try_lease`/`submit` can be mocked in
/// tests without a full `KvStore`.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn submit(&self, config: JobConfig, now: DateTime<Utc>) -> Result<(), OrchestraError>;
    async fn try_lease(&self, owner: WorkerId, now: DateTime<Utc>, ttl: chrono::Duration) -> Result<Option<Acquired>, OrchestraError>;
}

#[async_trait]
impl Dispatch for Queue {
    async fn submit(&self, config: JobConfig, now: DateTime<Utc>) -> Result<(), OrchestraError> {
        Queue::submit(self, config, now).await
    }

    async fn try_lease(&self, owner: WorkerId, now: DateTime<Utc>, ttl: chrono::Duration) -> Result<Option<Acquired>, OrchestraError> {
        Queue::try_lease(self, owner, now, ttl).await
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
