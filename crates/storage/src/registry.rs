// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Registry (C2): KV-backed storage of [`JobInfo`], CAS-guarded by the
//! lease id the writer presents. A write whose `lease_id` doesn't match the
//! one currently on file is rejected as `LEASE_LOST`, the mechanism that
//! keeps a worker whose lease has already been stolen from clobbering the
//! new owner's progress.

use crate::kv::KvStore;
use chrono::{DateTime, Utc};
use orchestra_core::{JobInfo, LeaseId, OrchestraError, Token};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn registry_key(token: &Token) -> String {
    format!("registry:{token}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryRecord {
    info: JobInfo,
    lease_id: Option<LeaseId>,
}

pub struct Registry {
    store: Arc<dyn KvStore>,
}

impl Registry {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// First write for a token: records the owning lease id with no CAS
    /// check, since nothing can be racing a brand new Registry entry.
    pub async fn start(&self, info: JobInfo, lease_id: LeaseId) -> Result<(), OrchestraError> {
        self.put(&RegistryRecord {
            info,
            lease_id: Some(lease_id),
        })
        .await
    }

    /// Write an updated `JobInfo`, guarded by the caller's `lease_id`. Fails
    /// with `LEASE_LOST` if the stored record belongs to a different lease
    /// (invariant 2: exclusivity is enforced at the write, not the read).
    pub async fn write(&self, info: JobInfo, lease_id: LeaseId) -> Result<(), OrchestraError> {
        let token = info.token.clone();
        let current = self.read_record(&token).await?;
        match current {
            Some(record) if record.lease_id != Some(lease_id) => Err(OrchestraError::LeaseLost(token.to_string())),
            _ => {
                self.put(&RegistryRecord {
                    info,
                    lease_id: Some(lease_id),
                })
                .await
            }
        }
    }

    /// Clear the lease association without touching `info`, used when a
    /// job is requeued and no worker currently owns it.
    pub async fn release_lease(&self, token: &Token) -> Result<(), OrchestraError> {
        let Some(mut record) = self.read_record(token).await? else {
            return Ok(());
        };
        record.lease_id = None;
        self.put(&record).await
    }

    pub async fn get(&self, token: &Token) -> Result<Option<JobInfo>, OrchestraError> {
        Ok(self.read_record(token).await?.map(|r| r.info))
    }

    pub async fn delete(&self, token: &Token) -> Result<(), OrchestraError> {
        self.store
            .delete(&registry_key(token))
            .await
            .map_err(|e| OrchestraError::BackendUnavailable(e.to_string()))
    }

    /// Any replica may mark a job aborted regardless of lease ownership
    /// (invariant 6: abort is idempotent and not gated on holding the
    /// lease), so this intentionally bypasses the CAS guard.
    pub async fn force_abort(&self, token: &Token, verbose: impl Into<String>, now: DateTime<Utc>) -> Result<(), OrchestraError> {
        let Some(mut record) = self.read_record(token).await? else {
            return Err(OrchestraError::UnknownToken(token.to_string()));
        };
        if record.info.status.is_terminal() {
            return Ok(());
        }
        let verbose = verbose.into();
        record.info.report.log(
            orchestra_core::LogCategory::Event,
            orchestra_core::LogMessage::new(now, "abort", verbose.clone()),
        );
        record.info.apply_progress(orchestra_core::Progress::aborted(verbose), now);
        self.put(&record).await
    }

    /// Count of entries currently in the Registry, for the cheap
    /// `GET /orchestration` status snapshot.
    pub async fn len(&self) -> Result<usize, OrchestraError> {
        self.store
            .keys()
            .await
            .map(|k| k.iter().filter(|k| k.starts_with("registry:")).count())
            .map_err(|e| OrchestraError::BackendUnavailable(e.to_string()))
    }

    /// Tokens of every job currently `running`, for `GET /orchestration`'s
    /// `orchestrator.jobs` field.
    pub async fn running_tokens(&self) -> Result<Vec<Token>, OrchestraError> {
        let keys = self
            .store
            .keys()
            .await
            .map_err(|e| OrchestraError::BackendUnavailable(e.to_string()))?;
        let mut tokens = Vec::new();
        for key in keys {
            if !key.starts_with("registry:") {
                continue;
            }
            let raw = self
                .store
                .read(&key, false)
                .await
                .map_err(|e| OrchestraError::BackendUnavailable(e.to_string()))?;
            let Some(raw) = raw else { continue };
            if let Ok(record) = serde_json::from_value::<RegistryRecord>(raw) {
                if record.info.status == orchestra_core::ProgressStatus::Running {
                    tokens.push(record.info.token);
                }
            }
        }
        Ok(tokens)
    }

    async fn read_record(&self, token: &Token) -> Result<Option<RegistryRecord>, OrchestraError> {
        let raw = self
            .store
            .read(&registry_key(token), false)
            .await
            .map_err(|e| OrchestraError::BackendUnavailable(e.to_string()))?;
        raw.map(|v| serde_json::from_value(v).map_err(|e| OrchestraError::BadRequest(e.to_string())))
            .transpose()
    }

    async fn put(&self, record: &RegistryRecord) -> Result<(), OrchestraError> {
        let value = serde_json::to_value(record).map_err(|e| OrchestraError::BadRequest(e.to_string()))?;
        self.store
            .write(&registry_key(&record.info.token), value, None)
            .await
            .map_err(|e| OrchestraError::BackendUnavailable(e.to_string()))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
