// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The KV Store Interface (C1): a uniform key -> JSON mapping with optional
//! TTL, CAS-style push/pop, and key enumeration. Every concrete backend
//! (memory, disk, SQL, HTTP-proxy) implements this one trait.

use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io failure: {0}")]
    Io(String),
}

/// One entry returned by [`KvStore::next`]: a key paired with its value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct KvEntry {
    pub key: String,
    pub value: serde_json::Value,
}

/// Uniform key -> JSON mapping consumed by the Queue and Registry.
///
/// Every operation is serializable within a single backend instance;
/// concurrent callers observe linearizable semantics on the same key. TTL
/// expiry is passive (checked on read) and, for backends that support it,
/// actively swept in the background.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Idempotent replace. `ttl` of `None` means the key never expires.
    async fn write(&self, key: &str, value: serde_json::Value, ttl: Option<Duration>) -> Result<(), KvError>;

    /// Read a value. `pop == true` makes the read-and-delete atomic.
    async fn read(&self, key: &str, pop: bool) -> Result<Option<serde_json::Value>, KvError>;

    /// Idempotent delete; missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<(), KvError>;

    /// Unordered set of all live (non-expired) keys.
    async fn keys(&self) -> Result<HashSet<String>, KvError>;

    /// Return one entry from a non-deterministic but fair rotation, used by
    /// the Queue to approximate FIFO without a strict ordering guarantee.
    /// `pop == true` removes the entry atomically with the read.
    async fn next(&self, pop: bool) -> Result<Option<KvEntry>, KvError>;
}

#[cfg(test)]
#[path = "kv_contract_tests.rs"]
pub(crate) mod contract_tests;
