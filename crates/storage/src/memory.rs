// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory KV backend. Single-process only; used for tests and for
//! embedding the orchestrator in a process that doesn't need durability.

use crate::kv::{KvEntry, KvError, KvStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

struct Entry {
    value: serde_json::Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-memory KV backend backed by an insertion-ordered map, giving `next()`
/// a fair round-robin rotation over live keys.
#[derive(Default)]
pub struct MemoryKv {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: std::collections::HashMap<String, Entry>,
    order: VecDeque<String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn sweep_expired_locked(inner: &mut Inner, now: Instant) {
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for k in expired {
            inner.entries.remove(&k);
            inner.order.retain(|existing| existing != &k);
        }
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn write(&self, key: &str, value: serde_json::Value, ttl: Option<Duration>) -> Result<(), KvError> {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        Self::sweep_expired_locked(&mut inner, now);
        let is_new = !inner.entries.contains_key(key);
        inner.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: ttl.map(|d| now + d),
            },
        );
        if is_new {
            inner.order.push_back(key.to_string());
        }
        Ok(())
    }

    async fn read(&self, key: &str, pop: bool) -> Result<Option<serde_json::Value>, KvError> {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        Self::sweep_expired_locked(&mut inner, now);
        if pop {
            let value = inner.entries.remove(key).map(|e| e.value);
            if value.is_some() {
                inner.order.retain(|k| k != key);
            }
            Ok(value)
        } else {
            Ok(inner.entries.get(key).map(|e| e.value.clone()))
        }
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut inner = self.inner.lock();
        inner.entries.remove(key);
        inner.order.retain(|k| k != key);
        Ok(())
    }

    async fn keys(&self) -> Result<HashSet<String>, KvError> {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        Self::sweep_expired_locked(&mut inner, now);
        Ok(inner.entries.keys().cloned().collect())
    }

    async fn next(&self, pop: bool) -> Result<Option<KvEntry>, KvError> {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        Self::sweep_expired_locked(&mut inner, now);
        let Some(key) = inner.order.pop_front() else {
            return Ok(None);
        };
        let value = match inner.entries.get(&key) {
            Some(e) => e.value.clone(),
            None => return Ok(None),
        };
        if pop {
            inner.entries.remove(&key);
        } else {
            // Rotate to the back so repeated non-popping calls are fair.
            inner.order.push_back(key.clone());
        }
        Ok(Some(KvEntry { key, value }))
    }
}
