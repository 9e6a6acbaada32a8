// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-per-key disk KV backend. Durable across process restarts; no
//! background sweeper, so TTL expiry is purely passive (checked on read).

use crate::kv::{KvEntry, KvError, KvStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

#[derive(Serialize, Deserialize)]
struct Envelope {
    value: serde_json::Value,
    expires_at_unix_ms: Option<i64>,
}

/// Disk-backed KV store: one JSON file per key under `root`, plus an
/// in-memory cursor for `next()`'s rotation (rebuilt from the directory
/// listing on each call, so it survives restarts without extra state).
pub struct DiskKv {
    root: PathBuf,
    cursor: Mutex<usize>,
}

impl DiskKv {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, KvError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| KvError::Io(e.to_string()))?;
        Ok(Self {
            root,
            cursor: Mutex::new(0),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(encode_filename(key))
    }

    async fn read_envelope(path: &Path) -> Result<Option<Envelope>, KvError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KvError::Io(e.to_string())),
        }
    }

    async fn write_envelope(path: &Path, envelope: &Envelope) -> Result<(), KvError> {
        let bytes = serde_json::to_vec(envelope)?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(|e| KvError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, path).await.map_err(|e| KvError::Io(e.to_string()))?;
        Ok(())
    }

    async fn remove_if_expired(path: &Path, envelope: &Envelope) -> bool {
        let Some(deadline) = envelope.expires_at_unix_ms else {
            return false;
        };
        let now = now_unix_ms();
        if now < deadline {
            return false;
        }
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %e, path = %path.display(), "failed to evict expired disk entry");
            }
        }
        true
    }

    async fn list_live_keys(&self) -> Result<Vec<String>, KvError> {
        let mut out = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| KvError::Io(e.to_string()))?;
        while let Some(entry) = dir.next_entry().await.map_err(|e| KvError::Io(e.to_string()))? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(envelope) = Self::read_envelope(&path).await? else {
                continue;
            };
            if Self::remove_if_expired(&path, &envelope).await {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                out.push(decode_filename(stem));
            }
        }
        out.sort();
        Ok(out)
    }
}

fn now_unix_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn encode_filename(key: &str) -> String {
    format!("{}.json", hex::encode(key.as_bytes()))
}

fn decode_filename(stem: &str) -> String {
    hex::decode(stem)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| stem.to_string())
}

/// Minimal hex codec, avoiding a dependency purely for filename-safe encoding.
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
            .collect()
    }
}

#[async_trait]
impl KvStore for DiskKv {
    async fn write(&self, key: &str, value: serde_json::Value, ttl: Option<Duration>) -> Result<(), KvError> {
        let envelope = Envelope {
            value,
            expires_at_unix_ms: ttl.map(|d| now_unix_ms() + d.as_millis() as i64),
        };
        Self::write_envelope(&self.path_for(key), &envelope).await
    }

    async fn read(&self, key: &str, pop: bool) -> Result<Option<serde_json::Value>, KvError> {
        let path = self.path_for(key);
        let Some(envelope) = Self::read_envelope(&path).await? else {
            return Ok(None);
        };
        if Self::remove_if_expired(&path, &envelope).await {
            return Ok(None);
        }
        if pop {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| KvError::Io(e.to_string()))?;
        }
        Ok(Some(envelope.value))
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(KvError::Io(e.to_string())),
        }
    }

    async fn keys(&self) -> Result<HashSet<String>, KvError> {
        Ok(self.list_live_keys().await?.into_iter().collect())
    }

    async fn next(&self, pop: bool) -> Result<Option<KvEntry>, KvError> {
        let keys = self.list_live_keys().await?;
        if keys.is_empty() {
            return Ok(None);
        }
        let idx = {
            let mut cursor = self.cursor.lock();
            let idx = *cursor % keys.len();
            *cursor = cursor.wrapping_add(1);
            idx
        };
        let key = keys[idx].clone();
        let value = self.read(&key, pop).await?;
        Ok(value.map(|value| KvEntry { key, value }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::contract_tests;

    #[tokio::test]
    async fn satisfies_kv_store_contract() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskKv::open(dir.path()).await.unwrap();
        contract_tests::run(&store).await;
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = DiskKv::open(dir.path()).await.unwrap();
            store.write("durable", serde_json::json!("value"), None).await.unwrap();
        }
        let reopened = DiskKv::open(dir.path()).await.unwrap();
        assert_eq!(
            reopened.read("durable", false).await.unwrap(),
            Some(serde_json::json!("value"))
        );
    }

    #[tokio::test]
    async fn keys_with_unusual_characters_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskKv::open(dir.path()).await.unwrap();
        let key = "job:queue/alpha beta#1";
        store.write(key, serde_json::json!(1), None).await.unwrap();
        assert!(store.keys().await.unwrap().contains(key));
    }
}
