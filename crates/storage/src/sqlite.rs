// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQL-backed KV backend over a single `kv_entries` table, for the generic
//! Queue/Registry layer. This is a best-effort `KvStore` implementation; the
//! SQLite Controller dialect's strict exclusivity does not go through this
//! module, it issues its own guarded `UPDATE` statements directly.

use crate::kv::{KvEntry, KvError, KvStore};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::collections::HashSet;
use std::time::Duration;

pub struct SqlKv {
    pool: SqlitePool,
}

impl SqlKv {
    pub async fn connect(url: &str) -> Result<Self, KvError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| KvError::BackendUnavailable(e.to_string()))?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), KvError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at_unix_ms INTEGER,
                seq INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(Self::map_err)?;
        Ok(())
    }

    fn map_err(e: sqlx::Error) -> KvError {
        KvError::BackendUnavailable(e.to_string())
    }

    async fn sweep_expired(&self) -> Result<(), KvError> {
        sqlx::query("DELETE FROM kv_entries WHERE expires_at_unix_ms IS NOT NULL AND expires_at_unix_ms <= ?")
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for SqlKv {
    async fn write(&self, key: &str, value: serde_json::Value, ttl: Option<Duration>) -> Result<(), KvError> {
        let expires_at = ttl.map(|d| Utc::now().timestamp_millis() + d.as_millis() as i64);
        let value_text = value.to_string();
        sqlx::query(
            "INSERT INTO kv_entries (key, value, expires_at_unix_ms, seq)
             VALUES (?, ?, ?, (SELECT COALESCE(MAX(seq), 0) + 1 FROM kv_entries))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at_unix_ms = excluded.expires_at_unix_ms",
        )
        .bind(key)
        .bind(value_text)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(Self::map_err)?;
        Ok(())
    }

    async fn read(&self, key: &str, pop: bool) -> Result<Option<serde_json::Value>, KvError> {
        self.sweep_expired().await?;
        let row = sqlx::query("SELECT value FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_err)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let text: String = row.get("value");
        if pop {
            sqlx::query("DELETE FROM kv_entries WHERE key = ?")
                .bind(key)
                .execute(&self.pool)
                .await
                .map_err(Self::map_err)?;
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn keys(&self) -> Result<HashSet<String>, KvError> {
        self.sweep_expired().await?;
        let rows = sqlx::query("SELECT key FROM kv_entries")
            .fetch_all(&self.pool)
            .await
            .map_err(Self::map_err)?;
        Ok(rows.into_iter().map(|r| r.get("key")).collect())
    }

    async fn next(&self, pop: bool) -> Result<Option<KvEntry>, KvError> {
        self.sweep_expired().await?;
        let row = sqlx::query("SELECT key, value FROM kv_entries ORDER BY seq ASC LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_err)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let key: String = row.get("key");
        let text: String = row.get("value");
        let value = serde_json::from_str(&text)?;
        if pop {
            sqlx::query("DELETE FROM kv_entries WHERE key = ?")
                .bind(&key)
                .execute(&self.pool)
                .await
                .map_err(Self::map_err)?;
        } else {
            // Push to the back of the rotation so repeated polling is fair.
            sqlx::query("UPDATE kv_entries SET seq = (SELECT COALESCE(MAX(seq), 0) + 1 FROM kv_entries) WHERE key = ?")
                .bind(&key)
                .execute(&self.pool)
                .await
                .map_err(Self::map_err)?;
        }
        Ok(Some(KvEntry { key, value }))
    }
}
