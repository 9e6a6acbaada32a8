// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The local, SQLite-backed Controller dialect (§4.5, §6.6). Unlike
//! [`crate::kv_controller::KvController`], exclusivity here is enforced by
//! the database itself: every lease/refresh/complete writes through a
//! guarded `UPDATE … WHERE lease_id = ? AND lease_expires_at > ?`, so a
//! worker whose lease has already been stolen gets `rows_affected() == 0`
//! and a `LeaseLost` instead of silently clobbering the new owner. The
//! `jobs` table adds a `lease_id` column alongside `lease_owner` beyond the
//! literal schema, since a worker identity string alone can't distinguish
//! two successive acquisitions by the same owner.

use crate::controller::{Controller, ControllerStatus, Leased};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orchestra_core::{JobConfig, JobInfo, LeaseId, OrchestraError, Report, Token, WorkerId};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

fn map_err(e: sqlx::Error) -> OrchestraError {
    OrchestraError::BackendUnavailable(e.to_string())
}

/// Options parsed from `ORCHESTRA_CONTROLLER_ARGS` when
/// `ORCHESTRA_CONTROLLER=sqlite`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SqliteControllerArgs {
    pub db_path: String,
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: i64,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: Option<i64>,
    #[serde(default = "default_message_ttl_secs")]
    pub message_ttl_secs: i64,
    /// Bound on `requeue_count` before a persistently-crashing job is marked
    /// `aborted` instead of requeued again (§9 open question (a)).
    #[serde(default = "default_max_requeues")]
    pub max_requeues: u32,
}

fn default_lock_ttl_secs() -> i64 {
    60
}

fn default_token_ttl_secs() -> Option<i64> {
    None
}

fn default_message_ttl_secs() -> i64 {
    300
}

fn default_max_requeues() -> u32 {
    5
}

pub struct SqliteController {
    pool: SqlitePool,
    args: SqliteControllerArgs,
}

impl SqliteController {
    pub async fn connect(args: SqliteControllerArgs) -> Result<Self, OrchestraError> {
        // Every pooled connection to "sqlite::memory:" gets its own private
        // database unless the pool is held to exactly one connection, so
        // `:memory:` (test/dev usage) pins max_connections(1) instead of
        // reaching for a shared-cache URI.
        let (url, max_connections) = if args.db_path == ":memory:" {
            ("sqlite::memory:".to_string(), 1)
        } else {
            (format!("sqlite://{}?mode=rwc", args.db_path), 5)
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&url)
            .await
            .map_err(map_err)?;
        let controller = Self { pool, args };
        controller.migrate().await?;
        Ok(controller)
    }

    async fn migrate(&self) -> Result<(), OrchestraError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS jobs (
                token TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                payload TEXT NOT NULL,
                lease_owner TEXT,
                lease_id TEXT,
                lease_expires_at INTEGER,
                report_blob TEXT,
                requeue_count INTEGER NOT NULL DEFAULT 0,
                enqueued_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                topic TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    /// Passive cleanup of expired Registry entries (`token_ttl`) and stale
    /// abort messages (`message_ttl`), run opportunistically rather than on
    /// a dedicated background timer.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<(), OrchestraError> {
        if let Some(token_ttl) = self.args.token_ttl_secs {
            let cutoff = now.timestamp() - token_ttl;
            sqlx::query("DELETE FROM jobs WHERE updated_at <= ? AND state IN ('completed', 'aborted')")
                .bind(cutoff)
                .execute(&self.pool)
                .await
                .map_err(map_err)?;
        }
        let message_cutoff = now.timestamp();
        sqlx::query("DELETE FROM messages WHERE expires_at <= ?")
            .bind(message_cutoff)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    fn row_to_info(row: &sqlx::sqlite::SqliteRow) -> Result<JobInfo, OrchestraError> {
        let report_blob: String = row.try_get("report_blob").map_err(map_err)?;
        let payload: String = row.try_get("payload").map_err(map_err)?;
        let config: JobConfig = serde_json::from_str(&payload).map_err(|e| OrchestraError::BadRequest(e.to_string()))?;
        let mut info: JobInfo = serde_json::from_str(&report_blob).map_err(|e| OrchestraError::BadRequest(e.to_string()))?;
        info.config = config;
        Ok(info)
    }
}

#[async_trait]
impl Controller for SqliteController {
    async fn submit(&self, config: JobConfig, now: DateTime<Utc>) -> Result<(), OrchestraError> {
        let payload = serde_json::to_string(&config).map_err(|e| OrchestraError::BadRequest(e.to_string()))?;
        sqlx::query(
            "INSERT INTO jobs (token, state, payload, requeue_count, enqueued_at, updated_at)
             VALUES (?, 'queued', ?, 0, ?, ?)",
        )
        .bind(config.token.as_str())
        .bind(payload)
        .bind(now.timestamp())
        .bind(now.timestamp())
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn lease(&self, owner: WorkerId, ttl: chrono::Duration, now: DateTime<Utc>) -> Result<Option<Leased>, OrchestraError> {
        self.sweep(now).await?;
        // Leasable entries are never-leased 'queued' rows, or 'running' rows
        // whose lease has expired without being refreshed or released.
        let row = sqlx::query(
            "SELECT token, payload FROM jobs
             WHERE state IN ('queued', 'running') AND (lease_expires_at IS NULL OR lease_expires_at <= ?)
             ORDER BY enqueued_at ASC, token ASC LIMIT 1",
        )
        .bind(now.timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        let Some(row) = row else { return Ok(None) };
        let token_str: String = row.get("token");
        let payload: String = row.get("payload");
        let config: JobConfig = serde_json::from_str(&payload).map_err(|e| OrchestraError::BadRequest(e.to_string()))?;
        let lease_id = LeaseId::new();
        let expires_at = now + ttl;

        // Guard the claim: only succeeds if the row is still unleased,
        // exactly as it was when we selected it above.
        let result = sqlx::query(
            "UPDATE jobs SET state = 'running', lease_owner = ?, lease_id = ?, lease_expires_at = ?, updated_at = ?
             WHERE token = ? AND state IN ('queued', 'running') AND (lease_expires_at IS NULL OR lease_expires_at <= ?)",
        )
        .bind(owner.as_str())
        .bind(lease_id.to_string())
        .bind(expires_at.timestamp())
        .bind(now.timestamp())
        .bind(&token_str)
        .bind(now.timestamp())
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let info = JobInfo::start(owner.as_str(), config.clone(), owner, now);
        let report_blob = serde_json::to_string(&info).map_err(|e| OrchestraError::BadRequest(e.to_string()))?;
        sqlx::query("UPDATE jobs SET report_blob = ? WHERE token = ?")
            .bind(report_blob)
            .bind(&token_str)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;

        Ok(Some(Leased { config, lease_id }))
    }

    async fn refresh(&self, token: &Token, lease_id: LeaseId, ttl: chrono::Duration, now: DateTime<Utc>) -> Result<(), OrchestraError> {
        let result = sqlx::query(
            "UPDATE jobs SET lease_expires_at = ?, updated_at = ?
             WHERE token = ? AND state = 'running' AND lease_id = ? AND lease_expires_at > ?",
        )
        .bind((now + ttl).timestamp())
        .bind(now.timestamp())
        .bind(token.as_str())
        .bind(lease_id.to_string())
        .bind(now.timestamp())
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        if result.rows_affected() == 0 {
            return Err(OrchestraError::LeaseLost(token.to_string()));
        }
        Ok(())
    }

    async fn push(&self, info: JobInfo, lease_id: LeaseId) -> Result<(), OrchestraError> {
        let report_blob = serde_json::to_string(&info).map_err(|e| OrchestraError::BadRequest(e.to_string()))?;
        let result = sqlx::query(
            "UPDATE jobs SET report_blob = ?, updated_at = ? WHERE token = ? AND state = 'running' AND lease_id = ?",
        )
        .bind(report_blob)
        .bind(info.updated_at.timestamp())
        .bind(info.token.as_str())
        .bind(lease_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        if result.rows_affected() == 0 {
            return Err(OrchestraError::LeaseLost(info.token.to_string()));
        }
        Ok(())
    }

    async fn complete(&self, token: &Token, lease_id: LeaseId, report: Report, now: DateTime<Utc>) -> Result<(), OrchestraError> {
        let row = sqlx::query("SELECT payload, report_blob, lease_id FROM jobs WHERE token = ?")
            .bind(token.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?
            .ok_or_else(|| OrchestraError::UnknownToken(token.to_string()))?;
        let stored_lease_id: Option<String> = row.try_get("lease_id").ok();
        if stored_lease_id.as_deref() != Some(lease_id.to_string().as_str()) {
            return Err(OrchestraError::LeaseLost(token.to_string()));
        }
        let mut info = Self::row_to_info(&row)?;
        info.report = report;
        info.apply_progress(orchestra_core::Progress::completed(), now);
        let report_blob = serde_json::to_string(&info).map_err(|e| OrchestraError::BadRequest(e.to_string()))?;
        sqlx::query(
            "UPDATE jobs SET state = 'completed', report_blob = ?, lease_owner = NULL, lease_id = NULL, lease_expires_at = NULL, updated_at = ? WHERE token = ?",
        )
        .bind(report_blob)
        .bind(now.timestamp())
        .bind(token.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn fail(&self, token: &Token, lease_id: LeaseId, reason: &str, requeue: bool, now: DateTime<Utc>) -> Result<(), OrchestraError> {
        let requeue_count: i64 = sqlx::query("SELECT requeue_count FROM jobs WHERE token = ?")
            .bind(token.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?
            .map(|row| row.get("requeue_count"))
            .unwrap_or(0);

        if requeue && (requeue_count as u32) < self.args.max_requeues {
            let row = sqlx::query("SELECT payload, report_blob, lease_id FROM jobs WHERE token = ?")
                .bind(token.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_err)?
                .ok_or_else(|| OrchestraError::UnknownToken(token.to_string()))?;
            let stored_lease_id: Option<String> = row.try_get("lease_id").ok();
            if stored_lease_id.as_deref() != Some(lease_id.to_string().as_str()) {
                return Err(OrchestraError::LeaseLost(token.to_string()));
            }
            let mut info = Self::row_to_info(&row)?;
            info.report
                .log(orchestra_core::LogCategory::Warning, orchestra_core::LogMessage::new(now, "worker", reason));
            info.requeue(now);
            let report_blob = serde_json::to_string(&info).map_err(|e| OrchestraError::BadRequest(e.to_string()))?;

            let result = sqlx::query(
                "UPDATE jobs SET state = 'queued', report_blob = ?, lease_owner = NULL, lease_id = NULL, lease_expires_at = NULL,
                 requeue_count = requeue_count + 1, enqueued_at = ?, updated_at = ? WHERE token = ? AND lease_id = ?",
            )
            .bind(report_blob)
            .bind(now.timestamp())
            .bind(now.timestamp())
            .bind(token.as_str())
            .bind(lease_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
            if result.rows_affected() == 0 {
                return Err(OrchestraError::LeaseLost(token.to_string()));
            }
            Ok(())
        } else if requeue {
            self.abort_mark(token, "controller", &format!("requeue limit ({}) exceeded: {reason}", self.args.max_requeues), now)
                .await
        } else {
            self.abort_mark(token, "controller", reason, now).await
        }
    }

    async fn abort_mark(&self, token: &Token, origin: &str, reason: &str, now: DateTime<Utc>) -> Result<(), OrchestraError> {
        let row = sqlx::query("SELECT state, payload, report_blob FROM jobs WHERE token = ?")
            .bind(token.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?
            .ok_or_else(|| OrchestraError::UnknownToken(token.to_string()))?;
        let state: String = row.get("state");
        if state == "completed" || state == "aborted" {
            return Ok(());
        }
        let report_blob: Option<String> = row.try_get("report_blob").ok();
        let mut info = match report_blob {
            Some(blob) if !blob.is_empty() => Self::row_to_info(&row)?,
            _ => {
                let payload: String = row.get("payload");
                let config: JobConfig = serde_json::from_str(&payload).map_err(|e| OrchestraError::BadRequest(e.to_string()))?;
                JobInfo::start("unknown", config, WorkerId::new("none"), now)
            }
        };
        let verbose = format!("{origin}: {reason}");
        info.report
            .log(orchestra_core::LogCategory::Event, orchestra_core::LogMessage::new(now, "abort", verbose.clone()));
        info.apply_progress(orchestra_core::Progress::aborted(verbose), now);
        let report_blob = serde_json::to_string(&info).map_err(|e| OrchestraError::BadRequest(e.to_string()))?;
        sqlx::query("UPDATE jobs SET state = 'aborted', report_blob = ?, lease_owner = NULL, lease_id = NULL, lease_expires_at = NULL, updated_at = ? WHERE token = ?")
            .bind(report_blob)
            .bind(now.timestamp())
            .bind(token.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn get_info(&self, token: &Token) -> Result<Option<JobInfo>, OrchestraError> {
        let row = sqlx::query("SELECT payload, report_blob FROM jobs WHERE token = ?")
            .bind(token.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        let Some(row) = row else { return Ok(None) };
        let report_blob: Option<String> = row.try_get("report_blob").ok();
        match report_blob {
            Some(blob) if !blob.is_empty() => Ok(Some(Self::row_to_info(&row)?)),
            _ => Ok(None),
        }
    }

    async fn status(&self) -> Result<ControllerStatus, OrchestraError> {
        let queue_size: i64 = sqlx::query("SELECT COUNT(*) AS c FROM jobs WHERE state = 'queued'")
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?
            .get("c");
        let registry_size: i64 = sqlx::query("SELECT COUNT(*) AS c FROM jobs WHERE state != 'queued'")
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?
            .get("c");
        let running_rows = sqlx::query("SELECT token FROM jobs WHERE state = 'running'")
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;
        let running_tokens = running_rows
            .into_iter()
            .filter_map(|r| Token::from_uuid_str(r.get::<String, _>("token").as_str()).ok())
            .collect();
        Ok(ControllerStatus {
            queue_size: queue_size as usize,
            registry_size: registry_size as usize,
            running_tokens,
        })
    }
}

#[cfg(test)]
#[path = "sqlite_controller_tests.rs"]
mod tests;
