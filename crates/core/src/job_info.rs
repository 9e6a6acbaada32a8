// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JobInfo: the Registry record. Mutated only by the worker holding the
//! lease, except for the abort flag which any replica may set.

use crate::job_config::JobConfig;
use crate::progress::{Progress, ProgressStatus};
use crate::report::Report;
use crate::token::Token;
use crate::worker::WorkerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    pub token: Token,
    pub host: String,
    pub config: JobConfig,
    pub progress: Progress,
    pub report: Report,
    pub status: ProgressStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub owner: Option<WorkerId>,
    #[serde(default)]
    pub lock_expires_at: Option<DateTime<Utc>>,
}

impl JobInfo {
    /// Construct the Registry record written at the moment a worker starts
    /// running a leased job.
    pub fn start(host: impl Into<String>, config: JobConfig, owner: WorkerId, now: DateTime<Utc>) -> Self {
        let host = host.into();
        let report = Report::new(host.clone(), config.token.as_str(), config.request_body.clone());
        Self {
            token: config.token.clone(),
            host,
            config,
            progress: Progress::running(0, "started"),
            report,
            status: ProgressStatus::Running,
            started_at: Some(now),
            updated_at: now,
            owner: Some(owner),
            lock_expires_at: None,
        }
    }

    /// Mirror `progress` onto the top-level `status`, bumping `updated_at`.
    pub fn apply_progress(&mut self, progress: Progress, now: DateTime<Utc>) {
        self.status = progress.status;
        self.progress = progress;
        self.report.progress = self.progress.clone();
        self.updated_at = now;
    }

    /// Forced `running -> queued` transition triggered by re-queue
    /// (invariant 3's one permitted back-edge). Clears `started_at`.
    pub fn requeue(&mut self, now: DateTime<Utc>) {
        self.status = ProgressStatus::Queued;
        self.progress = Progress::queued();
        self.report.progress = self.progress.clone();
        self.started_at = None;
        self.owner = None;
        self.lock_expires_at = None;
        self.updated_at = now;
    }
}

#[cfg(test)]
#[path = "job_info_tests.rs"]
mod tests;
