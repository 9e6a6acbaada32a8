// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Abort Coordinator (C7): three idempotent abort paths layered on top
//! of one another — local in-process, cross-replica broadcast via the
//! Notification service, and a cascade to child jobs over HTTP.

use crate::controller::Controller;
use crate::worker::ActiveJobs;
use async_recursion::async_recursion;
use orchestra_core::{JobContext, LogCategory, OrchestraError, Report, Token};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Outcome of a synchronous `abort(block=true)` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortOutcome {
    /// The Registry observed `status=aborted` before the timeout.
    Aborted,
    /// `ORCHESTRA_ABORT_TIMEOUT` elapsed first; the signal was dispatched
    /// but termination wasn't confirmed.
    TimedOut,
    /// `block=false`: the signal was dispatched, no confirmation awaited.
    Dispatched,
}

#[derive(Debug, Clone)]
pub struct AbortCoordinatorConfig {
    /// Base URL of the Notification service, if cross-replica broadcast is
    /// configured. `None` means this replica only ever aborts jobs it is
    /// itself running (single-replica deployments).
    pub notification_base_url: Option<String>,
    pub http_timeout: Duration,
    pub abort_timeout: Duration,
    pub poll_interval: Duration,
}

pub struct AbortCoordinator {
    controller: Arc<dyn Controller>,
    active_jobs: ActiveJobs,
    client: Client,
    config: AbortCoordinatorConfig,
}

impl AbortCoordinator {
    pub fn new(controller: Arc<dyn Controller>, active_jobs: ActiveJobs, config: AbortCoordinatorConfig) -> Result<Self, OrchestraError> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| OrchestraError::BackendUnavailable(e.to_string()))?;
        Ok(Self { controller, active_jobs, client, config })
    }

    /// Abort `token`. Always marks the Registry and attempts every
    /// applicable path; idempotent if the job is already terminal.
    pub async fn abort(&self, token: &Token, block: bool, origin: &str, reason: &str) -> Result<AbortOutcome, OrchestraError> {
        let now = chrono::Utc::now();
        self.controller.abort_mark(token, origin, reason, now).await?;

        let context = self.active_jobs.get(token);
        if let Some(context) = &context {
            context.request_abort();
        }

        if let Some(base_url) = self.config.notification_base_url.clone() {
            self.broadcast(&base_url, token, origin, reason).await;
        }

        if let Some(info) = self.controller.get_info(token).await? {
            self.cascade_children(&info.report, origin, reason, context.as_deref()).await;
        }

        if !block {
            return Ok(AbortOutcome::Dispatched);
        }
        Ok(self.wait_for_terminal(token).await)
    }

    async fn broadcast(&self, base_url: &str, token: &Token, origin: &str, reason: &str) {
        let url = format!("{}/notify?topic=abort", base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "json": { "token": token.as_str(), "origin": origin, "reason": reason },
        });
        if let Err(e) = self.client.post(&url).json(&body).send().await {
            warn!(error = %e, token = %token, "abort broadcast failed");
        }
    }

    /// Cascades the abort to every child in `report.children` (§4.7 path 3).
    /// `context` is the locally-held `JobContext` for the job owning
    /// `report`, when this replica happens to be running it — it lets the
    /// cascade snapshot each child's latest known report before the DELETE,
    /// and file a `WARNING` log entry if the DELETE fails, the same way the
    /// job callable's own cooperative logging does.
    #[async_recursion]
    async fn cascade_children(&self, report: &Report, origin: &str, reason: &str, context: Option<&JobContext>) {
        for child in report.children.values() {
            if let Some(context) = context {
                if let Ok(child_token) = Token::from_uuid_str(&child.token) {
                    context.snapshot_child(&child_token, child.clone());
                }
            }

            let url = format!("http://{}/{}", child.host, child.token);
            let result = self
                .client
                .delete(&url)
                .query(&[("broadcast", "false")])
                .json(&serde_json::json!({ "origin": origin, "reason": reason }))
                .send()
                .await;
            if let Err(e) = result {
                warn!(error = %e, child_host = %child.host, child_token = %child.token, "child abort cascade failed");
                if let Some(context) = context {
                    let body = format!("cascade DELETE to child {} at {} failed: {e}", child.token, child.host);
                    context.log(LogCategory::Warning, chrono::Utc::now(), "abort_cascade", &body);
                    context.push(std::time::Instant::now(), true);
                }
            }
            self.cascade_children(child, origin, reason, context).await;
        }
    }

    async fn wait_for_terminal(&self, token: &Token) -> AbortOutcome {
        let deadline = tokio::time::Instant::now() + self.config.abort_timeout;
        loop {
            match self.controller.get_info(token).await {
                Ok(Some(info)) if info.status.is_terminal() => return AbortOutcome::Aborted,
                Ok(_) => {}
                Err(e) => warn!(error = %e, token = %token, "polling for abort termination failed"),
            }
            if tokio::time::Instant::now() >= deadline {
                return AbortOutcome::TimedOut;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

#[cfg(test)]
#[path = "abort_tests.rs"]
mod tests;
