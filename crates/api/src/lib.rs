// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ServiceAdapter (C8): the public facade a higher-level service (an
//! HTTP layer, a CLI, anything else embedding the orchestration core)
//! submits work and reads state through. It never touches
//! `orchestra_storage::{Queue, Registry}` directly — every method goes
//! through a `Controller` dialect and, for abort, the Abort Coordinator.

mod hooks;

pub use hooks::{ProgressHook, RunHandle};

use chrono::Utc;
use orchestra_core::{JobConfig, JobInfo, OrchestraError, Progress, Report, Token};
use orchestra_daemon::{AbortCoordinator, AbortOutcome, Controller};
use std::sync::Arc;
use std::time::Duration;

/// Public facade between a consuming service and the orchestration core.
/// Cheap to clone: everything inside is an `Arc`.
#[derive(Clone)]
pub struct ServiceAdapter {
    controller: Arc<dyn Controller>,
    abort: Arc<AbortCoordinator>,
}

impl ServiceAdapter {
    pub fn new(controller: Arc<dyn Controller>, abort: Arc<AbortCoordinator>) -> Self {
        Self { controller, abort }
    }

    /// Validate, allocate a token, and enqueue `original_body`. The caller
    /// is responsible for producing `request_body` (the validated/
    /// normalized form); this facade does not itself hold a schema.
    pub async fn submit(&self, original_body: serde_json::Value, request_body: serde_json::Value) -> Result<Token, OrchestraError> {
        let token = Token::new();
        let config = JobConfig::new(token.clone(), original_body, request_body);
        self.controller.submit(config, Utc::now()).await?;
        Ok(token)
    }

    /// Cheap-path read: just the `Progress` slice.
    pub async fn poll(&self, token: &Token) -> Result<Progress, OrchestraError> {
        let info = self.get_info(token).await?;
        Ok(info.progress)
    }

    /// Same cheap-path read as `poll`, named to match the method the
    /// optional `run(hooks)` loop below invokes on a cadence.
    pub async fn progress(&self, token: &Token) -> Result<Progress, OrchestraError> {
        self.poll(token).await
    }

    pub async fn get_info(&self, token: &Token) -> Result<JobInfo, OrchestraError> {
        self.controller
            .get_info(token)
            .await?
            .ok_or_else(|| OrchestraError::UnknownToken(token.as_str()))
    }

    /// Most recently flushed `Report`. During an in-flight job this may lag
    /// the live `JobContext` by up to `registry_push_interval`.
    pub async fn get_report(&self, token: &Token) -> Result<Report, OrchestraError> {
        Ok(self.get_info(token).await?.report)
    }

    /// Abort a job. `re_queue` resubmits the job's original config onto the
    /// Queue once the abort has dispatched, instead of leaving it terminal —
    /// the Abort Coordinator itself always marks `aborted` first (invariant
    /// 6 requires abort to be unconditional and idempotent), so a
    /// requeue-on-abort is layered on top here rather than inside the
    /// coordinator.
    pub async fn abort(&self, token: &Token, block: bool, re_queue: bool, origin: &str, reason: &str) -> Result<AbortOutcome, OrchestraError> {
        let config = if re_queue { self.controller.get_info(token).await?.map(|info| info.config) } else { None };

        let outcome = self.abort.abort(token, block, origin, reason).await?;

        if let Some(config) = config {
            self.controller.submit(config, Utc::now()).await?;
        }
        Ok(outcome)
    }

    /// Spawn a polling loop that invokes `hook` with each token's current
    /// `Progress` every `interval`, until the returned `RunHandle` is
    /// dropped or explicitly stopped. For services that also surface a
    /// live UI and want push-free polling instead of reading the Registry
    /// themselves.
    pub fn run(&self, tokens: Vec<Token>, interval: Duration, hook: impl ProgressHook) -> RunHandle {
        hooks::spawn(self.clone(), tokens, interval, hook)
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
