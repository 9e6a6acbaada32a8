// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The remote Controller dialect (§4.5): a thin `reqwest` client that
//! translates every `Controller` operation into a `POST /orchestration`
//! call carrying an `orchestra_wire::Request`, and decodes the matching
//! `Response`. Used when replicas share one Controller over HTTP instead of
//! each holding a local SQLite file.

use crate::controller::{Controller, ControllerStatus, Leased};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orchestra_core::{JobConfig, JobInfo, LeaseId, OrchestraError, Report, Token, WorkerId};
use orchestra_wire::{Request, Response};
use rand::Rng;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Options parsed from `ORCHESTRA_CONTROLLER_ARGS` when
/// `ORCHESTRA_CONTROLLER=http`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HttpControllerArgs {
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_interval_ms() -> u64 {
    100
}

pub struct HttpController {
    client: Client,
    args: HttpControllerArgs,
}

impl HttpController {
    pub fn new(args: HttpControllerArgs) -> Result<Self, OrchestraError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(args.timeout_ms))
            .build()
            .map_err(|e| OrchestraError::BackendUnavailable(e.to_string()))?;
        Ok(Self { client, args })
    }

    fn url(&self) -> String {
        format!("{}/orchestration", self.args.base_url.trim_end_matches('/'))
    }

    async fn call(&self, request: &Request) -> Result<Response, OrchestraError> {
        let retry_interval = Duration::from_millis(self.args.retry_interval_ms);
        let mut last_err = None;
        for attempt in 0..=self.args.max_retries {
            match self.try_call(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    last_err = Some(e);
                    if attempt < self.args.max_retries {
                        let jitter = rand::thread_rng().gen_range(0..=50);
                        warn!(attempt, "retrying orchestration-controls call");
                        tokio::time::sleep(retry_interval + Duration::from_millis(jitter)).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| OrchestraError::BackendUnavailable("exhausted retries".into())))
    }

    async fn try_call(&self, request: &Request) -> Result<Response, OrchestraError> {
        let resp = self
            .client
            .post(self.url())
            .json(request)
            .send()
            .await
            .map_err(|e| OrchestraError::BackendUnavailable(e.to_string()))?;
        if resp.status().is_server_error() {
            return Err(OrchestraError::BackendUnavailable(format!("peer returned {}", resp.status())));
        }
        resp.json::<Response>().await.map_err(|e| OrchestraError::BackendUnavailable(e.to_string()))
    }

    fn error_from_response(message: String, status_hint: u16) -> OrchestraError {
        match status_hint {
            400 => OrchestraError::BadRequest(message),
            404 => OrchestraError::UnknownToken(message),
            503 => OrchestraError::Busy,
            502 => OrchestraError::BackendUnavailable(message),
            _ => OrchestraError::Fatal(message),
        }
    }
}

#[async_trait]
impl Controller for HttpController {
    async fn submit(&self, config: JobConfig, _now: DateTime<Utc>) -> Result<(), OrchestraError> {
        match self.call(&Request::Submit { config }).await? {
            Response::Submitted { .. } | Response::Ok => Ok(()),
            Response::Error { message, status_hint } => Err(Self::error_from_response(message, status_hint)),
            other => Err(OrchestraError::Fatal(format!("unexpected response to Submit: {other:?}"))),
        }
    }

    async fn lease(&self, owner: WorkerId, ttl: chrono::Duration, _now: DateTime<Utc>) -> Result<Option<Leased>, OrchestraError> {
        let request = Request::Lease { owner, ttl_secs: ttl.num_seconds() };
        match self.call(&request).await? {
            Response::Leased { leased } => Ok(leased.map(|l| Leased { config: l.config, lease_id: l.lease_id })),
            Response::Error { message, status_hint } => Err(Self::error_from_response(message, status_hint)),
            other => Err(OrchestraError::Fatal(format!("unexpected response to Lease: {other:?}"))),
        }
    }

    async fn refresh(&self, token: &Token, lease_id: LeaseId, ttl: chrono::Duration, _now: DateTime<Utc>) -> Result<(), OrchestraError> {
        let request = Request::Refresh {
            token: token.clone(),
            lease_id,
            ttl_secs: ttl.num_seconds(),
        };
        match self.call(&request).await? {
            Response::Ok => Ok(()),
            Response::Error { message, status_hint } => Err(Self::error_from_response(message, status_hint)),
            other => Err(OrchestraError::Fatal(format!("unexpected response to Refresh: {other:?}"))),
        }
    }

    async fn push(&self, info: JobInfo, lease_id: LeaseId) -> Result<(), OrchestraError> {
        let request = Request::Push { info: Box::new(info), lease_id };
        match self.call(&request).await? {
            Response::Ok => Ok(()),
            Response::Error { message, status_hint } => Err(Self::error_from_response(message, status_hint)),
            other => Err(OrchestraError::Fatal(format!("unexpected response to Push: {other:?}"))),
        }
    }

    async fn complete(&self, token: &Token, lease_id: LeaseId, report: Report, _now: DateTime<Utc>) -> Result<(), OrchestraError> {
        let request = Request::Complete {
            token: token.clone(),
            lease_id,
            report: Box::new(report),
        };
        match self.call(&request).await? {
            Response::Ok => Ok(()),
            Response::Error { message, status_hint } => Err(Self::error_from_response(message, status_hint)),
            other => Err(OrchestraError::Fatal(format!("unexpected response to Complete: {other:?}"))),
        }
    }

    async fn fail(&self, token: &Token, lease_id: LeaseId, reason: &str, requeue: bool, _now: DateTime<Utc>) -> Result<(), OrchestraError> {
        let request = Request::Fail {
            token: token.clone(),
            lease_id,
            reason: reason.to_string(),
            requeue,
        };
        match self.call(&request).await? {
            Response::Ok => Ok(()),
            Response::Error { message, status_hint } => Err(Self::error_from_response(message, status_hint)),
            other => Err(OrchestraError::Fatal(format!("unexpected response to Fail: {other:?}"))),
        }
    }

    async fn abort_mark(&self, token: &Token, origin: &str, reason: &str, _now: DateTime<Utc>) -> Result<(), OrchestraError> {
        let request = Request::Abort {
            token: token.clone(),
            origin: origin.to_string(),
            reason: reason.to_string(),
        };
        match self.call(&request).await? {
            Response::Ok => Ok(()),
            Response::Error { message, status_hint } => Err(Self::error_from_response(message, status_hint)),
            other => Err(OrchestraError::Fatal(format!("unexpected response to Abort: {other:?}"))),
        }
    }

    async fn get_info(&self, token: &Token) -> Result<Option<JobInfo>, OrchestraError> {
        match self.call(&Request::GetInfo { token: token.clone() }).await? {
            Response::Info { info } => Ok(info.map(|b| *b)),
            Response::Error { message, status_hint } => Err(Self::error_from_response(message, status_hint)),
            other => Err(OrchestraError::Fatal(format!("unexpected response to GetInfo: {other:?}"))),
        }
    }

    async fn status(&self) -> Result<ControllerStatus, OrchestraError> {
        match self.call(&Request::ControllerStatus).await? {
            Response::ControllerStatus { status } => Ok(ControllerStatus {
                queue_size: status.queue_depth,
                registry_size: status.active_leases,
                running_tokens: Vec::new(),
            }),
            Response::Error { message, status_hint } => Err(Self::error_from_response(message, status_hint)),
            other => Err(OrchestraError::Fatal(format!("unexpected response to ControllerStatus: {other:?}"))),
        }
    }
}

#[cfg(test)]
#[path = "http_controller_tests.rs"]
mod tests;
