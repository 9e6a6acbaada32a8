// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP-proxy KV backend: forwards every operation to a peer's Key-Value
//! Store API over `reqwest`, with jittered-backoff retry on transient
//! failures so a flaky network hop doesn't surface as a hard error.

use crate::kv::{KvEntry, KvError, KvStore};
use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::warn;

/// Client configuration for the HTTP-proxy backend.
#[derive(Debug, Clone)]
pub struct HttpKvConfig {
    pub base_url: String,
    pub max_retries: u32,
    pub retry_interval: Duration,
}

impl HttpKvConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            max_retries: 3,
            retry_interval: Duration::from_millis(100),
        }
    }
}

pub struct HttpKv {
    client: Client,
    config: HttpKvConfig,
}

#[derive(Deserialize)]
struct ReadResponse {
    value: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct KeysResponse {
    keys: Vec<String>,
}

#[derive(Deserialize)]
struct NextResponse {
    entry: Option<KvEntry>,
}

impl HttpKv {
    pub fn new(config: HttpKvConfig) -> Result<Self, KvError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| KvError::BackendUnavailable(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Runs `attempt` up to `max_retries + 1` times, sleeping a jittered
    /// backoff between attempts. Retries only on transport/5xx failures;
    /// a well-formed 4xx is returned immediately as `BadRequest`-adjacent.
    async fn with_retry<T, F, Fut>(&self, mut attempt: F) -> Result<T, KvError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, KvError>>,
    {
        let mut last_err = None;
        for attempt_no in 0..=self.config.max_retries {
            match attempt().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    last_err = Some(e);
                    if attempt_no < self.config.max_retries {
                        let jitter = rand::thread_rng().gen_range(0..=50);
                        let delay = self.config.retry_interval + Duration::from_millis(jitter);
                        warn!(attempt = attempt_no, ?delay, "retrying http kv request");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| KvError::BackendUnavailable("exhausted retries".into())))
    }

    fn map_transport(e: reqwest::Error) -> KvError {
        KvError::BackendUnavailable(e.to_string())
    }

    fn map_status(status: StatusCode) -> KvError {
        if status.is_server_error() {
            KvError::BackendUnavailable(format!("peer returned {status}"))
        } else {
            KvError::Io(format!("peer returned {status}"))
        }
    }
}

#[async_trait]
impl KvStore for HttpKv {
    async fn write(&self, key: &str, value: serde_json::Value, ttl: Option<Duration>) -> Result<(), KvError> {
        self.with_retry(|| async {
            let body = serde_json::json!({
                "value": value,
                "ttl_ms": ttl.map(|d| d.as_millis() as u64),
            });
            let resp = self
                .client
                .put(self.url(&format!("/kv/{key}")))
                .json(&body)
                .send()
                .await
                .map_err(Self::map_transport)?;
            if resp.status().is_success() {
                Ok(())
            } else {
                Err(Self::map_status(resp.status()))
            }
        })
        .await
    }

    async fn read(&self, key: &str, pop: bool) -> Result<Option<serde_json::Value>, KvError> {
        self.with_retry(|| async {
            let resp = self
                .client
                .get(self.url(&format!("/kv/{key}?pop={pop}")))
                .send()
                .await
                .map_err(Self::map_transport)?;
            if resp.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !resp.status().is_success() {
                return Err(Self::map_status(resp.status()));
            }
            let parsed: ReadResponse = resp.json().await.map_err(Self::map_transport)?;
            Ok(parsed.value)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.with_retry(|| async {
            let resp = self
                .client
                .delete(self.url(&format!("/kv/{key}")))
                .send()
                .await
                .map_err(Self::map_transport)?;
            if resp.status().is_success() || resp.status() == StatusCode::NOT_FOUND {
                Ok(())
            } else {
                Err(Self::map_status(resp.status()))
            }
        })
        .await
    }

    async fn keys(&self) -> Result<HashSet<String>, KvError> {
        self.with_retry(|| async {
            let resp = self
                .client
                .get(self.url("/kv"))
                .send()
                .await
                .map_err(Self::map_transport)?;
            if !resp.status().is_success() {
                return Err(Self::map_status(resp.status()));
            }
            let parsed: KeysResponse = resp.json().await.map_err(Self::map_transport)?;
            Ok(parsed.keys.into_iter().collect())
        })
        .await
    }

    async fn next(&self, pop: bool) -> Result<Option<KvEntry>, KvError> {
        self.with_retry(|| async {
            let resp = self
                .client
                .post(self.url(&format!("/kv/_next?pop={pop}")))
                .send()
                .await
                .map_err(Self::map_transport)?;
            if !resp.status().is_success() {
                return Err(Self::map_status(resp.status()));
            }
            let parsed: NextResponse = resp.json().await.map_err(Self::map_transport)?;
            Ok(parsed.entry)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_are_sane() {
        let cfg = HttpKvConfig::new("http://localhost:8080");
        assert_eq!(cfg.max_retries, 3);
        assert!(cfg.retry_interval > Duration::ZERO);
    }

    #[test]
    fn url_joins_without_double_slash() {
        let cfg = HttpKvConfig::new("http://localhost:8080/");
        let kv = HttpKv::new(cfg).unwrap();
        assert_eq!(kv.url("/kv/a"), "http://localhost:8080/kv/a");
    }
}
