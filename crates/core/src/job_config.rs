// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JobConfig: the immutable submitted payload, keyed by [`Token`].

use crate::token::Token;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Free-form per-job properties (e.g. `path`) attached at submission time.
pub type Properties = HashMap<String, serde_json::Value>;

/// Immutable configuration for a submitted job. Written once to the Queue
/// at submission and never mutated thereafter (invariant: "JobConfig is
/// immutable once enqueued").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    pub token: Token,
    /// The exact JSON body the client submitted.
    pub original_body: serde_json::Value,
    /// `original_body` after schema validation/normalization.
    pub request_body: serde_json::Value,
    #[serde(default)]
    pub properties: Properties,
}

impl JobConfig {
    pub fn new(token: Token, original_body: serde_json::Value, request_body: serde_json::Value) -> Self {
        Self {
            token,
            original_body,
            request_body,
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn path(&self) -> Option<&str> {
        self.properties.get("path").and_then(|v| v.as_str())
    }
}

#[cfg(any(test, feature = "test-support"))]
impl JobConfig {
    /// Test helper: a minimal config with identical original/request bodies.
    pub fn for_test(token: Token, body: serde_json::Value) -> Self {
        Self::new(token, body.clone(), body)
    }
}

#[cfg(test)]
#[path = "job_config_tests.rs"]
mod tests;
