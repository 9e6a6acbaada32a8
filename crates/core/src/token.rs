// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job tokens: the opaque primary key threaded through Queue, Registry,
//! and every external interface.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque, globally-unique identifier for a submitted job.
///
/// Carries optional expiration metadata: a token created with an expiry
/// becomes eligible for passive Registry cleanup once `expires_at` has
/// passed (see [`Token::is_expired`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub value: Uuid,
    pub expires: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Generate a fresh token with no expiry.
    pub fn new() -> Self {
        Self {
            value: Uuid::new_v4(),
            expires: false,
            expires_at: None,
        }
    }

    /// Generate a fresh token that expires `ttl` from `now`.
    pub fn with_ttl(now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            value: Uuid::new_v4(),
            expires: true,
            expires_at: Some(now + ttl),
        }
    }

    /// Parse a token from its bare UUID string form (no expiry metadata).
    pub fn from_uuid_str(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self {
            value: Uuid::parse_str(s)?,
            expires: false,
            expires_at: None,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (self.expires, self.expires_at) {
            (true, Some(at)) => now >= at,
            _ => false,
        }
    }

    pub fn as_str(&self) -> String {
        self.value.to_string()
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl From<Uuid> for Token {
    fn from(value: Uuid) -> Self {
        Self {
            value,
            expires: false,
            expires_at: None,
        }
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
