// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lease: a time-bounded exclusive claim over a token, held by one worker.

use crate::worker::WorkerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier minted for each lease acquisition, used as the CAS
/// guard on Registry writes (mismatched `lease_id` on write => `LEASE_LOST`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaseId(pub Uuid);

impl LeaseId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LeaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LeaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A worker's exclusive claim over (Queue,token) and (Registry,token).
///
/// Invariant 2: at any instant at most one worker holds a valid lease for a
/// token. Invariant 5: refreshing must keep `expires_at > now + epsilon`; if
/// refresh fails the worker must stop processing before further writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub id: LeaseId,
    pub owner: WorkerId,
    pub expires_at: DateTime<Utc>,
}

impl Lease {
    pub fn new(owner: WorkerId, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            id: LeaseId::new(),
            owner,
            expires_at: now + ttl,
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn refresh(&mut self, now: DateTime<Utc>, ttl: chrono::Duration) {
        self.expires_at = now + ttl;
    }
}

/// A pending job as it sits in the Queue: the immutable config plus the
/// enqueue-time bookkeeping the Controller uses for fair dispatch and
/// bounded re-queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub token: crate::token::Token,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default)]
    pub lease: Option<Lease>,
    #[serde(default)]
    pub requeue_count: u32,
}

impl QueueEntry {
    pub fn new(token: crate::token::Token, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            token,
            enqueued_at,
            lease: None,
            requeue_count: 0,
        }
    }

    /// Eligible for (re-)lease: never leased, or the existing lease expired.
    pub fn is_leasable(&self, now: DateTime<Utc>) -> bool {
        match &self.lease {
            None => true,
            Some(lease) => !lease.is_valid(now),
        }
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
