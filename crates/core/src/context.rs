// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JobContext: the per-job runtime handle held by a Worker while a lease is
//! active.
//!
//! The distilled design calls for a re-entrant mutex so that `push`,
//! `children.add`, and the job callable's own writes never interleave. In
//! this translation the job callable always runs in its own spawned child
//! process (see the worker module) and communicates back over a pipe of
//! structured lines — it never calls back into `JobContext` methods on the
//! same call stack as another `JobContext` method, so a plain `Mutex` gives
//! the same non-interleaving guarantee without the reentrancy the original
//! design needed to guard against.

use crate::progress::Progress;
use crate::report::{LogCategory, LogMessage, Report, ReportIdentifier};
use crate::token::Token;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A handle to a child job, addressed by host + token (never by object
/// reference, so parent/child cycles are impossible by construction).
#[derive(Debug, Clone)]
pub struct ChildJob {
    pub token: Token,
    pub host: String,
    pub timeout: Duration,
    /// Snapshot of the child's most recently observed report, captured
    /// before an abort cascade in case the cascade's own DELETE fails.
    pub latest_report: Option<Report>,
}

impl ChildJob {
    pub fn new(token: Token, host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            token,
            host: host.into(),
            timeout,
            latest_report: None,
        }
    }
}

/// Sink a [`JobContext`] flushes its Report to. Implemented by the Registry
/// client in the storage/daemon crates; kept as a trait here so `core` stays
/// free of any I/O dependency.
pub trait ReportFlusher: Send + Sync {
    fn flush(&self, report: &Report);
}

/// Runtime handle created per leased job inside a Worker.
pub struct JobContext {
    report: Mutex<Report>,
    children: Mutex<Vec<ChildJob>>,
    abort_requested: AtomicBool,
    flusher: Arc<dyn ReportFlusher>,
    last_push: Mutex<Instant>,
    push_interval: Duration,
}

impl JobContext {
    pub fn new(report: Report, flusher: Arc<dyn ReportFlusher>, push_interval: Duration) -> Self {
        Self {
            report: Mutex::new(report),
            children: Mutex::new(Vec::new()),
            abort_requested: AtomicBool::new(false),
            flusher,
            last_push: Mutex::new(Instant::now()),
            push_interval,
        }
    }

    pub fn log(&self, category: LogCategory, now: DateTime<Utc>, origin: &str, body: &str) {
        self.report.lock().log(category, LogMessage::new(now, origin, body));
    }

    pub fn set_progress(&self, progress: Progress) {
        self.report.lock().progress = progress;
    }

    pub fn set_data(&self, data: serde_json::Value) {
        self.report.lock().data = Some(data);
    }

    pub fn set_child_report(&self, id: ReportIdentifier, report: Report) {
        self.report.lock().set_child(id, report);
    }

    /// Immutable copy of the current Report, suitable for flushing or for
    /// responding to `get_report`.
    pub fn snapshot(&self) -> Report {
        self.report.lock().clone()
    }

    /// Flush the Report to the configured sink. Debounced by
    /// `registry_push_interval` unless `force` is set (e.g. on terminal
    /// transitions). Returns whether a flush actually happened.
    pub fn push(&self, now: Instant, force: bool) -> bool {
        let mut last = self.last_push.lock();
        if !force && now.duration_since(*last) < self.push_interval {
            return false;
        }
        *last = now;
        drop(last);
        let snapshot = self.snapshot();
        self.flusher.flush(&snapshot);
        true
    }

    pub fn request_abort(&self) {
        self.abort_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_abort_requested(&self) -> bool {
        self.abort_requested.load(Ordering::SeqCst)
    }

    pub fn add_child(&self, child: ChildJob) {
        self.children.lock().push(child);
    }

    pub fn children(&self) -> Vec<ChildJob> {
        self.children.lock().clone()
    }

    /// Snapshot a child's latest report before an abort cascade touches it.
    pub fn snapshot_child(&self, token: &Token, report: Report) {
        let mut children = self.children.lock();
        if let Some(child) = children.iter_mut().find(|c| &c.token == token) {
            child.latest_report = Some(report);
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
