// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress: the cheap-to-read slice of job state exposed by `GET /progress`.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a job. See invariant 3 in the design doc: the lattice
/// is `queued -> running -> {completed|aborted}`, with the only back-edge
/// being an explicit re-queue (`running -> queued`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Queued,
    Running,
    Aborted,
    Completed,
}

crate::simple_display! {
    ProgressStatus {
        Queued => "queued",
        Running => "running",
        Aborted => "aborted",
        Completed => "completed",
    }
}

impl ProgressStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressStatus::Aborted | ProgressStatus::Completed)
    }
}

/// Progress of a single job, as surfaced by both `JobInfo` and the
/// lightweight `GET /progress` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub status: ProgressStatus,
    #[serde(default)]
    pub verbose: String,
    /// 0..=100. Invariant 4: non-decreasing while `status == Running`.
    pub numeric: u8,
}

impl Progress {
    pub fn queued() -> Self {
        Self {
            status: ProgressStatus::Queued,
            verbose: String::new(),
            numeric: 0,
        }
    }

    pub fn running(numeric: u8, verbose: impl Into<String>) -> Self {
        Self {
            status: ProgressStatus::Running,
            verbose: verbose.into(),
            numeric: numeric.min(100),
        }
    }

    pub fn completed() -> Self {
        Self {
            status: ProgressStatus::Completed,
            verbose: "completed".to_string(),
            numeric: 100,
        }
    }

    pub fn aborted(verbose: impl Into<String>) -> Self {
        Self {
            status: ProgressStatus::Aborted,
            verbose: verbose.into(),
            numeric: 0,
        }
    }

    /// Apply a numeric/verbose update, clamping to the monotonicity
    /// invariant while running: the numeric value never decreases.
    pub fn advance(&mut self, numeric: u8, verbose: impl Into<String>) {
        if self.status == ProgressStatus::Running {
            self.numeric = self.numeric.max(numeric.min(100));
        } else {
            self.numeric = numeric.min(100);
        }
        self.verbose = verbose.into();
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
