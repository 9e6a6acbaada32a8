// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::job_config::JobConfig;
use chrono::{TimeZone, Utc};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

fn config() -> JobConfig {
    JobConfig::for_test(Token::new(), serde_json::json!({"demo": {}}))
}

#[test]
fn start_marks_running_with_owner() {
    let info = JobInfo::start("host-a", config(), WorkerId::new("w1"), t0());
    assert_eq!(info.status, ProgressStatus::Running);
    assert_eq!(info.owner, Some(WorkerId::new("w1")));
    assert_eq!(info.started_at, Some(t0()));
}

#[test]
fn apply_progress_mirrors_into_report() {
    let mut info = JobInfo::start("host-a", config(), WorkerId::new("w1"), t0());
    info.apply_progress(Progress::running(50, "half"), t0() + chrono::Duration::seconds(1));
    assert_eq!(info.status, ProgressStatus::Running);
    assert_eq!(info.report.progress.numeric, 50);
    assert_eq!(info.updated_at, t0() + chrono::Duration::seconds(1));
}

#[test]
fn requeue_clears_started_at_and_owner() {
    let mut info = JobInfo::start("host-a", config(), WorkerId::new("w1"), t0());
    info.requeue(t0() + chrono::Duration::seconds(5));
    assert_eq!(info.status, ProgressStatus::Queued);
    assert_eq!(info.started_at, None);
    assert_eq!(info.owner, None);
    assert_eq!(info.progress.numeric, 0);
}
