// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S6: abort a parent with one child whose cascade `DELETE` fails (here,
//! a connection refused against an unreachable host stands in for a mock
//! service returning 500 — the coordinator treats any transport/HTTP
//! failure the same way: log and move on). Expect the parent to still
//! end up `aborted`, and the child's last-known report snapshot — already
//! embedded in the parent's `Report.children` from its last push — to
//! survive the failed cascade untouched.

use super::support::controller;
use orchestra_core::{JobConfig, LogCategory, ProgressStatus, Report, ReportIdentifier, Token, WorkerId};
use orchestra_daemon::worker::ActiveJobs;
use orchestra_daemon::{AbortCoordinator, AbortCoordinatorConfig, AbortOutcome, Controller};
use std::time::Duration;

#[tokio::test]
async fn a_failed_child_cascade_does_not_block_the_parent_abort() {
    let controller = controller();
    let parent = Token::new();
    controller
        .submit(JobConfig::for_test(parent.clone(), serde_json::json!({})), chrono::Utc::now())
        .await
        .unwrap();

    let leased = controller.lease(WorkerId::new("w0"), chrono::Duration::seconds(30), chrono::Utc::now()).await.unwrap().unwrap();

    let child_token = Token::new();
    let mut info = controller.get_info(&parent).await.unwrap().unwrap();
    let child_report = Report::new("127.0.0.1:1", child_token.as_str(), serde_json::json!({}));
    info.report.set_child(ReportIdentifier::new("child", "127.0.0.1:1").unwrap(), child_report.clone());
    controller.push(info, leased.lease_id).await.unwrap();

    let abort = AbortCoordinator::new(
        controller.clone(),
        ActiveJobs::new(),
        AbortCoordinatorConfig {
            notification_base_url: None,
            http_timeout: Duration::from_millis(200),
            abort_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(20),
        },
    )
    .unwrap();

    let outcome = abort.abort(&parent, true, "user", "cascade test").await.unwrap();
    assert_eq!(outcome, AbortOutcome::Aborted);

    let final_info = controller.get_info(&parent).await.unwrap().unwrap();
    assert_eq!(final_info.status, ProgressStatus::Aborted);
    assert_eq!(final_info.report.children.len(), 1);
    let preserved = final_info
        .report
        .child(&ReportIdentifier::new("child", "127.0.0.1:1").unwrap())
        .unwrap();
    assert_eq!(preserved.token, child_report.token);
    assert_eq!(final_info.report.log_count(LogCategory::Event), 1);
}
