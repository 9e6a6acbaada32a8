// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S1: submit a job that finishes immediately and successfully. Poll until
//! terminal; expect `numeric=100`, `data.success=true`, and two `EVENT`
//! log lines (one on accept, one on terminate) filed by the job callable
//! itself.

use super::support::{controller, wait_until, worker_config};
use orchestra_core::{JobConfig, LogCategory, ProgressStatus, Token, WorkerId};
use orchestra_daemon::worker::ActiveJobs;
use orchestra_daemon::{Controller, Worker};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn submit_and_complete_reports_full_progress_and_accept_terminate_events() {
    let controller = controller();
    let token = Token::new();
    controller
        .submit(
            JobConfig::for_test(token.clone(), serde_json::json!({"demo": {"duration": 0, "success": true}})),
            chrono::Utc::now(),
        )
        .await
        .unwrap();

    let script = vec![
        "/bin/sh".to_string(),
        "-c".to_string(),
        concat!(
            r#"echo '{"event":"Log","category":"EVENT","origin":"job","body":"accept"}'; "#,
            r#"echo '{"event":"Data","value":{"success":true}}'; "#,
            r#"echo '{"event":"Log","category":"EVENT","origin":"job","body":"terminate"}'; "#,
            r#"echo '{"event":"Done","success":true}'"#,
        )
        .to_string(),
    ];

    let shutdown = CancellationToken::new();
    let worker = Worker::new(controller.clone(), WorkerId::new("w0"), worker_config(script, Duration::from_secs(5)), ActiveJobs::new());
    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { worker.run(shutdown).await }
    });

    let reached = wait_until(Duration::from_secs(2), || {
        let controller = controller.clone();
        let token = token.clone();
        async move { matches!(controller.get_info(&token).await, Ok(Some(info)) if info.status.is_terminal()) }
    })
    .await;
    assert!(reached, "job did not reach a terminal state in time");

    shutdown.cancel();
    let _ = handle.await;

    let info = controller.get_info(&token).await.unwrap().unwrap();
    assert_eq!(info.status, ProgressStatus::Completed);
    assert_eq!(info.progress.numeric, 100);
    assert_eq!(info.report.data, Some(serde_json::json!({"success": true})));
    assert_eq!(info.report.log_count(LogCategory::Event), 2);
}
