// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S2: submit a long-running job, abort it mid-flight with `block=true`.
//! Expect the call to return within the configured abort timeout, the job
//! to end up `aborted`, and an `EVENT` log entry recording the abort's
//! origin/reason.

use super::support::{abort_coordinator, controller, wait_until, worker_config};
use orchestra_core::{JobConfig, LogCategory, ProgressStatus, Token, WorkerId};
use orchestra_daemon::worker::ActiveJobs;
use orchestra_daemon::{AbortOutcome, Controller, Worker};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn abort_during_a_long_job_returns_promptly_and_marks_aborted() {
    let controller = controller();
    let token = Token::new();
    controller
        .submit(JobConfig::for_test(token.clone(), serde_json::json!({"demo": {"duration": 5}})), chrono::Utc::now())
        .await
        .unwrap();

    let script = vec!["/bin/sh".to_string(), "-c".to_string(), "sleep 5".to_string()];
    let shutdown = CancellationToken::new();
    let active_jobs = ActiveJobs::new();
    let worker = Worker::new(controller.clone(), WorkerId::new("w0"), worker_config(script, Duration::from_secs(30)), active_jobs.clone());
    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { worker.run(shutdown).await }
    });

    let leased = wait_until(Duration::from_secs(1), {
        let controller = controller.clone();
        let token = token.clone();
        move || {
            let controller = controller.clone();
            let token = token.clone();
            async move { matches!(controller.get_info(&token).await, Ok(Some(info)) if info.status == ProgressStatus::Running) }
        }
    })
    .await;
    assert!(leased, "worker never picked up the job");

    let abort = abort_coordinator(controller.clone(), active_jobs);
    let started = tokio::time::Instant::now();
    let outcome = abort.abort(&token, true, "user", "user").await.unwrap();
    assert_eq!(outcome, AbortOutcome::Aborted);
    assert!(started.elapsed() < Duration::from_secs(2), "abort did not return promptly");

    let info = controller.get_info(&token).await.unwrap().unwrap();
    assert_eq!(info.status, ProgressStatus::Aborted);
    assert_eq!(info.report.log_count(LogCategory::Event), 1);
    let entry = &info.report.log[&LogCategory::Event][0];
    assert_eq!(entry.body, "user: user");

    shutdown.cancel();
    let _ = handle.await;
}
