// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S3: a pool of one slot, saturated by a long job. A second submission
//! sits queued; the status snapshot shows `queue_size=1` and the first
//! token as the one lease currently running.

use super::support::{controller, wait_until, worker_config};
use orchestra_core::{JobConfig, ProgressStatus, Token, WorkerId};
use orchestra_daemon::worker::ActiveJobs;
use orchestra_daemon::{Controller, Worker};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn second_submission_queues_behind_a_saturated_single_slot_pool() {
    let controller = controller();
    let first = Token::new();
    let second = Token::new();

    controller
        .submit(JobConfig::for_test(first.clone(), serde_json::json!({})), chrono::Utc::now())
        .await
        .unwrap();

    let script = vec!["/bin/sh".to_string(), "-c".to_string(), "sleep 10".to_string()];
    let shutdown = CancellationToken::new();
    let worker = Worker::new(controller.clone(), WorkerId::new("w0"), worker_config(script, Duration::from_secs(30)), ActiveJobs::new());
    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { worker.run(shutdown).await }
    });

    let leased = wait_until(Duration::from_secs(1), {
        let controller = controller.clone();
        let first = first.clone();
        move || {
            let controller = controller.clone();
            let first = first.clone();
            async move { matches!(controller.get_info(&first).await, Ok(Some(info)) if info.status == ProgressStatus::Running) }
        }
    })
    .await;
    assert!(leased, "the single worker slot never picked up the first job");

    controller
        .submit(JobConfig::for_test(second.clone(), serde_json::json!({})), chrono::Utc::now())
        .await
        .unwrap();

    let status = controller.status().await.unwrap();
    assert_eq!(status.queue_size, 1);
    assert_eq!(status.running_tokens, vec![first.clone()]);

    let second_info = controller.get_info(&second).await.unwrap().unwrap();
    assert_eq!(second_info.status, ProgressStatus::Queued);

    shutdown.cancel();
    let _ = handle.await;
}
