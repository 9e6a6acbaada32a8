// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S5: two replicas share a Controller over one eventually-consistent
//! backing store. Submit via replica A's Controller handle, run the job
//! on replica A's Worker, then abort from replica B's Abort Coordinator
//! (which has no local `ActiveJobs` entry for the job — it only reaches
//! the job through the shared Registry). Replica A observes `aborted`.

use super::support::{replica_pair, wait_until, worker_config};
use orchestra_core::{JobConfig, ProgressStatus, Token, WorkerId};
use orchestra_daemon::worker::ActiveJobs;
use orchestra_daemon::{AbortCoordinator, AbortCoordinatorConfig, AbortOutcome, Controller, Worker};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn abort_from_the_other_replica_is_observed_by_the_replica_running_the_job() {
    let (replica_a, replica_b) = replica_pair();
    let token = Token::new();
    replica_a
        .submit(JobConfig::for_test(token.clone(), serde_json::json!({"demo": {"duration": 5}})), chrono::Utc::now())
        .await
        .unwrap();

    let script = vec!["/bin/sh".to_string(), "-c".to_string(), "sleep 5".to_string()];
    let shutdown = CancellationToken::new();
    let worker = Worker::new(replica_a.clone(), WorkerId::new("replica-a"), worker_config(script, Duration::from_secs(30)), ActiveJobs::new());
    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { worker.run(shutdown).await }
    });

    let leased = wait_until(Duration::from_secs(1), {
        let replica_a = replica_a.clone();
        let token = token.clone();
        move || {
            let replica_a = replica_a.clone();
            let token = token.clone();
            async move { matches!(replica_a.get_info(&token).await, Ok(Some(info)) if info.status == ProgressStatus::Running) }
        }
    })
    .await;
    assert!(leased, "replica A never picked up the job");

    let abort_from_b = AbortCoordinator::new(
        replica_b,
        ActiveJobs::new(),
        AbortCoordinatorConfig {
            notification_base_url: None,
            http_timeout: Duration::from_millis(200),
            abort_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(10),
        },
    )
    .unwrap();

    let outcome = abort_from_b.abort(&token, true, "replica-b", "broadcast").await.unwrap();
    assert_eq!(outcome, AbortOutcome::Aborted);

    let seen_on_a = replica_a.get_info(&token).await.unwrap().unwrap();
    assert_eq!(seen_on_a.status, ProgressStatus::Aborted);

    shutdown.cancel();
    let _ = handle.await;
}
