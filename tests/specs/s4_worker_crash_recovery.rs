// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S4: the job callable crashes (exits non-zero without a `Done` event)
//! on its first attempt. The Worker always requeues a crash (as opposed
//! to a timeout, which never requeues), so the same slot re-leases the
//! job and a second attempt completes.

use super::support::{controller, wait_until, worker_config};
use orchestra_core::{JobConfig, ProgressStatus, Token, WorkerId};
use orchestra_daemon::worker::ActiveJobs;
use orchestra_daemon::{Controller, Worker};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn a_crashed_attempt_is_requeued_and_the_retry_completes() {
    let controller = controller();
    let token = Token::new();
    controller
        .submit(JobConfig::for_test(token.clone(), serde_json::json!({})), chrono::Utc::now())
        .await
        .unwrap();

    let marker = std::env::temp_dir().join(format!("orchestra-s4-{}", token.as_str()));
    let _ = std::fs::remove_file(&marker);
    let script = vec![
        "/bin/sh".to_string(),
        "-c".to_string(),
        format!(
            "if [ -f {marker} ]; then echo '{{\"event\":\"Done\",\"success\":true}}'; else touch {marker}; exit 7; fi",
            marker = marker.display()
        ),
    ];

    let shutdown = CancellationToken::new();
    let worker = Worker::new(controller.clone(), WorkerId::new("w0"), worker_config(script, Duration::from_secs(5)), ActiveJobs::new());
    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { worker.run(shutdown).await }
    });

    let completed = wait_until(Duration::from_secs(2), {
        let controller = controller.clone();
        let token = token.clone();
        move || {
            let controller = controller.clone();
            let token = token.clone();
            async move { matches!(controller.get_info(&token).await, Ok(Some(info)) if info.status.is_terminal()) }
        }
    })
    .await;
    assert!(completed, "crashed job was never retried to completion");

    let info = controller.get_info(&token).await.unwrap().unwrap();
    assert_eq!(info.status, ProgressStatus::Completed);

    shutdown.cancel();
    let _ = handle.await;
    let _ = std::fs::remove_file(&marker);
}
