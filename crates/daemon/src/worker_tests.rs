// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::kv_controller::KvController;
use orchestra_core::{JobConfig, ProgressStatus};
use orchestra_storage::{MemoryKv, Queue, Registry};
use tokio_util::sync::CancellationToken;

fn controller() -> Arc<dyn Controller> {
    let store: Arc<dyn orchestra_storage::KvStore> = Arc::new(MemoryKv::new());
    Arc::new(KvController::new(Queue::new(store.clone()), Registry::new(store)))
}

fn config(command: Vec<String>, process_timeout: Duration) -> WorkerConfig {
    WorkerConfig {
        worker_interval: Duration::from_millis(10),
        lock_ttl: chrono::Duration::seconds(30),
        lock_refresh_interval: Duration::from_millis(50),
        registry_push_interval: Duration::from_millis(10),
        message_interval: Duration::from_millis(20),
        abort_grace: Duration::from_millis(20),
        process_timeout,
        command,
    }
}

async fn submit(controller: &Arc<dyn Controller>, token: &Token) {
    controller
        .submit(JobConfig::for_test(token.clone(), serde_json::json!({})), chrono::Utc::now())
        .await
        .unwrap();
}

#[tokio::test]
async fn run_job_completes_on_successful_exit() {
    let controller = controller();
    let token = Token::new();
    submit(&controller, &token).await;

    let script = vec![
        "/bin/sh".to_string(),
        "-c".to_string(),
        r#"echo '{"event":"Progress","numeric":50,"verbose":"halfway"}'; echo '{"event":"Done","success":true}'"#.to_string(),
    ];
    let worker = Worker::new(controller.clone(), WorkerId::new("w0"), config(script, Duration::from_secs(5)), ActiveJobs::new());

    let ran = worker.try_run_one(&CancellationToken::new()).await.unwrap();
    assert!(ran);

    let info = controller.get_info(&token).await.unwrap().unwrap();
    assert_eq!(info.status, ProgressStatus::Completed);
    assert_eq!(info.progress.numeric, 100);
}

#[tokio::test]
async fn run_job_times_out_and_aborts_without_requeue() {
    let controller = controller();
    let token = Token::new();
    submit(&controller, &token).await;

    let script = vec!["/bin/sh".to_string(), "-c".to_string(), "sleep 5".to_string()];
    let worker = Worker::new(controller.clone(), WorkerId::new("w0"), config(script, Duration::from_millis(80)), ActiveJobs::new());

    worker.try_run_one(&CancellationToken::new()).await.unwrap();

    let info = controller.get_info(&token).await.unwrap().unwrap();
    assert_eq!(info.status, ProgressStatus::Aborted);

    let status = controller.status().await.unwrap();
    assert_eq!(status.queue_size, 0);
}

#[tokio::test]
async fn run_job_requeues_on_spawn_failure() {
    let controller = controller();
    let token = Token::new();
    submit(&controller, &token).await;

    let worker = Worker::new(
        controller.clone(),
        WorkerId::new("w0"),
        config(vec![], Duration::from_secs(5)),
        ActiveJobs::new(),
    );

    worker.try_run_one(&CancellationToken::new()).await.unwrap();

    let status = controller.status().await.unwrap();
    assert_eq!(status.queue_size, 1);
    let info = controller.get_info(&token).await.unwrap().unwrap();
    assert_eq!(info.status, ProgressStatus::Queued);
}

#[tokio::test]
async fn try_run_one_returns_false_when_queue_is_empty() {
    let controller = controller();
    let worker = Worker::new(controller, WorkerId::new("w0"), config(vec!["/bin/true".to_string()], Duration::from_secs(5)), ActiveJobs::new());
    let ran = worker.try_run_one(&CancellationToken::new()).await.unwrap();
    assert!(!ran);
}

#[tokio::test]
async fn active_jobs_tracks_a_job_only_while_it_runs() {
    let active_jobs = ActiveJobs::new();
    let token = Token::new();
    assert!(active_jobs.get(&token).is_none());

    let report = Report::new("w0", token.as_str(), serde_json::json!({}));
    struct NullFlusher;
    impl ReportFlusher for NullFlusher {
        fn flush(&self, _report: &Report) {}
    }
    let context = Arc::new(JobContext::new(report, Arc::new(NullFlusher), Duration::from_millis(10)));
    active_jobs.register(token.clone(), context);
    assert!(active_jobs.get(&token).is_some());

    active_jobs.unregister(&token);
    assert!(active_jobs.get(&token).is_none());
}
