// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared scaffolding for the scenario tests: an in-memory `KvController`,
//! an `AbortCoordinator` over it, and short intervals so the scenarios run
//! in milliseconds instead of the production `ORCHESTRA_*` defaults.

use orchestra_daemon::kv_controller::KvController;
use orchestra_daemon::worker::ActiveJobs;
use orchestra_daemon::{AbortCoordinator, AbortCoordinatorConfig, Controller, WorkerConfig};
use orchestra_storage::{KvStore, MemoryKv, Queue, Registry};
use std::sync::Arc;
use std::time::Duration;

pub fn controller() -> Arc<dyn Controller> {
    let store: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
    Arc::new(KvController::new(Queue::new(store.clone()), Registry::new(store)))
}

/// Two independent `KvController`s sharing one backing store, standing in
/// for two replicas of a Controller backed by the same eventually
/// consistent registry (SPEC §1's Non-goals: "no strong linearizability
/// across replicas — eventual via the shared registry").
pub fn replica_pair() -> (Arc<dyn Controller>, Arc<dyn Controller>) {
    let store: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
    let a: Arc<dyn Controller> = Arc::new(KvController::new(Queue::new(store.clone()), Registry::new(store.clone())));
    let b: Arc<dyn Controller> = Arc::new(KvController::new(Queue::new(store.clone()), Registry::new(store)));
    (a, b)
}

pub fn abort_coordinator(controller: Arc<dyn Controller>, active_jobs: ActiveJobs) -> Arc<AbortCoordinator> {
    Arc::new(
        AbortCoordinator::new(
            controller,
            active_jobs,
            AbortCoordinatorConfig {
                notification_base_url: None,
                http_timeout: Duration::from_millis(200),
                abort_timeout: Duration::from_secs(2),
                poll_interval: Duration::from_millis(20),
            },
        )
        .unwrap(),
    )
}

pub fn worker_config(command: Vec<String>, process_timeout: Duration) -> WorkerConfig {
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

/// Poll an async condition until it's true or `timeout` elapses. Used
/// instead of a fixed `sleep` so the scenario tests aren't flaky under
/// load, matching the teacher's own `wait_for`-style polling test helpers.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
