// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Daemon (C6): a generic supervised-loop primitive. Wraps any
//! fallible, repeatable async callable — the Controller lease loop, in
//! `orchestrad`'s case — restarting it after `restart_delay` if it returns
//! an error, and running it again every `interval` otherwise.

use orchestra_core::OrchestraError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Desired vs. observed state, as returned by [`Daemon::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DaemonStatus {
    /// Whether `start` has been called without a matching `stop`.
    pub active: bool,
    /// Whether the supervised task is currently alive.
    pub running: bool,
}

/// Supervises one long-lived callable on a dedicated tokio task.
pub struct Daemon {
    active: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl Daemon {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            cancel: None,
            handle: None,
        }
    }

    /// Start supervising `callable`. A second `start` call without an
    /// intervening `stop` is a no-op — the prior loop keeps running.
    pub fn start<F, Fut>(&mut self, mut callable: F, interval: Duration, restart_delay: Duration)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), OrchestraError>> + Send,
    {
        if self.cancel.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());
        self.active.store(true, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let handle = tokio::spawn(async move {
            loop {
                if cancel.is_cancelled() {
                    break;
                }
                let sleep_for = match callable().await {
                    Ok(()) => interval,
                    Err(e) => {
                        error!(error = %e, "supervised loop iteration failed, restarting");
                        restart_delay
                    }
                };
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(sleep_for) => {}
                }
            }
            running.store(false, Ordering::SeqCst);
        });
        self.handle = Some(handle);
    }

    /// Signal the loop to stop. If `block`, waits up to `timeout` for the
    /// task to exit; a timed-out task is left to finish on its own and the
    /// handle is dropped.
    pub async fn stop(&mut self, block: bool, timeout: Duration) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if block {
            if let Some(handle) = self.handle.take() {
                let _ = tokio::time::timeout(timeout, handle).await;
            }
        }
    }

    pub fn status(&self) -> DaemonStatus {
        DaemonStatus {
            active: self.active.load(Ordering::SeqCst),
            running: self.running.load(Ordering::SeqCst),
        }
    }
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
