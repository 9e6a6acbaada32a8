// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ServiceAdapter::run(hooks)`: an optional polling loop for services that
//! want progress-update callbacks instead of reading the Registry
//! themselves on their own cadence.

use crate::ServiceAdapter;
use orchestra_core::{Progress, Token};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;

/// Callback invoked with a token's current `Progress` on every poll tick.
/// Implemented for any `Fn(&Token, &Progress) + Send + Sync + 'static`.
pub trait ProgressHook: Send + Sync + 'static {
    fn on_progress(&self, token: &Token, progress: &Progress);
}

impl<F> ProgressHook for F
where
    F: Fn(&Token, &Progress) + Send + Sync + 'static,
{
    fn on_progress(&self, token: &Token, progress: &Progress) {
        self(token, progress)
    }
}

/// Handle to a spawned `run(hooks)` loop. Dropping it does not stop the
/// loop; call `stop` for a clean shutdown.
pub struct RunHandle {
    handle: JoinHandle<()>,
}

impl RunHandle {
    /// Abort the polling loop immediately.
    pub fn stop(self) {
        self.handle.abort();
    }
}

pub(crate) fn spawn(adapter: ServiceAdapter, tokens: Vec<Token>, interval: Duration, hook: impl ProgressHook) -> RunHandle {
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            for token in &tokens {
                match adapter.progress(token).await {
                    Ok(progress) => hook.on_progress(token, &progress),
                    Err(e) => warn!(token = %token, error = %e, "run(hooks) poll failed"),
                }
            }
        }
    });
    RunHandle { handle }
}
