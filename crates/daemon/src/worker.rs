// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Worker (C4): a pool of slots, each running one job at a time in a
//! spawned child process while the parent task supervises it.
//!
//! The job callable is an external command (configured once per Worker, not
//! per job — see `WorkerConfig::command`); the `JobConfig` is piped to its
//! stdin as JSON and the child reports back over stdout as newline-delimited
//! `ChildEvent` JSON lines. This keeps a crashing or hung job from ever
//! taking the daemon process down with it, matching the "fresh-process, no
//! inherited file descriptors" child-process semantics.

use crate::controller::Controller;
use orchestra_core::context::ReportFlusher;
use orchestra_core::{ChildJob, JobConfig, JobContext, JobInfo, LogCategory, OrchestraError, Progress, ProgressStatus, Report, Token, WorkerId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{error, info, warn};

/// In-process registry of `JobContext`s currently held by a lease on this
/// replica, keyed by token. Lets the Abort Coordinator's local path (§4.7,
/// path 1) set `abort_requested` directly instead of round-tripping through
/// the Controller, when the job happens to be running in this same process.
#[derive(Clone, Default)]
pub struct ActiveJobs(Arc<Mutex<HashMap<Token, Arc<JobContext>>>>);

impl ActiveJobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, token: Token, context: Arc<JobContext>) {
        self.0.lock().insert(token, context);
    }

    pub(crate) fn unregister(&self, token: &Token) {
        self.0.lock().remove(token);
    }

    /// Look up a locally-running job's context, for direct abort.
    pub fn get(&self, token: &Token) -> Option<Arc<JobContext>> {
        self.0.lock().get(token).cloned()
    }
}

/// One line of structured output a job callable writes to stdout.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "event")]
enum ChildEvent {
    Log { category: LogCategory, origin: String, body: String },
    Progress { numeric: u8, verbose: String },
    Data { value: serde_json::Value },
    SpawnChild { token: Token, host: String, timeout_secs: u64 },
    Done { success: bool },
}

/// Tunables for the Worker's lease loop, sourced from the
/// `ORCHESTRA_*` environment variables (see `crate::env`).
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_interval: Duration,
    pub lock_ttl: chrono::Duration,
    pub lock_refresh_interval: Duration,
    pub registry_push_interval: Duration,
    pub message_interval: Duration,
    pub abort_grace: Duration,
    pub process_timeout: Duration,
    /// Argv for the job-callable process. The `JobConfig` is piped to its
    /// stdin as JSON; additional per-job arguments are not supported here —
    /// the callable reads everything it needs from stdin.
    pub command: Vec<String>,
}

/// Flushes `JobContext` reports back to the Controller via `push`. Caches
/// the fields of `JobInfo` that don't change across a lease (token, host,
/// config, owner, started_at) so each flush only needs the fresh `Report`.
struct RegistryFlusher {
    controller: Arc<dyn Controller>,
    lease_id: orchestra_core::LeaseId,
    token: Token,
    host: String,
    config: JobConfig,
    owner: WorkerId,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl ReportFlusher for RegistryFlusher {
    fn flush(&self, report: &Report) {
        let controller = self.controller.clone();
        let lease_id = self.lease_id;
        let report = report.clone();
        let now = chrono::Utc::now();
        let info = JobInfo {
            token: self.token.clone(),
            host: self.host.clone(),
            config: self.config.clone(),
            progress: report.progress.clone(),
            status: report.progress.status,
            started_at: Some(self.started_at),
            updated_at: now,
            owner: Some(self.owner.clone()),
            lock_expires_at: None,
            report,
        };
        tokio::spawn(async move {
            if let Err(e) = controller.push(info, lease_id).await {
                warn!(error = %e, "registry push failed");
            }
        });
    }
}

/// A single worker slot's lease loop (§4.4, steps 1-6).
pub struct Worker {
    controller: Arc<dyn Controller>,
    identity: WorkerId,
    config: WorkerConfig,
    active_jobs: ActiveJobs,
}

impl Worker {
    pub fn new(controller: Arc<dyn Controller>, identity: WorkerId, config: WorkerConfig, active_jobs: ActiveJobs) -> Self {
        Self { controller, identity, config, active_jobs }
    }

    /// Run the lease loop forever. Each iteration blocks up to
    /// `worker_interval` when the Queue has nothing leasable.
    pub async fn run(&self, shutdown: tokio_util::sync::CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(worker = %self.identity, "worker slot shutting down");
                    return;
                }
                result = self.try_run_one(&shutdown) => {
                    match result {
                        Ok(true) => {}
                        Ok(false) => tokio::time::sleep(self.config.worker_interval).await,
                        Err(e) => {
                            error!(worker = %self.identity, error = %e, "lease loop iteration failed");
                            tokio::time::sleep(self.config.worker_interval).await;
                        }
                    }
                }
            }
        }
    }

    /// Attempt one lease+run cycle. Returns `Ok(true)` if a job ran,
    /// `Ok(false)` if nothing was leasable.
    async fn try_run_one(&self, shutdown: &tokio_util::sync::CancellationToken) -> Result<bool, OrchestraError> {
        let now = chrono::Utc::now();
        let Some(leased) = self.controller.lease(self.identity.clone(), self.config.lock_ttl, now).await? else {
            return Ok(false);
        };
        self.run_job(leased.config, leased.lease_id, shutdown).await?;
        Ok(true)
    }

    async fn run_job(
        &self,
        config: orchestra_core::JobConfig,
        lease_id: orchestra_core::LeaseId,
        shutdown: &tokio_util::sync::CancellationToken,
    ) -> Result<(), OrchestraError> {
        let token = config.token.clone();
        let started_at = chrono::Utc::now();
        let report = Report::new(self.identity.as_str(), token.as_str(), config.request_body.clone());
        let flusher = Arc::new(RegistryFlusher {
            controller: self.controller.clone(),
            lease_id,
            token: token.clone(),
            host: self.identity.as_str().to_string(),
            config: config.clone(),
            owner: self.identity.clone(),
            started_at,
        });
        let context = Arc::new(JobContext::new(report, flusher, self.config.registry_push_interval));
        self.active_jobs.register(token.clone(), context.clone());

        let mut child = match self.spawn_child(&config) {
            Ok(child) => child,
            Err(e) => {
                warn!(token = %token, error = %e, "failed to spawn job callable");
                self.active_jobs.unregister(&token);
                return self.controller.fail(&token, lease_id, &e.to_string(), true, chrono::Utc::now()).await;
            }
        };

        let outcome = self.supervise_child(&mut child, &context, shutdown).await;
        self.active_jobs.unregister(&token);
        let now = chrono::Utc::now();
        match outcome {
            ChildOutcome::Completed => {
                context.set_progress(Progress::completed());
                self.controller.complete(&token, lease_id, context.snapshot(), now).await
            }
            ChildOutcome::Aborted => {
                context.set_progress(Progress::aborted("aborted"));
                self.controller.fail(&token, lease_id, "aborted", false, now).await
            }
            ChildOutcome::Timeout => {
                let _ = child.start_kill();
                self.controller.fail(&token, lease_id, "TIMEOUT: process_timeout exceeded", false, now).await
            }
            ChildOutcome::Crashed(reason) => self.controller.fail(&token, lease_id, &format!("CRASH: {reason}"), true, now).await,
        }
    }

    fn spawn_child(&self, config: &orchestra_core::JobConfig) -> std::io::Result<Child> {
        let Some((program, args)) = self.config.command.split_first() else {
            return Err(std::io::Error::other("worker command is empty"));
        };
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let mut child = command.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            let payload = serde_json::to_vec(config).unwrap_or_default();
            tokio::spawn(async move {
                let _ = stdin.write_all(&payload).await;
                let _ = stdin.shutdown().await;
            });
        }
        Ok(child)
    }

    async fn supervise_child(
        &self,
        child: &mut Child,
        context: &Arc<JobContext>,
        shutdown: &tokio_util::sync::CancellationToken,
    ) -> ChildOutcome {
        let Some(stdout) = child.stdout.take() else {
            return ChildOutcome::Crashed("child produced no stdout".into());
        };
        let mut lines = BufReader::new(stdout).lines();
        let deadline = Instant::now() + self.config.process_timeout;
        let mut abort_signaled = false;
        let mut sent_interrupt = false;

        loop {
            tokio::select! {
                biased;

                _ = tokio::time::sleep_until(deadline) => {
                    return ChildOutcome::Timeout;
                }

                _ = shutdown.cancelled(), if !abort_signaled => {
                    abort_signaled = true;
                    context.request_abort();
                }

                line = lines.next_line() => {
                    match line {
                        Ok(Some(text)) => {
                            if let Ok(event) = serde_json::from_str::<ChildEvent>(&text) {
                                self.apply_event(context, event).await;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => return ChildOutcome::Crashed(e.to_string()),
                    }
                }

                _ = tokio::time::sleep(self.config.message_interval) => {
                    if context.is_abort_requested() && !sent_interrupt {
                        sent_interrupt = true;
                        return self.interrupt_then_kill(child).await;
                    }
                }
            }
        }

        match child.wait().await {
            Ok(status) if status.success() => ChildOutcome::Completed,
            Ok(status) => ChildOutcome::Crashed(format!("exit status {status}")),
            Err(e) => ChildOutcome::Crashed(e.to_string()),
        }
    }

    /// Cooperative interrupt followed by a hard kill (§4.4 step 4): send a
    /// SIGTERM-equivalent to the child, give it up to `abort_grace` to exit
    /// on its own, then `start_kill()` if it hasn't.
    async fn interrupt_then_kill(&self, child: &mut Child) -> ChildOutcome {
        let Some(pid) = child.id() else {
            let _ = child.start_kill();
            return ChildOutcome::Aborted;
        };
        if let Err(e) = nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), nix::sys::signal::Signal::SIGTERM) {
            warn!(error = %e, pid, "failed to send SIGTERM to job callable, hard-killing instead");
            let _ = child.start_kill();
            let _ = child.wait().await;
            return ChildOutcome::Aborted;
        }

        tokio::select! {
            _ = child.wait() => {}
            _ = tokio::time::sleep(self.config.abort_grace) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
        }
        ChildOutcome::Aborted
    }

    async fn apply_event(&self, context: &Arc<JobContext>, event: ChildEvent) {
        let now = chrono::Utc::now();
        match event {
            ChildEvent::Log { category, origin, body } => context.log(category, now, &origin, &body),
            ChildEvent::Progress { numeric, verbose } => {
                let mut progress = context.snapshot().progress;
                if progress.status != ProgressStatus::Running {
                    progress = Progress::running(0, "");
                }
                progress.advance(numeric, verbose);
                context.set_progress(progress);
                context.push(std::time::Instant::now(), false);
            }
            ChildEvent::Data { value } => context.set_data(value),
            ChildEvent::SpawnChild { token, host, timeout_secs } => {
                context.add_child(ChildJob::new(token, host, Duration::from_secs(timeout_secs)));
            }
            ChildEvent::Done { .. } => {
                context.push(std::time::Instant::now(), true);
            }
        }
    }
}

enum ChildOutcome {
    Completed,
    Aborted,
    Timeout,
    Crashed(String),
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
