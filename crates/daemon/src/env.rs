// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::LifecycleError;

/// Protocol version (from Cargo.toml).
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve state directory: `ORCHESTRA_STATE_DIR` > `XDG_STATE_HOME/orchestra` > `~/.local/state/orchestra`.
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("ORCHESTRA_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("orchestra"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/orchestra"))
}

/// Default IPC read/write timeout.
pub fn ipc_timeout() -> Duration {
    std::env::var("ORCHESTRA_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Lease TTL granted to a worker on lease acquisition.
pub fn lease_ttl() -> chrono::Duration {
    let secs = std::env::var("ORCHESTRA_LEASE_TTL_SECS")
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(60);
    chrono::Duration::seconds(secs)
}

/// How often a running worker refreshes its lease (must be well under
/// `lease_ttl` so a missed refresh still leaves margin before expiry).
pub fn lease_refresh_interval() -> Duration {
    std::env::var("ORCHESTRA_LEASE_REFRESH_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(15))
}

/// Minimum interval between progress pushes to the Registry, debouncing
/// high-frequency `JobContext::set_progress` calls from a busy job.
pub fn progress_push_interval() -> Duration {
    std::env::var("ORCHESTRA_PROGRESS_PUSH_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(500))
}

/// Wall-clock timeout applied to a single job's child process.
pub fn job_timeout() -> Duration {
    std::env::var("ORCHESTRA_JOB_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(3600))
}

/// Delay before the watchdog (C6) restarts a crashed Controller loop.
pub fn watchdog_restart_delay() -> Duration {
    std::env::var("ORCHESTRA_WATCHDOG_RESTART_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(2))
}

/// Graceful-stop drain timeout.
pub fn drain_timeout() -> Duration {
    std::env::var("ORCHESTRA_DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Bound on a synchronous `abort(token, block=true)` call, per §4.7.
pub fn abort_timeout() -> Duration {
    std::env::var("ORCHESTRA_ABORT_TIMEOUT")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(30))
}

/// Poll cadence while a synchronous abort waits for the Registry to show
/// the job as terminal.
pub fn abort_poll_interval() -> Duration {
    std::env::var("ORCHESTRA_ABORT_POLL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(200))
}

/// Grace period between a cooperative SIGTERM-equivalent interrupt and the
/// Worker's hard kill, per §4.4 step 4.
pub fn abort_grace() -> Duration {
    std::env::var("ORCHESTRA_ABORT_GRACE_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(10))
}

/// Bound on `requeue_count` before a persistently-crashing job is marked
/// `aborted` instead of requeued again (§9 open question (a)).
pub fn max_requeues() -> u32 {
    std::env::var("ORCHESTRA_MAX_REQUEUES")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(5)
}

/// Number of worker slots this replica runs, per `ORCHESTRA_WORKER_POOL_SIZE`.
pub fn worker_pool_size() -> usize {
    std::env::var("ORCHESTRA_WORKER_POOL_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(4)
}

/// Poll interval a worker slot sleeps for after finding nothing leasable.
pub fn worker_interval() -> Duration {
    std::env::var("ORCHESTRA_WORKER_INTERVAL")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(500))
}

/// Interval at which the Daemon watchdog restarts the Controller loop.
pub fn daemon_interval() -> Duration {
    std::env::var("ORCHESTRA_DAEMON_INTERVAL")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(1))
}

/// Selects which `Controller` dialect backs this replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    Sqlite,
    Http,
}

/// `ORCHESTRA_CONTROLLER`, defaulting to the local SQLite dialect.
pub fn controller_kind() -> ControllerKind {
    match std::env::var("ORCHESTRA_CONTROLLER").as_deref() {
        Ok("http") => ControllerKind::Http,
        _ => ControllerKind::Sqlite,
    }
}

/// `ORCHESTRA_CONTROLLER_ARGS`, a JSON object parsed by whichever
/// `ControllerKind` is selected.
pub fn controller_args() -> serde_json::Value {
    std::env::var("ORCHESTRA_CONTROLLER_ARGS")
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or(serde_json::json!({}))
}

/// `ORCHESTRA_WORKER_ARGS`: JSON object with at least a `command` array
/// naming the job-callable argv.
pub fn worker_args() -> serde_json::Value {
    std::env::var("ORCHESTRA_WORKER_ARGS")
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or(serde_json::json!({}))
}

/// `ORCHESTRA_LOGLEVEL` as a `tracing_subscriber::EnvFilter` directive.
pub fn log_level_directive() -> String {
    match std::env::var("ORCHESTRA_LOGLEVEL").as_deref() {
        Ok("none") => "off".to_string(),
        Ok("error") => "error".to_string(),
        Ok("debug") => "debug".to_string(),
        Ok("info") => "info".to_string(),
        _ => "info".to_string(),
    }
}

/// `ORCHESTRA_AT_STARTUP`: whether the Controller loop starts immediately
/// or waits for an explicit `ControllerStart` request.
pub fn at_startup() -> bool {
    std::env::var("ORCHESTRA_AT_STARTUP")
        .ok()
        .map(|s| !matches!(s.as_str(), "0" | "false"))
        .unwrap_or(true)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
