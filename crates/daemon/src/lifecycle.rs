// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup/shutdown configuration and error kinds.

use std::path::PathBuf;
use thiserror::Error;

/// Daemon configuration, resolved from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. `~/.local/state/orchestra`).
    pub state_dir: PathBuf,
    /// Path to the Unix socket the Orchestration-Controls binding listens on.
    pub socket_path: PathBuf,
    /// Path to the SQLite database backing the sqlite Controller dialect.
    pub db_path: PathBuf,
}

impl Config {
    /// Load configuration for the user-level daemon. One daemon serves all
    /// jobs submitted by a user; state lives under `ORCHESTRA_STATE_DIR` (or
    /// the XDG/HOME fallback — see `crate::env::state_dir`).
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = crate::env::state_dir()?;
        Ok(Self {
            socket_path: state_dir.join("daemon.sock"),
            db_path: state_dir.join("orchestra.sqlite3"),
            state_dir,
        })
    }
}

/// Errors from daemon startup/shutdown.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend unavailable: {0}")]
    Storage(String),
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
