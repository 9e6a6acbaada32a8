// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin client over the Orchestration-Controls Unix socket (C9): one
//! request per call, one connection per process invocation.

use orchestra_wire::{read_response, write_request, ProtocolError, Request, Response};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to orchestrad at {path}: {source}")]
    Connect { path: String, #[source] source: std::io::Error },

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("daemon returned an error (status {status_hint}): {message}")]
    Daemon { status_hint: u16, message: String },

    #[error("unexpected response variant from daemon")]
    UnexpectedResponse,
}

pub struct DaemonClient {
    socket_path: std::path::PathBuf,
    timeout: Duration,
}

impl DaemonClient {
    pub fn new(socket_path: impl AsRef<Path>, timeout: Duration) -> Self {
        Self { socket_path: socket_path.as_ref().to_path_buf(), timeout }
    }

    /// Send one request, await its matching response. Opens a fresh
    /// connection per call — the daemon's `Listener` happily serves many
    /// short-lived connections, and a CLI invocation never needs more than
    /// one round trip.
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path).await.map_err(|source| ClientError::Connect {
            path: self.socket_path.display().to_string(),
            source,
        })?;
        write_request(&mut stream, request, self.timeout).await?;
        let response = read_response(&mut stream, self.timeout).await?;
        if let Response::Error { status_hint, message } = response {
            return Err(ClientError::Daemon { status_hint, message });
        }
        Ok(response)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
