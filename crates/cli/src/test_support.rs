// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test-only helper: a one-shot mock `orchestrad` that answers exactly one
//! request with whatever the caller's closure returns, over a real Unix
//! socket in a temp directory.

use crate::client::DaemonClient;
use orchestra_wire::{read_request, write_response, Request, Response};
use std::time::Duration;
use tokio::net::UnixListener;

pub struct MockDaemonGuard {
    _dir: tempfile::TempDir,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for MockDaemonGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn mock_daemon(respond: impl FnOnce(Request) -> Response + Send + 'static) -> (DaemonClient, MockDaemonGuard) {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("orchestrad.sock");
    let listener = UnixListener::bind(&socket_path).unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream, Duration::from_secs(1)).await.unwrap();
        let response = respond(request);
        write_response(&mut stream, &response, Duration::from_secs(1)).await.unwrap();
    });

    let client = DaemonClient::new(&socket_path, Duration::from_secs(1));
    (client, MockDaemonGuard { _dir: dir, handle })
}
