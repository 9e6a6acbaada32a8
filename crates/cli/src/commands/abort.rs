// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};
use orchestra_core::Token;
use orchestra_wire::{Request, Response};

/// `orchestra abort <token> [--reason TEXT]`: cooperative abort, cascading
/// to children. The daemon always blocks until the Registry shows the job
/// terminal or `ORCHESTRA_ABORT_TIMEOUT` elapses.
pub async fn run(client: &DaemonClient, token: Token, reason: String, format: OutputFormat) -> anyhow::Result<()> {
    let request = Request::Abort { token: token.clone(), origin: "cli".to_string(), reason };
    match client.send(&request).await? {
        Response::Ok => format_or_json(format, &serde_json::json!({"token": token.to_string(), "aborted": true}), || {
            println!("aborted {token}");
        }),
        _ => anyhow::bail!("unexpected response to Abort"),
    }
}

#[cfg(test)]
#[path = "abort_tests.rs"]
mod tests;
