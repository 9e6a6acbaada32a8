// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};
use orchestra_core::{JobConfig, Token};
use orchestra_wire::{Request, Response};

/// `orchestra submit <body.json|-> [--format json]`: read a JSON body
/// (from a file or stdin), enqueue it, and print the allocated token.
pub async fn run(client: &DaemonClient, body: serde_json::Value, format: OutputFormat) -> anyhow::Result<()> {
    let token = Token::new();
    let config = JobConfig::new(token.clone(), body.clone(), body);

    match client.send(&Request::Submit { config }).await? {
        Response::Submitted { token } => format_or_json(format, &token, || println!("{token}")),
        _ => anyhow::bail!("unexpected response to Submit"),
    }
}

#[cfg(test)]
#[path = "submit_tests.rs"]
mod tests;
