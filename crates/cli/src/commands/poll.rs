// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};
use orchestra_core::Token;
use orchestra_wire::{Request, Response};

/// `orchestra poll <token>`: cheap-path read of just `Progress`.
pub async fn run(client: &DaemonClient, token: Token, format: OutputFormat) -> anyhow::Result<()> {
    match client.send(&Request::Poll { token: token.clone() }).await? {
        Response::Progress { progress: Some(progress) } => format_or_json(format, &progress, || {
            println!("{token}: {} ({}%) {}", progress.status, progress.numeric, progress.verbose);
        }),
        Response::Progress { progress: None } => anyhow::bail!("unknown token: {token}"),
        _ => anyhow::bail!("unexpected response to Poll"),
    }
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;
