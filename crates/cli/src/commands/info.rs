// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::client::DaemonClient;
use crate::output::{format_or_json, format_time_ago, OutputFormat};
use orchestra_core::Token;
use orchestra_wire::{Request, Response};

/// `orchestra info <token>`: the full `JobInfo` Registry record.
pub async fn run(client: &DaemonClient, token: Token, format: OutputFormat) -> anyhow::Result<()> {
    match client.send(&Request::GetInfo { token: token.clone() }).await? {
        Response::Info { info: Some(info) } => format_or_json(format, &info, || {
            println!("token:   {}", info.token);
            println!("host:    {}", info.host);
            println!("status:  {}", info.status);
            println!("owner:   {}", info.owner.as_ref().map(|o| o.as_str()).unwrap_or("-"));
            println!("updated: {}", format_time_ago(info.updated_at.timestamp_millis() as u64));
        }),
        Response::Info { info: None } => anyhow::bail!("unknown token: {token}"),
        _ => anyhow::bail!("unexpected response to GetInfo"),
    }
}

#[cfg(test)]
#[path = "info_tests.rs"]
mod tests;
