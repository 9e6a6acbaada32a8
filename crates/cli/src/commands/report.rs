// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};
use orchestra_core::Token;
use orchestra_wire::{Request, Response};

/// `orchestra report <token>`: the most recently flushed `Report`, which
/// may lag an in-flight job's live state by up to `registry_push_interval`.
pub async fn run(client: &DaemonClient, token: Token, format: OutputFormat) -> anyhow::Result<()> {
    match client.send(&Request::GetReport { token: token.clone() }).await? {
        Response::Report { report: Some(report) } => format_or_json(format, &report, || {
            println!("token:    {}", report.token);
            println!("host:     {}", report.host);
            println!("progress: {} ({}%)", report.progress.status, report.progress.numeric);
            println!("children: {}", report.children.len());
            for category in [
                orchestra_core::LogCategory::Error,
                orchestra_core::LogCategory::Warning,
            ] {
                let count = report.log_count(category);
                if count > 0 {
                    println!("{category}: {count}");
                }
            }
        }),
        Response::Report { report: None } => anyhow::bail!("unknown token: {token}"),
        _ => anyhow::bail!("unexpected response to GetReport"),
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
