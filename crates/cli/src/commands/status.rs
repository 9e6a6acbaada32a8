// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};
use orchestra_wire::{Request, Response};

/// `orchestra status`: Queue/Registry/Controller/Daemon snapshot, per §6.1.
pub async fn run(client: &DaemonClient, format: OutputFormat) -> anyhow::Result<()> {
    match client.send(&Request::ControllerStatus).await? {
        Response::ControllerStatus { status } => format_or_json(format, &status, || {
            println!("running:      {}", status.running);
            println!("active leases: {}", status.active_leases);
            println!("queue depth:   {}", status.queue_depth);
            println!("uptime:        {}s", status.uptime_secs);
        }),
        _ => anyhow::bail!("unexpected response to ControllerStatus"),
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
