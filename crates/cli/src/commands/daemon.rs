// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::client::DaemonClient;
use orchestra_wire::{Request, Response};

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum DaemonAction {
    Start,
    Stop,
    Kill,
}

/// `orchestra daemon <start|stop|kill>`: drives the Controller loop's
/// watchdog (C6) without tearing down the Unix-socket listener itself.
pub async fn run(client: &DaemonClient, action: DaemonAction) -> anyhow::Result<()> {
    let request = match action {
        DaemonAction::Start => Request::ControllerStart,
        DaemonAction::Stop => Request::ControllerStop,
        DaemonAction::Kill => Request::ControllerKill,
    };
    match client.send(&request).await? {
        Response::Ok => {
            println!("{action:?}: ok");
            Ok(())
        }
        _ => anyhow::bail!("unexpected response to {action:?}"),
    }
}

impl std::fmt::Debug for DaemonAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DaemonAction::Start => "start",
            DaemonAction::Stop => "stop",
            DaemonAction::Kill => "kill",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
