// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orchestra`: CLI for the orchestration core, talking to `orchestrad`
//! over its Unix-socket Orchestration-Controls binding (C9).

mod client;
mod color;
mod commands;
mod output;

#[cfg(test)]
mod test_support;

use clap::{Parser, Subcommand};
use client::DaemonClient;
use commands::daemon::DaemonAction;
use orchestra_core::Token;
use output::OutputFormat;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "orchestra", version, styles = color::styles())]
struct Cli {
    /// Path to orchestrad's Unix socket. Defaults to `ORCHESTRA_STATE_DIR`
    /// (or the XDG/HOME fallback) plus `orchestrad.sock`.
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// Per-request timeout.
    #[arg(long, global = true, default_value = "5000")]
    timeout_ms: u64,

    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a JSON body (read from a file, or "-" for stdin) as a new job.
    Submit {
        /// Path to a JSON file, or "-" to read from stdin.
        body: String,
    },
    /// Cheap-path read of a token's current progress.
    Poll { token: String },
    /// Full Registry record (`JobInfo`) for a token.
    Info { token: String },
    /// Most recently flushed `Report` for a token.
    Report { token: String },
    /// Cooperative abort, cascading to children.
    Abort {
        token: String,
        #[arg(long, default_value = "aborted by operator")]
        reason: String,
    },
    /// Queue/Registry/Controller/Daemon status snapshot.
    Status,
    /// Start, stop, or kill the Controller loop's watchdog.
    Daemon {
        #[arg(value_enum)]
        action: DaemonAction,
    },
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let socket_path = match cli.socket {
        Some(path) => path,
        None => orchestra_daemon::env::state_dir()?.join("orchestrad.sock"),
    };
    let client = DaemonClient::new(socket_path, Duration::from_millis(cli.timeout_ms));

    match cli.command {
        Command::Submit { body } => {
            let json = read_body(&body)?;
            commands::submit::run(&client, json, cli.format).await
        }
        Command::Poll { token } => commands::poll::run(&client, parse_token(&token)?, cli.format).await,
        Command::Info { token } => commands::info::run(&client, parse_token(&token)?, cli.format).await,
        Command::Report { token } => commands::report::run(&client, parse_token(&token)?, cli.format).await,
        Command::Abort { token, reason } => commands::abort::run(&client, parse_token(&token)?, reason, cli.format).await,
        Command::Status => commands::status::run(&client, cli.format).await,
        Command::Daemon { action } => commands::daemon::run(&client, action).await,
    }
}

fn parse_token(s: &str) -> anyhow::Result<Token> {
    Token::from_uuid_str(s).map_err(|e| anyhow::anyhow!("invalid token {s:?}: {e}"))
}

fn read_body(arg: &str) -> anyhow::Result<serde_json::Value> {
    let text = if arg == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(arg)?
    };
    Ok(serde_json::from_str(&text)?)
}
