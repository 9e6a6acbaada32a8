// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orchestrad`: the orchestra daemon binary. Wires together a Controller
//! dialect, a pool of Worker slots, the Abort Coordinator, the Daemon
//! watchdog, and the Unix-socket Orchestration-Controls listener.

use orchestra_daemon::{
    env, AbortCoordinator, AbortCoordinatorConfig, ActiveJobs, Config, Controller, Daemon, Dispatcher, HttpController,
    HttpControllerArgs, Listener, SqliteController, SqliteControllerArgs, Worker, WorkerConfig,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_logging();

    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "orchestrad exited with an error");
            std::process::ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_new(env::log_level_directive()).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    info!(socket = %config.socket_path.display(), "starting orchestrad");

    let controller: Arc<dyn Controller> = build_controller(&config).await?;

    let shutdown = CancellationToken::new();
    let active_jobs = ActiveJobs::new();

    let worker_config = build_worker_config();
    let mut worker_handles = Vec::new();
    for slot in 0..env::worker_pool_size() {
        let worker = Worker::new(
            controller.clone(),
            orchestra_core::WorkerId::new(format!("{}-{slot}", hostname())),
            worker_config.clone(),
            active_jobs.clone(),
        );
        let shutdown = shutdown.clone();
        worker_handles.push(tokio::spawn(async move { worker.run(shutdown).await }));
    }

    let abort_config = AbortCoordinatorConfig {
        notification_base_url: std::env::var("ORCHESTRA_NOTIFICATION_URL").ok(),
        http_timeout: env::ipc_timeout(),
        abort_timeout: env::abort_timeout(),
        poll_interval: env::abort_poll_interval(),
    };
    let abort = Arc::new(AbortCoordinator::new(controller.clone(), active_jobs.clone(), abort_config)?);

    let daemon = Arc::new(Mutex::new(Daemon::new()));
    if env::at_startup() {
        let heartbeat_controller = controller.clone();
        daemon.lock().start(
            move || {
                let controller = heartbeat_controller.clone();
                async move {
                    controller.status().await.map(|_| ())
                }
            },
            env::daemon_interval(),
            env::watchdog_restart_delay(),
        );
    }

    let dispatcher = Arc::new(Dispatcher {
        controller,
        abort,
        daemon,
        started_at: Instant::now(),
    });
    let listener = Listener::bind(&config.socket_path, dispatcher)?;

    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        ctrl_c_shutdown.cancel();
    });

    listener.serve(shutdown.clone()).await;
    for handle in worker_handles {
        let _ = handle.await;
    }
    Ok(())
}

async fn build_controller(config: &Config) -> Result<Arc<dyn Controller>, Box<dyn std::error::Error>> {
    match env::controller_kind() {
        env::ControllerKind::Sqlite => {
            let mut args: SqliteControllerArgs = serde_json::from_value(env::controller_args()).unwrap_or(SqliteControllerArgs {
                db_path: config.db_path.to_string_lossy().to_string(),
                lock_ttl_secs: 60,
                token_ttl_secs: None,
                message_ttl_secs: 300,
                max_requeues: env::max_requeues(),
            });
            if args.db_path.is_empty() {
                args.db_path = config.db_path.to_string_lossy().to_string();
            }
            Ok(Arc::new(SqliteController::connect(args).await?))
        }
        env::ControllerKind::Http => {
            let args: HttpControllerArgs = serde_json::from_value(env::controller_args())?;
            Ok(Arc::new(HttpController::new(args)?))
        }
    }
}

fn build_worker_config() -> WorkerConfig {
    let args = env::worker_args();
    let command = args
        .get("command")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_else(|| vec!["/bin/false".to_string()]);

    WorkerConfig {
        worker_interval: env::worker_interval(),
        lock_ttl: env::lease_ttl(),
        lock_refresh_interval: env::lease_refresh_interval(),
        registry_push_interval: env::progress_push_interval(),
        message_interval: env::lease_refresh_interval(),
        abort_grace: env::abort_grace(),
        process_timeout: env::job_timeout(),
        command,
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "orchestra".to_string())
}
