// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix-socket accept loop implementing the Orchestration-Controls binding
//! (C9): one connection per client, each request decoded with
//! `orchestra_wire::read_request` and dispatched against the Controller,
//! Abort Coordinator, and Daemon watchdog.

use crate::abort::AbortCoordinator;
use crate::controller::Controller;
use crate::env;
use crate::watchdog::Daemon;
use orchestra_wire::{ControllerStatusPayload, LeasedPayload, Request, Response};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{UnixListener, UnixStream};
use tracing::{error, info, warn};

/// Shared handles the listener dispatches requests against.
pub struct Dispatcher {
    pub controller: Arc<dyn Controller>,
    pub abort: Arc<AbortCoordinator>,
    pub daemon: Arc<Mutex<Daemon>>,
    pub started_at: Instant,
}

impl Dispatcher {
    async fn handle(&self, request: Request) -> Response {
        match request {
            Request::Ping => Response::Pong,
            Request::Hello { .. } => Response::Hello { version: env::PROTOCOL_VERSION.to_string() },

            Request::Submit { config } => match self.controller.submit(config.clone(), chrono::Utc::now()).await {
                Ok(()) => Response::Submitted { token: config.token },
                Err(e) => error_response(e),
            },

            Request::Poll { token } | Request::Progress { token } => match self.controller.get_info(&token).await {
                Ok(info) => Response::Progress { progress: info.map(|i| i.progress) },
                Err(e) => error_response(e),
            },

            Request::GetInfo { token } => match self.controller.get_info(&token).await {
                Ok(info) => Response::Info { info: info.map(Box::new) },
                Err(e) => error_response(e),
            },

            Request::GetReport { token } => match self.controller.get_info(&token).await {
                Ok(info) => Response::Report { report: info.map(|i| Box::new(i.report)) },
                Err(e) => error_response(e),
            },

            Request::Abort { token, origin, reason } => {
                match self.abort.abort(&token, true, &origin, &reason).await {
                    Ok(_) => Response::Ok,
                    Err(e) => error_response(e),
                }
            }

            Request::ControllerStatus => match self.controller.status().await {
                Ok(status) => Response::ControllerStatus {
                    status: ControllerStatusPayload {
                        running: self.daemon.lock().status().running,
                        active_leases: status.registry_size,
                        queue_depth: status.queue_size,
                        uptime_secs: self.started_at.elapsed().as_secs(),
                    },
                },
                Err(e) => error_response(e),
            },

            Request::ControllerStart => {
                info!("controller start requested over control socket; already supervised by the watchdog");
                Response::Ok
            }

            Request::ControllerStop => {
                self.daemon.lock().stop(true, env::drain_timeout()).await;
                Response::Ok
            }

            Request::ControllerKill => {
                self.daemon.lock().stop(false, Duration::ZERO).await;
                Response::Ok
            }

            Request::Lease { owner, ttl_secs } => {
                match self.controller.lease(owner, chrono::Duration::seconds(ttl_secs), chrono::Utc::now()).await {
                    Ok(leased) => Response::Leased {
                        leased: leased.map(|l| LeasedPayload { config: l.config, lease_id: l.lease_id }),
                    },
                    Err(e) => error_response(e),
                }
            }

            Request::Refresh { token, lease_id, ttl_secs } => {
                match self
                    .controller
                    .refresh(&token, lease_id, chrono::Duration::seconds(ttl_secs), chrono::Utc::now())
                    .await
                {
                    Ok(()) => Response::Ok,
                    Err(e) => error_response(e),
                }
            }

            Request::Push { info, lease_id } => match self.controller.push(*info, lease_id).await {
                Ok(()) => Response::Ok,
                Err(e) => error_response(e),
            },

            Request::Complete { token, lease_id, report } => {
                match self.controller.complete(&token, lease_id, *report, chrono::Utc::now()).await {
                    Ok(()) => Response::Ok,
                    Err(e) => error_response(e),
                }
            }

            Request::Fail { token, lease_id, reason, requeue } => {
                match self.controller.fail(&token, lease_id, &reason, requeue, chrono::Utc::now()).await {
                    Ok(()) => Response::Ok,
                    Err(e) => error_response(e),
                }
            }
        }
    }
}

fn error_response(error: orchestra_core::OrchestraError) -> Response {
    Response::Error { status_hint: error.status_hint(), message: error.to_string() }
}

/// Owns the bound Unix socket; `serve` runs the accept loop until the
/// process shuts down.
pub struct Listener {
    listener: UnixListener,
    socket_path: PathBuf,
    dispatcher: Arc<Dispatcher>,
}

impl Listener {
    pub fn bind(socket_path: &Path, dispatcher: Arc<Dispatcher>) -> std::io::Result<Self> {
        if socket_path.exists() {
            let _ = std::fs::remove_file(socket_path);
        }
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(socket_path)?;
        Ok(Self { listener, socket_path: socket_path.to_path_buf(), dispatcher })
    }

    pub async fn serve(&self, shutdown: tokio_util::sync::CancellationToken) {
        info!(path = %self.socket_path.display(), "listening on control socket");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("control socket accept loop shutting down");
                    let _ = std::fs::remove_file(&self.socket_path);
                    return;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let dispatcher = self.dispatcher.clone();
                            tokio::spawn(async move { serve_connection(stream, dispatcher).await });
                        }
                        Err(e) => warn!(error = %e, "accept failed"),
                    }
                }
            }
        }
    }
}

async fn serve_connection(mut stream: UnixStream, dispatcher: Arc<Dispatcher>) {
    let timeout = env::ipc_timeout();
    loop {
        let request = match orchestra_wire::read_request(&mut stream, timeout).await {
            Ok(request) => request,
            Err(orchestra_wire::ProtocolError::ConnectionClosed) => return,
            Err(e) => {
                warn!(error = %e, "failed to read request");
                return;
            }
        };
        let response = dispatcher.handle(request).await;
        if let Err(e) = orchestra_wire::write_response(&mut stream, &response, timeout).await {
            error!(error = %e, "failed to write response");
            return;
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
