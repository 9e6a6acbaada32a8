// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! orchestra-wire: the Orchestration-Controls API binding (C9) — a
//! length-prefixed JSON wire protocol carrying `Request`/`Response` pairs
//! over a Unix domain socket or a peer's TCP/HTTP-reachable endpoint.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod request;
mod response;
mod wire;

pub use request::Request;
pub use response::{ControllerStatusPayload, LeasedPayload, Response};
pub use wire::{decode, encode, read_message, read_request, read_response, write_message, write_request, write_response, ProtocolError};
