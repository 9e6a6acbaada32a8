// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn ok_has_no_payload_fields_in_json() {
    let json = serde_json::to_string(&Response::Ok).unwrap();
    assert_eq!(json, r#"{"type":"Ok"}"#);
}

#[test]
fn error_roundtrips_status_hint() {
    let response = Response::Error { message: "lease lost".into(), status_hint: 500 };
    let json = serde_json::to_string(&response).unwrap();
    let back: Response = serde_json::from_str(&json).unwrap();
    assert_eq!(back, response);
}

#[test]
fn controller_status_roundtrips() {
    let status = ControllerStatusPayload {
        running: true,
        active_leases: 3,
        queue_depth: 10,
        uptime_secs: 3600,
    };
    let response = Response::ControllerStatus { status: status.clone() };
    let json = serde_json::to_string(&response).unwrap();
    let back: Response = serde_json::from_str(&json).unwrap();
    match back {
        Response::ControllerStatus { status: roundtripped } => assert_eq!(roundtripped, status),
        other => panic!("expected ControllerStatus, got {other:?}"),
    }
}
