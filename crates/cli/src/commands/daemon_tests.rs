// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::mock_daemon;

#[tokio::test]
async fn stop_sends_controller_stop_and_succeeds() {
    let (client, _guard) = mock_daemon(|request| match request {
        Request::ControllerStop => Response::Ok,
        _ => panic!("unexpected request"),
    })
    .await;

    run(&client, DaemonAction::Stop).await.unwrap();
}

#[tokio::test]
async fn kill_sends_controller_kill_and_succeeds() {
    let (client, _guard) = mock_daemon(|request| match request {
        Request::ControllerKill => Response::Ok,
        _ => panic!("unexpected request"),
    })
    .await;

    run(&client, DaemonAction::Kill).await.unwrap();
}
