// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::mock_daemon;
use orchestra_core::Progress;

#[tokio::test]
async fn poll_prints_progress_for_a_known_token() {
    let token = Token::new();
    let (client, _guard) = mock_daemon(|request| match request {
        Request::Poll { .. } => Response::Progress { progress: Some(Progress::running(42, "working")) },
        _ => panic!("unexpected request"),
    })
    .await;

    run(&client, token, OutputFormat::Json).await.unwrap();
}

#[tokio::test]
async fn poll_errors_on_unknown_token() {
    let token = Token::new();
    let (client, _guard) = mock_daemon(|_| Response::Progress { progress: None }).await;
    let err = run(&client, token, OutputFormat::Text).await.unwrap_err();
    assert!(err.to_string().contains("unknown token"));
}
