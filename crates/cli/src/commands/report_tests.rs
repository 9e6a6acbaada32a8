// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::mock_daemon;
use orchestra_core::Report;

#[tokio::test]
async fn report_prints_the_flushed_report() {
    let token = Token::new();
    let (client, _guard) = mock_daemon(move |request| match request {
        Request::GetReport { token } => Response::Report { report: Some(Box::new(Report::new("host-a", token.as_str(), serde_json::json!({})))) },
        _ => panic!("unexpected request"),
    })
    .await;

    run(&client, token, OutputFormat::Json).await.unwrap();
}

#[tokio::test]
async fn report_errors_on_unknown_token() {
    let token = Token::new();
    let (client, _guard) = mock_daemon(|_| Response::Report { report: None }).await;
    let err = run(&client, token, OutputFormat::Text).await.unwrap_err();
    assert!(err.to_string().contains("unknown token"));
}
