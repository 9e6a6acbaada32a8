// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::mock_daemon;

#[tokio::test]
async fn abort_prints_confirmation_on_ok() {
    let token = Token::new();
    let (client, _guard) = mock_daemon(|request| match request {
        Request::Abort { .. } => Response::Ok,
        _ => panic!("unexpected request"),
    })
    .await;

    run(&client, token, "cancelled by operator".to_string(), OutputFormat::Text).await.unwrap();
}
