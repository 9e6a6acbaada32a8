// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::memory::MemoryKv;
use chrono::Utc;
use orchestra_core::{JobConfig, Token, WorkerId};

fn queue() -> Queue {
    Queue::new(Arc::new(MemoryKv::new()))
}

#[tokio::test]
async fn submit_then_lease_returns_the_config() {
    let q = queue();
    let token = Token::new();
    let config = JobConfig::for_test(token.clone(), serde_json::json!({"path": "a"}));
    let now = Utc::now();
    q.submit(config.clone(), now).await.unwrap();

    let acquired = q.try_lease(WorkerId::from("w1"), now, chrono::Duration::seconds(30)).await.unwrap();
    let acquired = acquired.expect("one leasable entry");
    assert_eq!(acquired.config.token, token);
}

#[tokio::test]
async fn second_lease_attempt_before_expiry_finds_nothing() {
    let q = queue();
    let token = Token::new();
    let config = JobConfig::for_test(token, serde_json::json!({}));
    let now = Utc::now();
    q.submit(config, now).await.unwrap();

    q.try_lease(WorkerId::from("w1"), now, chrono::Duration::seconds(30)).await.unwrap().unwrap();
    let second = q.try_lease(WorkerId::from("w2"), now, chrono::Duration::seconds(30)).await.unwrap();
    assert!(second.is_none(), "entry is still validly leased by w1");
}

#[tokio::test]
async fn lease_becomes_available_again_after_expiry() {
    let q = queue();
    let token = Token::new();
    let config = JobConfig::for_test(token, serde_json::json!({}));
    let now = Utc::now();
    q.submit(config, now).await.unwrap();

    q.try_lease(WorkerId::from("w1"), now, chrono::Duration::seconds(5)).await.unwrap().unwrap();
    let later = now + chrono::Duration::seconds(10);
    let second = q.try_lease(WorkerId::from("w2"), later, chrono::Duration::seconds(30)).await.unwrap();
    assert!(second.is_some(), "expired lease must become leasable again");
}

#[tokio::test]
async fn refresh_lease_fails_with_stale_lease_id() {
    let q = queue();
    let token = Token::new();
    let config = JobConfig::for_test(token.clone(), serde_json::json!({}));
    let now = Utc::now();
    q.submit(config, now).await.unwrap();
    let acquired = q.try_lease(WorkerId::from("w1"), now, chrono::Duration::seconds(30)).await.unwrap().unwrap();

    let stale_id = orchestra_core::LeaseId::new();
    let err = q.refresh_lease(&token, stale_id, now, chrono::Duration::seconds(30)).await.unwrap_err();
    assert!(matches!(err, OrchestraError::LeaseLost(_)));

    q.refresh_lease(&token, acquired.lease.id, now, chrono::Duration::seconds(30)).await.unwrap();
}

#[tokio::test]
async fn requeue_bumps_count_and_becomes_leasable() {
    let q = queue();
    let token = Token::new();
    let config = JobConfig::for_test(token.clone(), serde_json::json!({}));
    let now = Utc::now();
    q.submit(config.clone(), now).await.unwrap();
    q.try_lease(WorkerId::from("w1"), now, chrono::Duration::seconds(30)).await.unwrap().unwrap();

    q.requeue(&token, config, now).await.unwrap();
    let record = q.read(&token).await.unwrap().unwrap();
    assert_eq!(record.entry.requeue_count, 1);
    assert!(record.entry.is_leasable(now));
}
