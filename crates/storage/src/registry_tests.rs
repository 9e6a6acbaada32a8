// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::memory::MemoryKv;
use chrono::Utc;
use orchestra_core::{JobConfig, JobInfo, LeaseId, Progress, Token, WorkerId};

fn registry() -> Registry {
    Registry::new(Arc::new(MemoryKv::new()))
}

fn job_info(token: Token, owner: &str, now: DateTime<Utc>) -> JobInfo {
    let config = JobConfig::for_test(token, serde_json::json!({}));
    JobInfo::start("localhost", config, WorkerId::from(owner), now)
}

#[tokio::test]
async fn start_then_get_roundtrips() {
    let r = registry();
    let token = Token::new();
    let now = Utc::now();
    let info = job_info(token.clone(), "w1", now);
    let lease_id = LeaseId::new();
    r.start(info.clone(), lease_id).await.unwrap();

    let fetched = r.get(&token).await.unwrap().unwrap();
    assert_eq!(fetched.token, token);
}

#[tokio::test]
async fn write_with_wrong_lease_id_is_rejected() {
    let r = registry();
    let token = Token::new();
    let now = Utc::now();
    let info = job_info(token.clone(), "w1", now);
    let lease_id = LeaseId::new();
    r.start(info.clone(), lease_id).await.unwrap();

    let mut updated = info.clone();
    updated.apply_progress(Progress::running(50, "halfway"), now);
    let err = r.write(updated, LeaseId::new()).await.unwrap_err();
    assert!(matches!(err, OrchestraError::LeaseLost(_)));
}

#[tokio::test]
async fn write_with_matching_lease_id_succeeds() {
    let r = registry();
    let token = Token::new();
    let now = Utc::now();
    let info = job_info(token.clone(), "w1", now);
    let lease_id = LeaseId::new();
    r.start(info.clone(), lease_id).await.unwrap();

    let mut updated = info;
    updated.apply_progress(Progress::running(50, "halfway"), now);
    r.write(updated, lease_id).await.unwrap();

    let fetched = r.get(&token).await.unwrap().unwrap();
    assert_eq!(fetched.progress.numeric, 50);
}

#[tokio::test]
async fn force_abort_is_idempotent_and_bypasses_lease() {
    let r = registry();
    let token = Token::new();
    let now = Utc::now();
    let info = job_info(token.clone(), "w1", now);
    r.start(info, LeaseId::new()).await.unwrap();

    r.force_abort(&token, "stop", now).await.unwrap();
    r.force_abort(&token, "stop again", now).await.unwrap();

    let fetched = r.get(&token).await.unwrap().unwrap();
    assert!(fetched.status.is_terminal());
}

#[tokio::test]
async fn force_abort_on_unknown_token_errors() {
    let r = registry();
    let err = r.force_abort(&Token::new(), "stop", Utc::now()).await.unwrap_err();
    assert!(matches!(err, OrchestraError::UnknownToken(_)));
}
