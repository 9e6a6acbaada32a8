// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

#[test]
fn new_tokens_do_not_expire() {
    let t = Token::new();
    assert!(!t.expires);
    assert!(!t.is_expired(Utc::now()));
}

#[test]
fn ttl_token_expires_after_deadline() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let t = Token::with_ttl(now, Duration::seconds(30));
    assert!(!t.is_expired(now + Duration::seconds(29)));
    assert!(t.is_expired(now + Duration::seconds(30)));
    assert!(t.is_expired(now + Duration::seconds(31)));
}

#[test]
fn display_matches_bare_uuid() {
    let t = Token::new();
    assert_eq!(t.to_string(), t.value.to_string());
}

#[test]
fn roundtrips_through_json() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let t = Token::with_ttl(now, Duration::seconds(5));
    let json = serde_json::to_string(&t).unwrap();
    let back: Token = serde_json::from_str(&json).unwrap();
    assert_eq!(t, back);
}

#[test]
fn from_uuid_str_parses_valid_uuid() {
    let t = Token::new();
    let parsed = Token::from_uuid_str(&t.value.to_string()).unwrap();
    assert_eq!(parsed.value, t.value);
    assert!(!parsed.expires);
}

#[test]
fn from_uuid_str_rejects_garbage() {
    assert!(Token::from_uuid_str("not-a-uuid").is_err());
}
