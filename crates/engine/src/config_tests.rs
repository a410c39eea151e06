// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn defaults() {
    let retry = RetryPolicy::default();
    assert_eq!(retry.max_attempts, 5);
    assert_eq!(retry.backoff, Duration::from_millis(10));

    let recovery = RecoveryConfig::default();
    assert_eq!(recovery.interval, Duration::from_secs(30));
    assert!(recovery.max_hold.is_none());
    assert!(recovery.sweep_blocked);
}

#[parameterized(
    first = { 1, 10 },
    second = { 2, 20 },
    fifth = { 5, 50 },
)]
fn backoff_is_linear(attempt: u32, expected_ms: u64) {
    let retry = RetryPolicy::default();
    assert_eq!(retry.delay(attempt), Duration::from_millis(expected_ms));
}

#[test]
fn zero_attempts_still_tries_once() {
    let retry = RetryPolicy {
        max_attempts: 0,
        ..RetryPolicy::default()
    };
    assert_eq!(retry.attempts(), 1);
}

#[test]
fn parses_humantime_durations() {
    let config: RecoveryConfig = serde_json::from_str(
        r#"{ "interval": "1m", "max_hold": "6h", "sweep_blocked": false }"#,
    )
    .unwrap();
    assert_eq!(config.interval, Duration::from_secs(60));
    assert_eq!(config.max_hold, Some(Duration::from_secs(6 * 3600)));
    assert!(!config.sweep_blocked);

    let retry: RetryPolicy = serde_json::from_str(r#"{ "backoff": "250ms" }"#).unwrap();
    assert_eq!(retry.max_attempts, 5);
    assert_eq!(retry.backoff, Duration::from_millis(250));
}
