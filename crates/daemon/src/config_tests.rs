// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tempfile::TempDir;
use yare::parameterized;

#[test]
fn empty_config_uses_defaults() {
    let config = DaemonConfig::parse(Path::new("config.toml"), "").unwrap();
    assert_eq!(config, DaemonConfig::default());
    assert_eq!(config.engine.retry.max_attempts, 5);
    assert_eq!(config.recovery.interval, Duration::from_secs(30));
}

#[test]
fn full_config_parses() {
    let content = r#"
        ledger_path = "/var/lib/rc/ledger.wal"
        outbox_path = "/var/lib/rc/promotions.jsonl"
        log_path = "/var/log/rc/rcd.log"

        [engine.retry]
        max_attempts = 8
        backoff = "25ms"

        [recovery]
        interval = "1m"
        max_hold = "6h"
        sweep_blocked = false
    "#;
    let config = DaemonConfig::parse(Path::new("config.toml"), content).unwrap();

    assert_eq!(config.ledger_path, Some(PathBuf::from("/var/lib/rc/ledger.wal")));
    assert_eq!(config.engine.retry.max_attempts, 8);
    assert_eq!(config.engine.retry.backoff, Duration::from_millis(25));
    assert_eq!(config.recovery.interval, Duration::from_secs(60));
    assert_eq!(config.recovery.max_hold, Some(Duration::from_secs(6 * 3600)));
    assert!(!config.recovery.sweep_blocked);
}

#[parameterized(
    unknown_field = { "ledger = \"x\"" },
    bad_duration = { "[recovery]\ninterval = \"soon\"" },
    wrong_type = { "[engine.retry]\nmax_attempts = \"five\"" },
)]
fn invalid_config_is_rejected(content: &str) {
    let err = DaemonConfig::parse(Path::new("bad.toml"), content).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "unexpected {err}");
    assert!(err.to_string().contains("bad.toml"));
}

#[test]
fn load_without_file_is_default() {
    let dir = TempDir::new().unwrap();
    let config = DaemonConfig::load(None, dir.path()).unwrap();
    assert_eq!(config, DaemonConfig::default());
}

#[test]
fn load_reads_state_dir_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE), "[recovery]\ninterval = \"5s\"\n").unwrap();

    let config = DaemonConfig::load(None, dir.path()).unwrap();
    assert_eq!(config.recovery.interval, Duration::from_secs(5));
}

#[test]
fn explicit_missing_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = DaemonConfig::load(Some(&missing), dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn paths_default_under_state_dir() {
    let paths = Paths::resolve(Path::new("/state"), &DaemonConfig::default());
    assert_eq!(paths.ledger, PathBuf::from("/state/ledger.wal"));
    assert_eq!(paths.outbox, PathBuf::from("/state/promotions.jsonl"));
    assert_eq!(paths.pid, PathBuf::from("/state/rcd.pid"));
    assert_eq!(paths.log, None);
}

#[test]
fn paths_honor_overrides() {
    let config = DaemonConfig {
        ledger_path: Some("/data/l.wal".into()),
        log_path: Some("/logs/rcd.log".into()),
        ..Default::default()
    };
    let paths = Paths::resolve(Path::new("/state"), &config);
    assert_eq!(paths.ledger, PathBuf::from("/data/l.wal"));
    assert_eq!(paths.log, Some(PathBuf::from("/logs/rcd.log")));
}
