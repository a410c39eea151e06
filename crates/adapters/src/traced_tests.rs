// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::notify::FakeNotifier;
use crate::scope::FakeScopeResolver;
use rc_core::{ClaimantId, ConsumerId, UnitKey};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn new() -> Self {
        Self::default()
    }

    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::new();
    let logs_clone = logs.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs_clone)
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

fn promotion() -> Promotion {
    Promotion {
        consumer_id: ConsumerId::new("c-7"),
        claimant_id: ClaimantId::new("step-7"),
        key: UnitKey::new("rc-1", "cluster-a"),
    }
}

#[test]
fn traced_notifier_logs_delivery() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedNotifier::new(FakeNotifier::new());
        traced.notify(&promotion()).await
    });

    assert!(result.is_ok());
    assert!(logs.contains("notify.promotion"), "Logs:\n{}", logs);
    assert!(logs.contains("c-7"), "Logs:\n{}", logs);
    assert!(logs.contains("delivered"), "Logs:\n{}", logs);
}

#[test]
fn traced_notifier_warns_on_failure() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeNotifier::new();
        fake.set_failing(true);
        TracedNotifier::new(fake).notify(&promotion()).await
    });

    assert!(result.is_err());
    assert!(logs.contains("WARN"), "Logs:\n{}", logs);
    assert!(logs.contains("delivery failed"), "Logs:\n{}", logs);
}

#[test]
fn traced_resolver_logs_status() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeScopeResolver::new();
        let scope = HoldingScope::plan("exec-4");
        fake.set(scope.clone(), ScopeStatus::Gone);
        TracedScopeResolver::new(fake).status(&scope).await
    });

    assert_eq!(result.unwrap(), ScopeStatus::Gone);
    assert!(logs.contains("scope.status"), "Logs:\n{}", logs);
    assert!(logs.contains("gone"), "Logs:\n{}", logs);
}
