//! Shared ledger specs
//!
//! Engines in separate processes coordinate only through the ledger file.
//! Each `WalLedger` handle owns its own file descriptor, so two handles on
//! one path stand in for two processes.

use crate::prelude::*;
use crate::prelude::assert_eq;
use rc_storage::ConsumerLedger;
use tempfile::TempDir;

#[tokio::test]
async fn two_processes_share_one_queue() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.wal");

    let one = Harness::with_ledger(WalLedger::open(&path).unwrap(), 1).await;
    let two_engine = AdmissionEngine::new(
        EngineDeps {
            ledger: WalLedger::open(&path).unwrap(),
            notifier: FakeNotifier::new(),
        },
        FakeClock::new(),
        SequentialIdGen::new("p2"),
        EngineConfig::default(),
    );

    let a = one.acquire("a", 1).await;
    let b = two_engine.try_acquire(one.request("b", 1)).await.unwrap();
    assert_eq!(b.state, ConsumerState::Blocked);
    assert_eq!(b.order, a.order + 1);

    two_engine.finish(&a.id).await.unwrap();
    assert_eq!(one.state_of(&b).await, ConsumerState::Active);
}

#[tokio::test]
async fn state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.wal");

    let (a, b) = {
        let h = Harness::with_ledger(WalLedger::open(&path).unwrap(), 1).await;
        (h.acquire("a", 1).await, h.acquire("b", 1).await)
    };

    let reopened = WalLedger::open(&path).unwrap();
    let runnable = reopened.runnable_consumers().await.unwrap();
    let ids: Vec<_> = runnable.iter().map(|c| (c.id.clone(), c.state)).collect();
    assert_eq!(
        ids,
        vec![(a.id, ConsumerState::Active), (b.id, ConsumerState::Blocked)]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_handles_never_exceed_capacity() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.wal");
    let h = Harness::with_ledger(WalLedger::open(&path).unwrap(), 2).await;

    let mut tasks = Vec::new();
    for n in 0..12 {
        let request = h.request(&format!("s{n}"), 1);
        let engine = AdmissionEngine::new(
            EngineDeps {
                ledger: WalLedger::open(&path).unwrap(),
                notifier: FakeNotifier::new(),
            },
            FakeClock::new(),
            SequentialIdGen::new(format!("w{n}")),
            EngineConfig {
                retry: rc_engine::RetryPolicy {
                    max_attempts: 100,
                    backoff: Duration::from_millis(1),
                },
            },
        );
        tasks.push(tokio::spawn(async move { engine.try_acquire(request).await }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let status = h
        .engine
        .queue_status(&h.constraint, &ResourceUnit::new("prod"))
        .await
        .unwrap();
    assert_eq!(status.active_permits, 2);
    assert_eq!(status.queue_depth, 10);
}
