//! Stuck-claim recovery specs

use crate::prelude::*;
use crate::prelude::assert_eq;

fn config() -> RecoveryConfig {
    RecoveryConfig {
        interval: Duration::from_millis(10),
        max_hold: None,
        sweep_blocked: true,
    }
}

#[tokio::test]
async fn crashed_holder_is_reclaimed() {
    let h = Harness::new(1).await;
    let crashed = h.acquire("a", 1).await;
    let waiting = h.acquire("b", 1).await;

    let resolver = FakeScopeResolver::new();
    resolver.set(crashed.holding_scope.clone(), ScopeStatus::Gone);
    let report = RecoveryTask::new(resolver, config())
        .run_once(&h.engine)
        .await
        .unwrap();

    assert_eq!((report.reclaimed, report.promoted), (1, 1));
    assert_eq!(h.state_of(&crashed).await, ConsumerState::Finished);
    assert_eq!(h.notifier.promoted_ids(), vec![waiting.id]);
}

#[tokio::test]
async fn healthy_holders_survive_recovery() {
    let h = Harness::new(1).await;
    let holder = h.acquire("a", 1).await;
    let waiter = h.acquire("b", 1).await;

    let report = RecoveryTask::new(FakeScopeResolver::new(), config())
        .run_once(&h.engine)
        .await
        .unwrap();

    assert_eq!(report.reclaimed, 0);
    assert_eq!(
        h.states(&[&holder, &waiter]).await,
        vec![ConsumerState::Active, ConsumerState::Blocked]
    );
}

#[tokio::test]
async fn overdue_holder_is_reclaimed() {
    let h = Harness::new(1).await;
    let holder = h.acquire("a", 1).await;
    h.engine.clock().advance(Duration::from_secs(7200));

    let task = RecoveryTask::new(
        FakeScopeResolver::new(),
        RecoveryConfig {
            max_hold: Some(Duration::from_secs(3600)),
            ..config()
        },
    );
    task.run_once(&h.engine).await.unwrap();
    assert_eq!(h.state_of(&holder).await, ConsumerState::Finished);
}
