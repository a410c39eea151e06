//! Acquire mode and demand validation specs

use crate::prelude::*;
use crate::prelude::assert_eq;

#[tokio::test]
async fn ensure_tops_up_scope_holdings() {
    let h = Harness::new(5).await;
    let scope = HoldingScope::plan("exec-1");
    let request = |claimant: &str, permits: u32, mode: AcquireMode| {
        AcquireRequest::new(h.constraint.clone(), "prod", claimant, permits, scope.clone())
            .with_mode(mode)
    };

    let base = h
        .engine
        .try_acquire(request("s1", 2, AcquireMode::Accumulate))
        .await
        .unwrap();
    let covered = h
        .engine
        .try_acquire(request("s2", 2, AcquireMode::Ensure))
        .await
        .unwrap();
    let top_up = h
        .engine
        .try_acquire(request("s3", 4, AcquireMode::Ensure))
        .await
        .unwrap();
    let stacked = h
        .engine
        .try_acquire(request("s4", 1, AcquireMode::Accumulate))
        .await
        .unwrap();

    assert_ne!(covered.id, base.id);
    assert_eq!(covered.permits, 0);
    assert_eq!(top_up.permits, 2);
    assert_eq!(stacked.permits, 1);

    let status = h
        .engine
        .queue_status(&h.constraint, &ResourceUnit::new("prod"))
        .await
        .unwrap();
    assert_eq!(status.active_permits, 5);
    assert_eq!(status.queue_depth, 0);

    h.engine.finish(&covered.id).await.unwrap();
    assert_eq!(h.state_of(&base).await, ConsumerState::Active);
}

#[tokio::test]
async fn impossible_demands_are_never_queued() {
    let h = Harness::new(2).await;
    for permits in [0, 3] {
        let err = h
            .engine
            .try_acquire(h.request("x", permits))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidDemand { .. }), "{err}");
    }

    let status = h
        .engine
        .queue_status(&h.constraint, &ResourceUnit::new("prod"))
        .await
        .unwrap();
    assert_eq!((status.active_consumers, status.queue_depth), (0, 0));
}

#[tokio::test]
async fn release_is_idempotent() {
    let h = Harness::new(1).await;
    let a = h.acquire("a", 1).await;
    h.acquire("b", 1).await;

    let first = h.engine.finish(&a.id).await.unwrap();
    let second = h.engine.finish(&a.id).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(h.notifier.promotions().len(), 1);
}
