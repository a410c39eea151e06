//! FIFO admission specs
//!
//! Capacity is never exceeded and waiters are admitted strictly in arrival
//! order, even when a later small request would fit.

use crate::prelude::*;
use crate::prelude::assert_eq;
use ConsumerState::{Active, Blocked, Finished, Rejected};

#[tokio::test]
async fn capacity_one_admits_one_at_a_time() {
    let h = Harness::new(1).await;
    let a = h.acquire("a", 1).await;
    let b = h.acquire("b", 1).await;
    let c = h.acquire("c", 1).await;
    assert_eq!(h.states(&[&a, &b, &c]).await, vec![Active, Blocked, Blocked]);

    h.engine.finish(&a.id).await.unwrap();
    assert_eq!(h.states(&[&a, &b, &c]).await, vec![Finished, Active, Blocked]);

    h.engine.finish(&b.id).await.unwrap();
    assert_eq!(h.states(&[&a, &b, &c]).await, vec![Finished, Finished, Active]);
    assert_eq!(h.notifier.promoted_ids(), vec![b.id.clone(), c.id.clone()]);
}

#[tokio::test]
async fn small_request_waits_behind_large_head() {
    let h = Harness::new(3).await;
    let holder = h.acquire("holder", 2).await;
    let large = h.acquire("large", 3).await;
    let small = h.acquire("small", 1).await;
    assert_eq!(h.states(&[&holder, &large, &small]).await, vec![Active, Blocked, Blocked]);

    h.engine.finish(&holder.id).await.unwrap();
    assert_eq!(h.states(&[&large, &small]).await, vec![Active, Blocked]);

    h.engine.finish(&large.id).await.unwrap();
    assert_eq!(h.state_of(&small).await, Active);
}

#[tokio::test]
async fn withdrawn_head_unblocks_the_rest() {
    let h = Harness::new(2).await;
    let holder = h.acquire("holder", 1).await;
    let large = h.acquire("large", 2).await;
    let small = h.acquire("small", 1).await;

    let withdrawn = h.engine.finish(&large.id).await.unwrap();
    assert_eq!(withdrawn.state, Rejected);
    assert_eq!(h.states(&[&holder, &small]).await, vec![Active, Active]);
}

#[tokio::test]
async fn units_are_independent() {
    let h = Harness::new(1).await;
    let on_prod = h.acquire("a", 1).await;
    let on_stage = h
        .engine
        .try_acquire(AcquireRequest::new(
            h.constraint.clone(),
            "staging",
            "b",
            1,
            HoldingScope::plan("exec-b"),
        ))
        .await
        .unwrap();
    assert_eq!(h.states(&[&on_prod, &on_stage]).await, vec![Active, Active]);
}

#[tokio::test]
async fn step_suspends_and_resumes_on_promotion() {
    let h = Harness::new(1).await;
    let steps = StepAdapter::new(h.engine.clone());

    let AcquireResult::Admitted { consumer_id: holder } =
        steps.on_enter(h.request("a", 1)).await.unwrap()
    else {
        panic!("first step should be admitted");
    };
    let AcquireResult::Suspended(handle) = steps.on_enter(h.request("b", 1)).await.unwrap() else {
        panic!("second step should suspend");
    };

    steps.on_finish_scope(&holder).await.unwrap();
    let promoted = h.notifier.promotions();
    assert_eq!(promoted.len(), 1);
    assert_eq!(promoted[0].claimant_id, handle.claimant_id);

    let resumed = steps.on_resume(&handle.consumer_id).await.unwrap();
    assert!(matches!(resumed, ResumeResult::Resumed(c) if c.state == Active));
}
