// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use rc_core::{AcquireMode, ClaimantId, ConstraintSpec, ConsumerState};

fn consumer(n: u64) -> Consumer {
    Consumer {
        id: ConsumerId::new(format!("c-{n}")),
        constraint_id: ConstraintId::new("rc-1"),
        resource_unit: "cluster-a".into(),
        claimant_id: ClaimantId::new(format!("step-{n}")),
        permits: 1,
        acquire_mode: AcquireMode::Accumulate,
        order: n,
        state: ConsumerState::Active,
        holding_scope: HoldingScope::plan("exec"),
        created_at: Utc::now(),
        acquired_at: Some(Utc::now()),
        finished_at: None,
    }
}

#[tokio::test]
async fn clones_share_state() {
    let ledger = MemoryLedger::new();
    let other = ledger.clone();
    let constraint = ResourceConstraint::new(
        ConstraintId::new("rc-1"),
        ConstraintSpec::new("acct", "deploys", 2),
        Utc::now(),
    );

    ledger.create_constraint(constraint.clone()).await.unwrap();
    assert_eq!(
        other.get_constraint(&constraint.id).await.unwrap(),
        Some(constraint)
    );
}

#[tokio::test]
async fn racing_commits_on_same_version_admit_one() {
    let ledger = MemoryLedger::new();
    let key = UnitKey::new("rc-1", "cluster-a");

    let first = ledger
        .commit(&key, 0, vec![LedgerWrite::Insert { consumer: consumer(1) }])
        .await
        .unwrap();
    let second = ledger
        .commit(&key, 0, vec![LedgerWrite::Insert { consumer: consumer(2) }])
        .await
        .unwrap();

    assert_eq!(first, CasResult::Committed { version: 1 });
    assert_eq!(second, CasResult::VersionConflict { actual: 1 });
    assert!(ledger.get_consumer(&ConsumerId::new("c-2")).await.unwrap().is_none());
}

#[tokio::test]
async fn scope_and_unit_queries() {
    let ledger = MemoryLedger::new();
    let key = UnitKey::new("rc-1", "cluster-a");
    ledger
        .commit(&key, 0, vec![LedgerWrite::Insert { consumer: consumer(1) }])
        .await
        .unwrap();

    let held = ledger
        .scope_consumers(&HoldingScope::plan("exec"))
        .await
        .unwrap();
    assert_eq!(held.len(), 1);
    assert_eq!(
        ledger.units(&ConstraintId::new("rc-1")).await.unwrap(),
        vec![key]
    );
    assert!(ledger.blocked_constraints().await.unwrap().is_empty());
}
