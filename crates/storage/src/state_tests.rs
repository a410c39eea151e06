// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use rc_core::{AcquireMode, ClaimantId, ConstraintSpec, ConsumerState};
use yare::parameterized;

fn ok(_: &Operation) -> Result<(), LedgerError> {
    Ok(())
}

fn key() -> UnitKey {
    UnitKey::new("rc-1", "cluster-a")
}

fn constraint(id: &str, account: &str, name: &str, capacity: u32) -> ResourceConstraint {
    ResourceConstraint::new(
        ConstraintId::new(id),
        ConstraintSpec::new(account, name, capacity),
        Utc::now(),
    )
}

fn consumer(n: u64, permits: u32, state: ConsumerState) -> Consumer {
    Consumer {
        id: ConsumerId::new(format!("c-{n}")),
        constraint_id: ConstraintId::new("rc-1"),
        resource_unit: "cluster-a".into(),
        claimant_id: ClaimantId::new(format!("step-{n}")),
        permits,
        acquire_mode: AcquireMode::Accumulate,
        order: n,
        state,
        holding_scope: HoldingScope::plan(format!("exec-{n}")),
        created_at: Utc::now(),
        acquired_at: None,
        finished_at: None,
    }
}

fn insert(c: Consumer) -> LedgerWrite {
    LedgerWrite::Insert { consumer: c }
}

fn transition(n: u64, from: ConsumerState, to: ConsumerState) -> LedgerWrite {
    LedgerWrite::Transition {
        consumer_id: ConsumerId::new(format!("c-{n}")),
        from,
        to,
        at: Utc::now(),
    }
}

fn seeded(capacity: u32) -> MaterializedState {
    let mut state = MaterializedState::default();
    state
        .create_constraint(constraint("rc-1", "acct", "deploys", capacity), ok)
        .unwrap();
    state
        .commit(
            &key(),
            0,
            vec![
                insert(consumer(1, 1, ConsumerState::Active)),
                insert(consumer(2, 1, ConsumerState::Blocked)),
            ],
            ok,
        )
        .unwrap();
    state
}

#[test]
fn empty_unit_starts_at_version_zero() {
    let state = MaterializedState::default();
    let snapshot = state.unit_snapshot(&key());
    assert_eq!(snapshot.version, 0);
    assert_eq!(snapshot.next_order, 1);
    assert!(snapshot.consumers.is_empty());
}

#[test]
fn commit_bumps_version_and_order() {
    let state = seeded(1);
    let snapshot = state.unit_snapshot(&key());
    assert_eq!(snapshot.version, 1);
    assert_eq!(snapshot.next_order, 3);
    assert_eq!(snapshot.consumers.len(), 2);
    assert_eq!(snapshot.consumers[0].id, ConsumerId::new("c-1"));
}

#[test]
fn stale_version_conflicts_without_writing() {
    let mut state = seeded(2);
    let result = state
        .commit(&key(), 0, vec![insert(consumer(3, 1, ConsumerState::Active))], ok)
        .unwrap();

    assert_eq!(result, CasResult::VersionConflict { actual: 1 });
    assert!(!state.consumers.contains_key(&ConsumerId::new("c-3")));
}

#[test]
fn terminal_transition_leaves_runnable_index() {
    let mut state = seeded(1);
    state
        .commit(
            &key(),
            1,
            vec![
                transition(1, ConsumerState::Active, ConsumerState::Finished),
                transition(2, ConsumerState::Blocked, ConsumerState::Active),
            ],
            ok,
        )
        .unwrap();

    let snapshot = state.unit_snapshot(&key());
    assert_eq!(snapshot.consumers.len(), 1);
    assert_eq!(snapshot.consumers[0].state, ConsumerState::Active);
    assert!(snapshot.consumers[0].acquired_at.is_some());

    let finished = &state.consumers[&ConsumerId::new("c-1")];
    assert_eq!(finished.state, ConsumerState::Finished);
    assert!(finished.finished_at.is_some());
}

#[parameterized(
    reused_order = { vec![insert(Consumer { id: ConsumerId::new("c-8"), claimant_id: ClaimantId::new("step-8"), ..consumer(2, 1, ConsumerState::Blocked) })] },
    duplicate_claimant = { vec![insert(Consumer { id: ConsumerId::new("c-9"), order: 9, ..consumer(1, 1, ConsumerState::Blocked) })] },
    stale_source_state = { vec![transition(2, ConsumerState::Active, ConsumerState::Finished)] },
    unknown_consumer = { vec![transition(7, ConsumerState::Active, ConsumerState::Finished)] },
    over_capacity = { vec![transition(2, ConsumerState::Blocked, ConsumerState::Active)] },
)]
fn invalid_batches_are_rejected(writes: Vec<LedgerWrite>) {
    let mut state = seeded(1);
    let err = state.commit(&key(), 1, writes, ok).unwrap_err();
    assert!(
        matches!(err, LedgerError::InvalidWrite { .. }),
        "unexpected error: {err}"
    );
    assert_eq!(state.unit_version(&key()), 1);
}

#[test]
fn duplicate_consumer_id_is_rejected() {
    let mut state = seeded(2);
    let dup = Consumer {
        order: 5,
        claimant_id: ClaimantId::new("step-new"),
        ..consumer(1, 1, ConsumerState::Active)
    };
    let err = state.commit(&key(), 1, vec![insert(dup)], ok).unwrap_err();
    assert!(matches!(err, LedgerError::DuplicateConsumer(_)));
}

#[test]
fn insert_for_another_unit_is_rejected() {
    let mut state = seeded(2);
    let mut other = consumer(3, 1, ConsumerState::Active);
    other.resource_unit = "cluster-b".into();
    let err = state.commit(&key(), 1, vec![insert(other)], ok).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidWrite { .. }));
}

#[test]
fn failed_persist_leaves_state_untouched() {
    let mut state = seeded(2);
    let result = state.commit(
        &key(),
        1,
        vec![insert(consumer(3, 1, ConsumerState::Active))],
        |_| Err(LedgerError::Io(std::io::Error::other("disk full"))),
    );

    assert!(result.is_err());
    assert_eq!(state.unit_version(&key()), 1);
    assert!(!state.consumers.contains_key(&ConsumerId::new("c-3")));
}

#[test]
fn constraint_names_are_unique_per_account() {
    let mut state = MaterializedState::default();
    state
        .create_constraint(constraint("rc-1", "acct", "deploys", 1), ok)
        .unwrap();

    let err = state
        .create_constraint(constraint("rc-2", "acct", "deploys", 3), ok)
        .unwrap_err();
    assert!(matches!(err, LedgerError::DuplicateName { .. }));

    state
        .create_constraint(constraint("rc-3", "other", "deploys", 3), ok)
        .unwrap();
    assert_eq!(state.constraints.len(), 2);
}

#[parameterized(
    empty_name = { "  ", 1 },
    zero_capacity = { "deploys", 0 },
)]
fn invalid_constraints_are_rejected(name: &str, capacity: u32) {
    let mut state = MaterializedState::default();
    let err = state
        .create_constraint(constraint("rc-1", "acct", name, capacity), ok)
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidConstraint(_)));
}

#[test]
fn delete_refuses_foreign_account() {
    let mut state = seeded(1);
    let id = ConstraintId::new("rc-1");

    assert!(!state.delete_constraint(&AccountId::new("intruder"), &id, ok).unwrap());
    assert!(state.constraints.contains_key(&id));

    assert!(state.delete_constraint(&AccountId::new("acct"), &id, ok).unwrap());
    assert!(!state.constraints.contains_key(&id));
}

#[test]
fn delete_account_removes_only_its_constraints() {
    let mut state = MaterializedState::default();
    for (id, account, name) in [("a", "acct", "x"), ("b", "acct", "y"), ("c", "other", "x")] {
        state
            .create_constraint(constraint(id, account, name, 1), ok)
            .unwrap();
    }

    let mut logged = Vec::new();
    let removed = state
        .delete_account(&AccountId::new("acct"), |op| {
            logged.push(op.clone());
            Ok(())
        })
        .unwrap();

    assert_eq!(removed, 2);
    assert_eq!(logged.len(), 2);
    assert_eq!(state.constraints_of(&AccountId::new("other")).len(), 1);
}

#[test]
fn queries_cover_runnable_consumers() {
    let state = seeded(1);

    assert_eq!(state.blocked_constraints(), vec![ConstraintId::new("rc-1")]);
    assert_eq!(state.units_of(&ConstraintId::new("rc-1")), vec![key()]);
    assert_eq!(state.runnable_consumers().len(), 2);
    assert_eq!(state.scope_consumers(&HoldingScope::plan("exec-2")).len(), 1);
}

#[test]
fn list_is_sorted_by_name() {
    let mut state = MaterializedState::default();
    for (id, name) in [("a", "zeta"), ("b", "alpha")] {
        state
            .create_constraint(constraint(id, "acct", name, 1), ok)
            .unwrap();
    }
    let names: Vec<_> = state
        .constraints_of(&AccountId::new("acct"))
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
}
