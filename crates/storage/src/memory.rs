// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process ledger
//!
//! Same conditional-commit semantics as the durable ledger, without a log.
//! Clones share state, so several engines over one `MemoryLedger` contend
//! exactly like separate hosts over a shared database.

use crate::ledger::{CasResult, ConstraintStore, ConsumerLedger, LedgerError, UnitSnapshot};
use crate::operation::Operation;
use crate::state::MaterializedState;
use async_trait::async_trait;
use rc_core::{
    AccountId, ConstraintId, Consumer, ConsumerId, HoldingScope, LedgerWrite, ResourceConstraint,
    UnitKey,
};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<MaterializedState>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MaterializedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn no_log(_: &Operation) -> Result<(), LedgerError> {
    Ok(())
}

#[async_trait]
impl ConstraintStore for MemoryLedger {
    async fn create_constraint(&self, constraint: ResourceConstraint) -> Result<(), LedgerError> {
        self.state().create_constraint(constraint, no_log)
    }

    async fn get_constraint(
        &self,
        id: &ConstraintId,
    ) -> Result<Option<ResourceConstraint>, LedgerError> {
        Ok(self.state().constraints.get(id).cloned())
    }

    async fn list_constraints(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<ResourceConstraint>, LedgerError> {
        Ok(self.state().constraints_of(account_id))
    }

    async fn delete_constraint(
        &self,
        account_id: &AccountId,
        id: &ConstraintId,
    ) -> Result<bool, LedgerError> {
        self.state().delete_constraint(account_id, id, no_log)
    }

    async fn delete_account(&self, account_id: &AccountId) -> Result<usize, LedgerError> {
        self.state().delete_account(account_id, no_log)
    }
}

#[async_trait]
impl ConsumerLedger for MemoryLedger {
    async fn load_unit(&self, key: &UnitKey) -> Result<UnitSnapshot, LedgerError> {
        Ok(self.state().unit_snapshot(key))
    }

    async fn commit(
        &self,
        key: &UnitKey,
        expected_version: u64,
        writes: Vec<LedgerWrite>,
    ) -> Result<CasResult, LedgerError> {
        self.state().commit(key, expected_version, writes, no_log)
    }

    async fn get_consumer(&self, id: &ConsumerId) -> Result<Option<Consumer>, LedgerError> {
        Ok(self.state().consumers.get(id).cloned())
    }

    async fn runnable_consumers(&self) -> Result<Vec<Consumer>, LedgerError> {
        Ok(self.state().runnable_consumers())
    }

    async fn scope_consumers(&self, scope: &HoldingScope) -> Result<Vec<Consumer>, LedgerError> {
        Ok(self.state().scope_consumers(scope))
    }

    async fn units(&self, constraint_id: &ConstraintId) -> Result<Vec<UnitKey>, LedgerError> {
        Ok(self.state().units_of(constraint_id))
    }

    async fn blocked_constraints(&self) -> Result<Vec<ConstraintId>, LedgerError> {
        Ok(self.state().blocked_constraints())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
