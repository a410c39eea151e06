// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced ledger wrapper for consistent observability

use crate::ledger::{CasResult, ConstraintStore, ConsumerLedger, LedgerError, UnitSnapshot};
use async_trait::async_trait;
use rc_core::{
    AccountId, ConstraintId, Consumer, ConsumerId, HoldingScope, LedgerWrite, ResourceConstraint,
    UnitKey,
};
use tracing::Instrument;

/// Wrapper that adds tracing to any ledger
#[derive(Clone)]
pub struct TracedLedger<L> {
    inner: L,
}

impl<L> TracedLedger<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

#[async_trait]
impl<L: ConstraintStore> ConstraintStore for TracedLedger<L> {
    async fn create_constraint(&self, constraint: ResourceConstraint) -> Result<(), LedgerError> {
        let span = tracing::info_span!(
            "ledger.create_constraint",
            constraint_id = %constraint.id,
            account_id = %constraint.account_id,
        );
        async {
            let name = constraint.name.clone();
            let capacity = constraint.capacity;
            let result = self.inner.create_constraint(constraint).await;
            match &result {
                Ok(()) => tracing::info!(name = %name, capacity, "constraint created"),
                Err(e) => tracing::warn!(name = %name, error = %e, "create failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn get_constraint(
        &self,
        id: &ConstraintId,
    ) -> Result<Option<ResourceConstraint>, LedgerError> {
        self.inner
            .get_constraint(id)
            .instrument(tracing::debug_span!("ledger.get_constraint", constraint_id = %id))
            .await
    }

    async fn list_constraints(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<ResourceConstraint>, LedgerError> {
        self.inner
            .list_constraints(account_id)
            .instrument(tracing::debug_span!("ledger.list_constraints", account_id = %account_id))
            .await
    }

    async fn delete_constraint(
        &self,
        account_id: &AccountId,
        id: &ConstraintId,
    ) -> Result<bool, LedgerError> {
        let span = tracing::info_span!("ledger.delete_constraint", constraint_id = %id);
        async {
            let result = self.inner.delete_constraint(account_id, id).await;
            match &result {
                Ok(true) => tracing::info!("constraint deleted"),
                Ok(false) => tracing::debug!("nothing to delete"),
                Err(e) => tracing::error!(error = %e, "delete failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn delete_account(&self, account_id: &AccountId) -> Result<usize, LedgerError> {
        let span = tracing::info_span!("ledger.delete_account", account_id = %account_id);
        async {
            let result = self.inner.delete_account(account_id).await;
            match &result {
                Ok(count) => tracing::info!(count, "account constraints deleted"),
                Err(e) => tracing::error!(error = %e, "delete failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl<L: ConsumerLedger> ConsumerLedger for TracedLedger<L> {
    async fn load_unit(&self, key: &UnitKey) -> Result<UnitSnapshot, LedgerError> {
        let span = tracing::debug_span!("ledger.load_unit", %key);
        async {
            let result = self.inner.load_unit(key).await;
            if let Ok(snapshot) = &result {
                tracing::trace!(
                    version = snapshot.version,
                    runnable = snapshot.consumers.len(),
                    "loaded"
                );
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn commit(
        &self,
        key: &UnitKey,
        expected_version: u64,
        writes: Vec<LedgerWrite>,
    ) -> Result<CasResult, LedgerError> {
        let span = tracing::debug_span!("ledger.commit", %key, expected_version);
        async {
            let count = writes.len();
            let start = std::time::Instant::now();
            let result = self.inner.commit(key, expected_version, writes).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(CasResult::Committed { version }) => {
                    tracing::debug!(version, writes = count, elapsed_ms, "committed")
                }
                Ok(CasResult::VersionConflict { actual }) => {
                    tracing::debug!(actual, elapsed_ms, "version conflict")
                }
                Err(e) => tracing::error!(error = %e, elapsed_ms, "commit failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn get_consumer(&self, id: &ConsumerId) -> Result<Option<Consumer>, LedgerError> {
        self.inner
            .get_consumer(id)
            .instrument(tracing::debug_span!("ledger.get_consumer", consumer_id = %id))
            .await
    }

    async fn runnable_consumers(&self) -> Result<Vec<Consumer>, LedgerError> {
        self.inner
            .runnable_consumers()
            .instrument(tracing::debug_span!("ledger.runnable_consumers"))
            .await
    }

    async fn scope_consumers(&self, scope: &HoldingScope) -> Result<Vec<Consumer>, LedgerError> {
        self.inner
            .scope_consumers(scope)
            .instrument(tracing::debug_span!("ledger.scope_consumers", %scope))
            .await
    }

    async fn units(&self, constraint_id: &ConstraintId) -> Result<Vec<UnitKey>, LedgerError> {
        self.inner
            .units(constraint_id)
            .instrument(tracing::debug_span!("ledger.units", %constraint_id))
            .await
    }

    async fn blocked_constraints(&self) -> Result<Vec<ConstraintId>, LedgerError> {
        self.inner
            .blocked_constraints()
            .instrument(tracing::debug_span!("ledger.blocked_constraints"))
            .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
