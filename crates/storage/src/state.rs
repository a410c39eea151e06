// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized ledger state
//!
//! Built by applying operations in log order. Mutating helpers validate
//! first, hand the resulting operation to a `persist` callback, and only
//! apply it once the callback succeeds.

use crate::ledger::{CasResult, LedgerError, UnitSnapshot};
use crate::operation::Operation;
use rc_core::{
    AccountId, ConstraintId, Consumer, ConsumerId, HoldingScope, LedgerWrite, ResourceConstraint,
    UnitKey,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Version row of one resource unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitRow {
    pub version: u64,
    pub next_order: u64,
    /// Non-terminal consumers by order
    pub runnable: BTreeMap<u64, ConsumerId>,
}

/// Materialized state built from ledger operations
#[derive(Debug, Default)]
pub struct MaterializedState {
    pub constraints: BTreeMap<ConstraintId, ResourceConstraint>,
    pub consumers: HashMap<ConsumerId, Consumer>,
    pub units: BTreeMap<UnitKey, UnitRow>,
}

impl MaterializedState {
    /// Apply an already-validated operation
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::ConstraintCreate { constraint } => {
                self.constraints
                    .insert(constraint.id.clone(), constraint.clone());
            }

            Operation::ConstraintDelete { id } => {
                self.constraints.remove(id);
            }

            Operation::UnitCommit {
                key,
                version,
                writes,
            } => {
                let row = self.units.entry(key.clone()).or_default();
                row.version = *version;

                for write in writes {
                    match write {
                        LedgerWrite::Insert { consumer } => {
                            row.next_order = row.next_order.max(consumer.order + 1);
                            if !consumer.is_terminal() {
                                row.runnable.insert(consumer.order, consumer.id.clone());
                            }
                            self.consumers
                                .insert(consumer.id.clone(), consumer.clone());
                        }
                        LedgerWrite::Transition {
                            consumer_id, to, at, ..
                        } => {
                            if let Some(consumer) = self.consumers.get_mut(consumer_id) {
                                consumer.set_state(*to, *at);
                                if to.is_terminal() {
                                    row.runnable.remove(&consumer.order);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    pub fn unit_version(&self, key: &UnitKey) -> u64 {
        self.units.get(key).map(|row| row.version).unwrap_or(0)
    }

    pub fn unit_snapshot(&self, key: &UnitKey) -> UnitSnapshot {
        match self.units.get(key) {
            Some(row) => UnitSnapshot {
                key: key.clone(),
                version: row.version,
                next_order: row.next_order.max(1),
                consumers: row
                    .runnable
                    .values()
                    .filter_map(|id| self.consumers.get(id).cloned())
                    .collect(),
            },
            None => UnitSnapshot {
                key: key.clone(),
                version: 0,
                next_order: 1,
                consumers: Vec::new(),
            },
        }
    }

    pub fn runnable_consumers(&self) -> Vec<Consumer> {
        self.units
            .values()
            .flat_map(|row| row.runnable.values())
            .filter_map(|id| self.consumers.get(id).cloned())
            .collect()
    }

    pub fn scope_consumers(&self, scope: &HoldingScope) -> Vec<Consumer> {
        self.runnable_consumers()
            .into_iter()
            .filter(|c| &c.holding_scope == scope)
            .collect()
    }

    pub fn units_of(&self, constraint_id: &ConstraintId) -> Vec<UnitKey> {
        self.units
            .iter()
            .filter(|(key, row)| &key.constraint_id == constraint_id && !row.runnable.is_empty())
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn blocked_constraints(&self) -> Vec<ConstraintId> {
        let blocked: BTreeSet<ConstraintId> = self
            .runnable_consumers()
            .into_iter()
            .filter(|c| c.is_blocked())
            .map(|c| c.constraint_id)
            .collect();
        blocked.into_iter().collect()
    }

    pub fn constraints_of(&self, account_id: &AccountId) -> Vec<ResourceConstraint> {
        let mut list: Vec<_> = self
            .constraints
            .values()
            .filter(|c| &c.account_id == account_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Validate and persist a new constraint
    pub fn create_constraint(
        &mut self,
        constraint: ResourceConstraint,
        persist: impl FnOnce(&Operation) -> Result<(), LedgerError>,
    ) -> Result<(), LedgerError> {
        if constraint.name.trim().is_empty() {
            return Err(rc_core::ConstraintError::EmptyName.into());
        }
        if constraint.capacity == 0 {
            return Err(rc_core::ConstraintError::ZeroCapacity.into());
        }
        if self.constraints.contains_key(&constraint.id) {
            return Err(LedgerError::DuplicateConstraint(constraint.id));
        }
        if self
            .constraints
            .values()
            .any(|c| c.account_id == constraint.account_id && c.name == constraint.name)
        {
            return Err(LedgerError::DuplicateName {
                account_id: constraint.account_id,
                name: constraint.name,
            });
        }

        let op = Operation::ConstraintCreate { constraint };
        persist(&op)?;
        self.apply(&op);
        Ok(())
    }

    /// Delete a constraint if it belongs to `account_id`
    pub fn delete_constraint(
        &mut self,
        account_id: &AccountId,
        id: &ConstraintId,
        persist: impl FnOnce(&Operation) -> Result<(), LedgerError>,
    ) -> Result<bool, LedgerError> {
        let Some(existing) = self.constraints.get(id) else {
            return Ok(false);
        };
        if &existing.account_id != account_id {
            tracing::error!(
                constraint_id = %id,
                owner = %existing.account_id,
                requested_by = %account_id,
                "refusing to delete constraint owned by another account"
            );
            return Ok(false);
        }

        let op = Operation::ConstraintDelete { id: id.clone() };
        persist(&op)?;
        self.apply(&op);
        Ok(true)
    }

    pub fn delete_account(
        &mut self,
        account_id: &AccountId,
        mut persist: impl FnMut(&Operation) -> Result<(), LedgerError>,
    ) -> Result<usize, LedgerError> {
        let ids: Vec<ConstraintId> = self
            .constraints
            .values()
            .filter(|c| &c.account_id == account_id)
            .map(|c| c.id.clone())
            .collect();

        for id in &ids {
            let op = Operation::ConstraintDelete { id: id.clone() };
            persist(&op)?;
            self.apply(&op);
        }
        Ok(ids.len())
    }

    /// Conditionally apply a batch of writes to one unit
    pub fn commit(
        &mut self,
        key: &UnitKey,
        expected_version: u64,
        writes: Vec<LedgerWrite>,
        persist: impl FnOnce(&Operation) -> Result<(), LedgerError>,
    ) -> Result<CasResult, LedgerError> {
        let actual = self.unit_version(key);
        if actual != expected_version {
            return Ok(CasResult::VersionConflict { actual });
        }
        self.validate_writes(key, &writes)?;

        let version = expected_version + 1;
        let op = Operation::UnitCommit {
            key: key.clone(),
            version,
            writes,
        };
        persist(&op)?;
        self.apply(&op);
        Ok(CasResult::Committed { version })
    }

    /// Check a batch against the unit's current consumers
    ///
    /// Enforces fresh ids, increasing orders, one runnable claim per
    /// claimant, expected source states, and the capacity bound.
    fn validate_writes(&self, key: &UnitKey, writes: &[LedgerWrite]) -> Result<(), LedgerError> {
        let invalid = |reason: String| LedgerError::InvalidWrite {
            key: key.clone(),
            reason,
        };

        let snapshot = self.unit_snapshot(key);
        let mut next_order = snapshot.next_order;
        let mut scratch: BTreeMap<ConsumerId, Consumer> = snapshot
            .consumers
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        for write in writes {
            match write {
                LedgerWrite::Insert { consumer } => {
                    if consumer.key() != *key {
                        return Err(invalid(format!(
                            "consumer {} belongs to {}",
                            consumer.id,
                            consumer.key()
                        )));
                    }
                    if self.consumers.contains_key(&consumer.id)
                        || scratch.contains_key(&consumer.id)
                    {
                        return Err(LedgerError::DuplicateConsumer(consumer.id.clone()));
                    }
                    if consumer.order < next_order {
                        return Err(invalid(format!(
                            "order {} already allocated (next {next_order})",
                            consumer.order
                        )));
                    }
                    if scratch
                        .values()
                        .any(|c| c.claimant_id == consumer.claimant_id)
                    {
                        return Err(invalid(format!(
                            "claimant {} already holds a runnable consumer",
                            consumer.claimant_id
                        )));
                    }
                    next_order = consumer.order + 1;
                    scratch.insert(consumer.id.clone(), consumer.clone());
                }

                LedgerWrite::Transition {
                    consumer_id,
                    from,
                    to,
                    at,
                } => {
                    let consumer = scratch
                        .get_mut(consumer_id)
                        .ok_or_else(|| invalid(format!("consumer {consumer_id} is not runnable")))?;
                    if consumer.state != *from {
                        return Err(invalid(format!(
                            "consumer {consumer_id} is {}, expected {from}",
                            consumer.state
                        )));
                    }
                    consumer.set_state(*to, *at);
                    if to.is_terminal() {
                        scratch.remove(consumer_id);
                    }
                }
            }
        }

        if let Some(constraint) = self.constraints.get(&key.constraint_id) {
            let active: u32 = scratch
                .values()
                .filter(|c| c.is_active())
                .map(|c| c.permits)
                .sum();
            if active > constraint.capacity {
                return Err(invalid(format!(
                    "{active} active permits exceed capacity {}",
                    constraint.capacity
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
