// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ledger traits shared by all storage backends
//!
//! Every resource unit has a row `{version, next_order}`. Mutations are
//! submitted as a batch of writes conditioned on the version the caller
//! read; a stale version yields `CasResult::VersionConflict` and nothing is
//! written. Order allocation rides in the same batch, so orders are never
//! reused even when two writers race.

use async_trait::async_trait;
use rc_core::{
    AccountId, ConstraintError, ConstraintId, Consumer, ConsumerId, HoldingScope, LedgerWrite,
    ResourceConstraint, UnitKey,
};
use std::io;
use thiserror::Error;

/// Errors that can occur in ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("constraint name '{name}' already exists in account {account_id}")]
    DuplicateName { account_id: AccountId, name: String },
    #[error("constraint already exists: {0}")]
    DuplicateConstraint(ConstraintId),
    #[error("invalid constraint: {0}")]
    InvalidConstraint(#[from] ConstraintError),
    #[error("consumer already exists: {0}")]
    DuplicateConsumer(ConsumerId),
    #[error("write rejected on {key}: {reason}")]
    InvalidWrite { key: UnitKey, reason: String },
    #[error("corrupt ledger entry at sequence {sequence}")]
    Corrupt { sequence: u64 },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of a conditional commit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CasResult {
    /// Writes applied; the unit is now at `version`
    Committed { version: u64 },
    /// The unit moved on since it was read; nothing was written
    VersionConflict { actual: u64 },
}

impl CasResult {
    pub fn is_committed(&self) -> bool {
        matches!(self, CasResult::Committed { .. })
    }
}

/// Runnable consumers of a unit as of one version
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitSnapshot {
    pub key: UnitKey,
    /// Zero for a unit that has never been written
    pub version: u64,
    pub next_order: u64,
    /// Non-terminal consumers in ascending order
    pub consumers: Vec<Consumer>,
}

/// Constraint definitions
#[async_trait]
pub trait ConstraintStore: Send + Sync {
    /// Persist a new constraint; names are unique per account
    async fn create_constraint(&self, constraint: ResourceConstraint) -> Result<(), LedgerError>;

    async fn get_constraint(
        &self,
        id: &ConstraintId,
    ) -> Result<Option<ResourceConstraint>, LedgerError>;

    /// Constraints of an account, ordered by name
    async fn list_constraints(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<ResourceConstraint>, LedgerError>;

    /// Delete a constraint owned by `account_id`; returns whether it existed
    async fn delete_constraint(
        &self,
        account_id: &AccountId,
        id: &ConstraintId,
    ) -> Result<bool, LedgerError>;

    /// Delete every constraint of an account; returns how many were removed
    async fn delete_account(&self, account_id: &AccountId) -> Result<usize, LedgerError>;
}

/// Consumer records and per-unit versions
#[async_trait]
pub trait ConsumerLedger: Send + Sync {
    async fn load_unit(&self, key: &UnitKey) -> Result<UnitSnapshot, LedgerError>;

    /// Apply `writes` atomically if the unit is still at `expected_version`
    async fn commit(
        &self,
        key: &UnitKey,
        expected_version: u64,
        writes: Vec<LedgerWrite>,
    ) -> Result<CasResult, LedgerError>;

    /// Any consumer, terminal or not
    async fn get_consumer(&self, id: &ConsumerId) -> Result<Option<Consumer>, LedgerError>;

    /// All non-terminal consumers, grouped by unit and ordered within it
    async fn runnable_consumers(&self) -> Result<Vec<Consumer>, LedgerError>;

    /// Non-terminal consumers held by a scope
    async fn scope_consumers(&self, scope: &HoldingScope) -> Result<Vec<Consumer>, LedgerError>;

    /// Units of a constraint that have runnable consumers
    async fn units(&self, constraint_id: &ConstraintId) -> Result<Vec<UnitKey>, LedgerError>;

    /// Constraints with at least one blocked consumer
    async fn blocked_constraints(&self) -> Result<Vec<ConstraintId>, LedgerError>;
}

/// A complete backend: constraint definitions plus consumer ledger
pub trait Ledger: ConstraintStore + ConsumerLedger + Clone + 'static {}

impl<T: ConstraintStore + ConsumerLedger + Clone + 'static> Ledger for T {}
