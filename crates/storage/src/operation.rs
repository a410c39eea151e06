// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operations recorded in the ledger log

use rc_core::{ConstraintId, LedgerWrite, ResourceConstraint, UnitKey};
use serde::{Deserialize, Serialize};

/// A single durable state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    ConstraintCreate {
        constraint: ResourceConstraint,
    },
    ConstraintDelete {
        id: ConstraintId,
    },
    /// A validated batch of writes that moved `key` to `version`
    UnitCommit {
        key: UnitKey,
        version: u64,
        writes: Vec<LedgerWrite>,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::ConstraintCreate { .. } => "constraint:create",
            Operation::ConstraintDelete { .. } => "constraint:delete",
            Operation::UnitCommit { .. } => "unit:commit",
        }
    }
}
