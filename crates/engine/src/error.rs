// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the admission engine

use rc_core::{ConstraintError, ConstraintId, ConsumerId, UnitKey};
use rc_storage::LedgerError;
use thiserror::Error;

/// Errors that can occur in the admission engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("constraint not found: {0}")]
    ConstraintNotFound(ConstraintId),
    #[error("demand of {permits} permits can never be satisfied (capacity {capacity})")]
    InvalidDemand { permits: u32, capacity: u32 },
    #[error("invalid constraint: {0}")]
    InvalidConstraint(ConstraintError),
    #[error("consumer not found: {0}")]
    ConsumerNotFound(ConsumerId),
    #[error("gave up on {key} after {attempts} conflicting attempts")]
    ConflictExceeded { key: UnitKey, attempts: u32 },
    #[error("inconsistent state for consumer {consumer_id}: {detail}")]
    InconsistentState {
        consumer_id: ConsumerId,
        detail: String,
    },
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl EngineError {
    /// Whether the caller may retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::ConflictExceeded { .. } | EngineError::Ledger(LedgerError::Io(_))
        )
    }
}

impl From<ConstraintError> for EngineError {
    fn from(err: ConstraintError) -> Self {
        match err {
            ConstraintError::InvalidDemand { permits, capacity } => {
                EngineError::InvalidDemand { permits, capacity }
            }
            other => EngineError::InvalidConstraint(other),
        }
    }
}
