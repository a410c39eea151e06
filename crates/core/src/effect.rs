// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects and events produced by admission transitions

use crate::consumer::{Consumer, ConsumerState};
use crate::id::{ClaimantId, ConsumerId, UnitKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Effects are side effects that the admission state machine requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Persist a ledger change (committed atomically with its siblings)
    Write(LedgerWrite),
    /// Emit an event for other components to observe
    Emit(Event),
}

/// A single conditional change to a unit's consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerWrite {
    /// Create a consumer; its order must be the unit's next order
    Insert { consumer: Consumer },
    /// Move a consumer from `from` to `to`; fails if it is no longer in `from`
    Transition {
        consumer_id: ConsumerId,
        from: ConsumerState,
        to: ConsumerState,
        at: DateTime<Utc>,
    },
}

impl LedgerWrite {
    pub fn consumer_id(&self) -> &ConsumerId {
        match self {
            LedgerWrite::Insert { consumer } => &consumer.id,
            LedgerWrite::Transition { consumer_id, .. } => consumer_id,
        }
    }
}

/// Signal that a blocked consumer has been admitted
///
/// Delivered at-least-once; receivers must re-read consumer state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub consumer_id: ConsumerId,
    pub claimant_id: ClaimantId,
    pub key: UnitKey,
}

/// Events emitted by admission transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    ConsumerAdmitted {
        consumer_id: ConsumerId,
        claimant_id: ClaimantId,
        key: UnitKey,
        permits: u32,
        order: u64,
    },
    /// Admitted without permits; the scope's holdings already cover it
    ConsumerCovered {
        consumer_id: ConsumerId,
        claimant_id: ClaimantId,
        key: UnitKey,
        order: u64,
        covered_by: ConsumerId,
    },
    ConsumerBlocked {
        consumer_id: ConsumerId,
        claimant_id: ClaimantId,
        key: UnitKey,
        permits: u32,
        order: u64,
        /// 1-based position among blocked consumers of the unit
        position: usize,
    },
    ConsumerPromoted {
        consumer_id: ConsumerId,
        claimant_id: ClaimantId,
        key: UnitKey,
        permits: u32,
    },
    ConsumerFinished {
        consumer_id: ConsumerId,
        key: UnitKey,
        permits: u32,
    },
    ConsumerRejected {
        consumer_id: ConsumerId,
        key: UnitKey,
    },
    ConsumerReclaimed {
        consumer_id: ConsumerId,
        key: UnitKey,
        permits: u32,
        reason: String,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ConsumerAdmitted { .. } => "consumer:admitted",
            Event::ConsumerCovered { .. } => "consumer:covered",
            Event::ConsumerBlocked { .. } => "consumer:blocked",
            Event::ConsumerPromoted { .. } => "consumer:promoted",
            Event::ConsumerFinished { .. } => "consumer:finished",
            Event::ConsumerRejected { .. } => "consumer:rejected",
            Event::ConsumerReclaimed { .. } => "consumer:reclaimed",
        }
    }

    pub fn consumer_id(&self) -> &ConsumerId {
        match self {
            Event::ConsumerAdmitted { consumer_id, .. }
            | Event::ConsumerCovered { consumer_id, .. }
            | Event::ConsumerBlocked { consumer_id, .. }
            | Event::ConsumerPromoted { consumer_id, .. }
            | Event::ConsumerFinished { consumer_id, .. }
            | Event::ConsumerRejected { consumer_id, .. }
            | Event::ConsumerReclaimed { consumer_id, .. } => consumer_id,
        }
    }

    pub fn promotion(&self) -> Option<Promotion> {
        match self {
            Event::ConsumerPromoted {
                consumer_id,
                claimant_id,
                key,
                ..
            } => Some(Promotion {
                consumer_id: consumer_id.clone(),
                claimant_id: claimant_id.clone(),
                key: key.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;
