// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only views for operators and hosts

use chrono::{DateTime, Utc};
use rc_core::{ClaimantId, ConstraintId, ConsumerId, HoldingScope, ResourceUnit, UnitKey};
use serde::Serialize;
use std::time::Duration;

/// Snapshot of one unit's queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub key: UnitKey,
    pub capacity: u32,
    pub active_permits: u32,
    pub available_permits: u32,
    pub active_consumers: usize,
    pub queue_depth: usize,
    pub head_of_line: Option<HeadOfLine>,
}

/// The blocked consumer every other waiter is queued behind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadOfLine {
    pub consumer_id: ConsumerId,
    pub claimant_id: ClaimantId,
    pub permits: u32,
    pub order: u64,
    #[serde(with = "humantime_serde")]
    pub waiting: Duration,
}

/// Who currently holds permits on a constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintUsage {
    pub constraint_id: ConstraintId,
    pub name: String,
    pub capacity: u32,
    pub active: Vec<ActiveScope>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveScope {
    pub consumer_id: ConsumerId,
    pub holding_scope: HoldingScope,
    pub resource_unit: ResourceUnit,
    pub permits: u32,
    pub acquired_at: Option<DateTime<Utc>>,
}
