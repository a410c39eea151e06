// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource constraint definitions
//!
//! A constraint bounds how many permits may be held concurrently on each of
//! its resource units. Definitions are immutable once created.

use crate::id::{AccountId, ConstraintId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while validating a constraint or a demand against it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("constraint name must not be empty")]
    EmptyName,
    #[error("constraint capacity must be at least 1")]
    ZeroCapacity,
    #[error("demand of {permits} permits can never be satisfied (capacity {capacity})")]
    InvalidDemand { permits: u32, capacity: u32 },
}

/// Admission strategy for waiting consumers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    /// Strict head-of-line: first come, first served
    #[default]
    Fifo,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Fifo => f.write_str("FIFO"),
        }
    }
}

/// Input for creating a constraint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    pub account_id: AccountId,
    pub name: String,
    pub capacity: u32,
    #[serde(default)]
    pub strategy: Strategy,
}

impl ConstraintSpec {
    pub fn new(account_id: impl Into<AccountId>, name: impl Into<String>, capacity: u32) -> Self {
        Self {
            account_id: account_id.into(),
            name: name.into(),
            capacity,
            strategy: Strategy::Fifo,
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn validate(&self) -> Result<(), ConstraintError> {
        if self.name.trim().is_empty() {
            return Err(ConstraintError::EmptyName);
        }
        if self.capacity == 0 {
            return Err(ConstraintError::ZeroCapacity);
        }
        Ok(())
    }
}

/// A named, capacity-bounded resource
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConstraint {
    pub id: ConstraintId,
    pub account_id: AccountId,
    pub name: String,
    /// Total permits obtainable concurrently per resource unit
    pub capacity: u32,
    pub strategy: Strategy,
    pub created_at: DateTime<Utc>,
}

impl ResourceConstraint {
    pub fn new(id: ConstraintId, spec: ConstraintSpec, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            account_id: spec.account_id,
            name: spec.name,
            capacity: spec.capacity,
            strategy: spec.strategy,
            created_at,
        }
    }

    /// Reject demands that could never be admitted, so they are never queued
    pub fn check_demand(&self, permits: u32) -> Result<(), ConstraintError> {
        if permits == 0 || permits > self.capacity {
            return Err(ConstraintError::InvalidDemand {
                permits,
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "constraint_tests.rs"]
mod tests;
