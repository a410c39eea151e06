// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consumers: individual claims against a constraint's resource unit

use crate::id::{ClaimantId, ConstraintId, ConsumerId, ResourceUnit, UnitKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a consumer
///
/// `Blocked`/`Active` are runnable; `Finished`/`Rejected` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsumerState {
    Blocked,
    Active,
    Finished,
    Rejected,
}

impl ConsumerState {
    pub fn is_terminal(&self) -> bool {
        match self {
            ConsumerState::Blocked | ConsumerState::Active => false,
            ConsumerState::Finished | ConsumerState::Rejected => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumerState::Blocked => "BLOCKED",
            ConsumerState::Active => "ACTIVE",
            ConsumerState::Finished => "FINISHED",
            ConsumerState::Rejected => "REJECTED",
        }
    }

    /// Terminal state a runnable consumer moves to when it is released
    pub fn released(&self) -> Option<ConsumerState> {
        match self {
            ConsumerState::Active => Some(ConsumerState::Finished),
            ConsumerState::Blocked => Some(ConsumerState::Rejected),
            ConsumerState::Finished | ConsumerState::Rejected => None,
        }
    }
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a request interacts with permits its holding scope already holds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcquireMode {
    /// Top up: the scope must end up holding at least the requested permits
    Ensure,
    /// Stack: the request is a new claim on top of anything already held
    #[default]
    Accumulate,
}

impl fmt::Display for AcquireMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireMode::Ensure => f.write_str("ENSURE"),
            AcquireMode::Accumulate => f.write_str("ACCUMULATE"),
        }
    }
}

impl FromStr for AcquireMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ensure" => Ok(AcquireMode::Ensure),
            "accumulate" => Ok(AcquireMode::Accumulate),
            other => Err(format!("unknown acquire mode: {other}")),
        }
    }
}

/// Lifetime boundary whose end releases a consumer
///
/// Opaque to admission; interpreted by the host through a scope resolver.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HoldingScope {
    /// Released when the owning plan execution ends
    Plan { plan_execution_id: String },
    /// Released when a stage of a plan execution ends
    Stage {
        plan_execution_id: String,
        stage_execution_id: String,
    },
}

impl HoldingScope {
    pub fn plan(plan_execution_id: impl Into<String>) -> Self {
        HoldingScope::Plan {
            plan_execution_id: plan_execution_id.into(),
        }
    }

    pub fn stage(plan_execution_id: impl Into<String>, stage_execution_id: impl Into<String>) -> Self {
        HoldingScope::Stage {
            plan_execution_id: plan_execution_id.into(),
            stage_execution_id: stage_execution_id.into(),
        }
    }

    pub fn plan_execution_id(&self) -> &str {
        match self {
            HoldingScope::Plan { plan_execution_id }
            | HoldingScope::Stage {
                plan_execution_id, ..
            } => plan_execution_id,
        }
    }
}

impl fmt::Display for HoldingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoldingScope::Plan { plan_execution_id } => write!(f, "plan:{plan_execution_id}"),
            HoldingScope::Stage {
                plan_execution_id,
                stage_execution_id,
            } => write!(f, "stage:{plan_execution_id}/{stage_execution_id}"),
        }
    }
}

impl FromStr for HoldingScope {
    type Err = String;

    /// Parses `plan:<execution>` or `stage:<execution>/<stage>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("holding scope must be kind:id, got {s}"))?;
        if rest.is_empty() {
            return Err(format!("holding scope id is empty: {s}"));
        }
        match kind {
            "plan" => Ok(HoldingScope::plan(rest)),
            "stage" => match rest.split_once('/') {
                Some((plan, stage)) if !plan.is_empty() && !stage.is_empty() => {
                    Ok(HoldingScope::stage(plan, stage))
                }
                _ => Err(format!("stage scope must be stage:<plan>/<stage>, got {s}")),
            },
            other => Err(format!("unknown holding scope kind: {other}")),
        }
    }
}

/// One claim of permits against `(constraint, resource unit)`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    pub id: ConsumerId,
    pub constraint_id: ConstraintId,
    pub resource_unit: ResourceUnit,
    pub claimant_id: ClaimantId,
    /// Zero when an `Ensure` claim was covered by its scope's holdings
    pub permits: u32,
    pub acquire_mode: AcquireMode,
    /// FIFO position within the unit, strictly increasing
    pub order: u64,
    pub state: ConsumerState,
    pub holding_scope: HoldingScope,
    pub created_at: DateTime<Utc>,
    pub acquired_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Consumer {
    pub fn key(&self) -> UnitKey {
        UnitKey {
            constraint_id: self.constraint_id.clone(),
            resource_unit: self.resource_unit.clone(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_active(&self) -> bool {
        self.state == ConsumerState::Active
    }

    pub fn is_blocked(&self) -> bool {
        self.state == ConsumerState::Blocked
    }

    /// Apply a state change, stamping acquisition/finish times
    pub fn set_state(&mut self, state: ConsumerState, at: DateTime<Utc>) {
        match state {
            ConsumerState::Active => self.acquired_at = Some(at),
            ConsumerState::Finished | ConsumerState::Rejected => self.finished_at = Some(at),
            ConsumerState::Blocked => {}
        }
        self.state = state;
    }
}

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;
