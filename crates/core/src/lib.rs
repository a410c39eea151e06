// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rc-core: Core types for resource constraint admission
//!
//! This crate provides:
//! - Constraint and consumer data model
//! - Pure admission state machine for one resource unit
//! - Effects and events describing ledger changes
//! - Clock and id generation abstractions

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod clock;
pub mod id;

pub mod admission;
pub mod constraint;
pub mod consumer;
pub mod effect;

pub use admission::{Claim, Decision, UnitInput, UnitQueue};
pub use clock::{elapsed, Clock, FakeClock, SystemClock};
pub use constraint::{ConstraintError, ConstraintSpec, ResourceConstraint, Strategy};
pub use consumer::{AcquireMode, Consumer, ConsumerState, HoldingScope};
pub use effect::{Effect, Event, LedgerWrite, Promotion};
pub use id::{
    AccountId, ClaimantId, ConstraintId, ConsumerId, IdGen, ResourceUnit, SequentialIdGen,
    UnitKey, UuidIdGen,
};
