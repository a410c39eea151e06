// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rc-storage: Constraint and consumer ledgers

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

mod ledger;
mod memory;
mod operation;
mod state;
mod traced;
mod wal;

pub use ledger::{
    CasResult, ConstraintStore, ConsumerLedger, Ledger, LedgerError, UnitSnapshot,
};
pub use memory::MemoryLedger;
pub use operation::Operation;
pub use state::{MaterializedState, UnitRow};
pub use traced::TracedLedger;
pub use wal::{WalEntry, WalLedger};
