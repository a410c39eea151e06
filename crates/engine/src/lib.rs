// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Resource constraint admission engine

mod config;
mod engine;
mod error;
mod recovery;
mod status;
mod step;

pub use config::{EngineConfig, RecoveryConfig, RetryPolicy};
pub use engine::{AcquireRequest, AdmissionEngine, EngineDeps, Release};
pub use error::EngineError;
pub use recovery::{LedgerStats, RecoveryReport, RecoveryTask};
pub use status::{ActiveScope, ConstraintUsage, HeadOfLine, QueueStatus};
pub use step::{AcquireResult, ResumeResult, StepAdapter, SuspendHandle};
