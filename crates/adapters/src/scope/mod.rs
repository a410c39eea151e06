// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Holding-scope liveness adapters
//!
//! Recovery asks the host whether the plan or stage that holds a consumer is
//! still running. Anything other than `Running` makes the consumer stale.

mod noop;

pub use noop::NoOpScopeResolver;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeScopeResolver;

use async_trait::async_trait;
use rc_core::HoldingScope;
use std::fmt;
use thiserror::Error;

/// Host-reported state of a holding scope
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScopeStatus {
    Running,
    /// Finished normally but its consumers were never released
    Ended,
    /// Unknown to the host (deleted, or never existed)
    Gone,
}

impl ScopeStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ScopeStatus::Running)
    }
}

impl fmt::Display for ScopeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeStatus::Running => f.write_str("running"),
            ScopeStatus::Ended => f.write_str("ended"),
            ScopeStatus::Gone => f.write_str("gone"),
        }
    }
}

/// Errors from scope lookups
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("scope lookup failed: {0}")]
    LookupFailed(String),
}

/// Adapter answering whether a holding scope is still alive
#[async_trait]
pub trait ScopeResolver: Clone + Send + Sync + 'static {
    async fn status(&self, scope: &HoldingScope) -> Result<ScopeStatus, ScopeError>;
}
