// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolver for hosts that cannot report scope liveness.

use super::{ScopeError, ScopeResolver, ScopeStatus};
use async_trait::async_trait;
use rc_core::HoldingScope;

/// Resolver that reports every scope as running.
///
/// Recovery then relies on `max_hold` alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpScopeResolver;

impl NoOpScopeResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ScopeResolver for NoOpScopeResolver {
    async fn status(&self, _scope: &HoldingScope) -> Result<ScopeStatus, ScopeError> {
        Ok(ScopeStatus::Running)
    }
}
