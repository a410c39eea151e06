// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake scope resolver for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ScopeError, ScopeResolver, ScopeStatus};
use async_trait::async_trait;
use rc_core::HoldingScope;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeScopeState {
    statuses: HashMap<HoldingScope, ScopeStatus>,
    failing: HashSet<HoldingScope>,
    lookups: Vec<HoldingScope>,
}

/// Fake resolver; unknown scopes are running
#[derive(Clone, Default)]
pub struct FakeScopeResolver {
    inner: Arc<Mutex<FakeScopeState>>,
}

impl FakeScopeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, scope: HoldingScope, status: ScopeStatus) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .statuses
            .insert(scope, status);
    }

    /// Make lookups of `scope` fail
    pub fn fail(&self, scope: HoldingScope) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .failing
            .insert(scope);
    }

    /// Scopes looked up so far, in call order
    pub fn lookups(&self) -> Vec<HoldingScope> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .lookups
            .clone()
    }
}

#[async_trait]
impl ScopeResolver for FakeScopeResolver {
    async fn status(&self, scope: &HoldingScope) -> Result<ScopeStatus, ScopeError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.lookups.push(scope.clone());
        if inner.failing.contains(scope) {
            return Err(ScopeError::LookupFailed(format!("{scope} unavailable")));
        }
        Ok(inner
            .statuses
            .get(scope)
            .copied()
            .unwrap_or(ScopeStatus::Running))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
