// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::notify::{NotifyError, PromotionNotifier};
use crate::scope::{ScopeError, ScopeResolver, ScopeStatus};
use async_trait::async_trait;
use rc_core::{HoldingScope, Promotion};
use tracing::Instrument;

/// Wrapper that adds tracing to any PromotionNotifier
#[derive(Clone)]
pub struct TracedNotifier<N> {
    inner: N,
}

impl<N> TracedNotifier<N> {
    pub fn new(inner: N) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<N: PromotionNotifier> PromotionNotifier for TracedNotifier<N> {
    async fn notify(&self, promotion: &Promotion) -> Result<(), NotifyError> {
        let span = tracing::info_span!(
            "notify.promotion",
            consumer_id = %promotion.consumer_id,
            claimant_id = %promotion.claimant_id,
            key = %promotion.key,
        );
        async {
            let start = std::time::Instant::now();
            let result = self.inner.notify(promotion).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "delivered"),
                // Receivers re-read state, so a lost notification only delays resume
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "delivery failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any ScopeResolver
#[derive(Clone)]
pub struct TracedScopeResolver<S> {
    inner: S,
}

impl<S> TracedScopeResolver<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: ScopeResolver> ScopeResolver for TracedScopeResolver<S> {
    async fn status(&self, scope: &HoldingScope) -> Result<ScopeStatus, ScopeError> {
        let span = tracing::debug_span!("scope.status", %scope);
        async {
            let result = self.inner.status(scope).await;
            match &result {
                Ok(status) => tracing::debug!(%status, "resolved"),
                Err(e) => tracing::warn!(error = %e, "lookup failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
