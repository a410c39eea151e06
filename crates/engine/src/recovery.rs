// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stuck-claim recovery
//!
//! A claimant can vanish without releasing (crash, lost abort, deleted
//! plan). Each pass reclaims consumers whose holding scope is no longer
//! running, or that have been active longer than `max_hold`, and re-sweeps
//! units with blocked consumers so a sweep lost in a crash is redone.

use crate::config::RecoveryConfig;
use crate::engine::AdmissionEngine;
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use rc_adapters::{PromotionNotifier, ScopeResolver, ScopeStatus};
use rc_core::{elapsed, Clock, Consumer, HoldingScope, IdGen};
use rc_storage::{ConsumerLedger, Ledger};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;

/// Outcome of one recovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Runnable consumers examined
    pub scanned: usize,
    pub reclaimed: usize,
    pub promoted: usize,
    /// Lookups or releases that failed; retried on the next pass
    pub failures: usize,
}

/// Ledger summary for status output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub units: usize,
    pub active_consumers: usize,
    pub blocked_consumers: usize,
    pub active_permits: u64,
}

impl LedgerStats {
    pub async fn collect<L: ConsumerLedger>(ledger: &L) -> Result<Self, EngineError> {
        let consumers = ledger.runnable_consumers().await?;
        let units: BTreeSet<_> = consumers.iter().map(|c| c.key()).collect();
        let mut stats = LedgerStats {
            units: units.len(),
            ..Default::default()
        };
        for consumer in &consumers {
            if consumer.is_active() {
                stats.active_consumers += 1;
                stats.active_permits += u64::from(consumer.permits);
            } else if consumer.is_blocked() {
                stats.blocked_consumers += 1;
            }
        }
        Ok(stats)
    }
}

/// Periodic recovery over one engine
pub struct RecoveryTask<S> {
    resolver: S,
    config: RecoveryConfig,
}

impl<S: ScopeResolver> RecoveryTask<S> {
    pub fn new(resolver: S, config: RecoveryConfig) -> Self {
        Self { resolver, config }
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Run a single pass
    ///
    /// Per-consumer failures are counted and logged; the pass continues.
    pub async fn run_once<L, N, C, I>(
        &self,
        engine: &AdmissionEngine<L, N, C, I>,
    ) -> Result<RecoveryReport, EngineError>
    where
        L: Ledger,
        N: PromotionNotifier,
        C: Clock,
        I: IdGen,
    {
        let mut report = RecoveryReport::default();
        let mut statuses: HashMap<HoldingScope, ScopeStatus> = HashMap::new();
        let mut stale = Vec::new();
        let now = engine.clock().now();

        for consumer in engine.ledger().runnable_consumers().await? {
            report.scanned += 1;

            let status = match statuses.get(&consumer.holding_scope) {
                Some(status) => *status,
                None => match self.resolver.status(&consumer.holding_scope).await {
                    Ok(status) => {
                        statuses.insert(consumer.holding_scope.clone(), status);
                        status
                    }
                    Err(e) => {
                        tracing::warn!(
                            consumer_id = %consumer.id,
                            scope = %consumer.holding_scope,
                            error = %e,
                            "scope lookup failed"
                        );
                        report.failures += 1;
                        continue;
                    }
                },
            };

            if let Some(reason) = self.stale_reason(&consumer, status, now) {
                stale.push((consumer, reason));
            }
        }

        // Waiters go first so a stale holder's release never promotes a
        // consumer that is about to be reclaimed itself
        stale.sort_by_key(|(c, _)| (c.is_active(), c.order));

        for (consumer, reason) in stale {
            match engine.reclaim(&consumer.id, &reason).await {
                Ok(release) => {
                    if release.released {
                        report.reclaimed += 1;
                    }
                    report.promoted += release.promoted.len();
                }
                Err(e) => {
                    tracing::error!(consumer_id = %consumer.id, error = %e, "reclaim failed");
                    report.failures += 1;
                }
            }
        }

        if self.config.sweep_blocked {
            for constraint_id in engine.blocked_constraints().await? {
                match engine.sweep_constraint(&constraint_id).await {
                    Ok(promoted) => report.promoted += promoted.len(),
                    Err(e) => {
                        tracing::warn!(%constraint_id, error = %e, "sweep failed");
                        report.failures += 1;
                    }
                }
            }
        }

        tracing::info!(
            scanned = report.scanned,
            reclaimed = report.reclaimed,
            promoted = report.promoted,
            failures = report.failures,
            "recovery pass complete"
        );
        Ok(report)
    }

    /// Run passes every `interval` until `shutdown` resolves
    pub async fn run_until<L, N, C, I>(
        &self,
        engine: &AdmissionEngine<L, N, C, I>,
        shutdown: impl Future<Output = ()>,
    ) -> usize
    where
        L: Ledger,
        N: PromotionNotifier,
        C: Clock,
        I: IdGen,
    {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut passes = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    passes += 1;
                    if let Err(e) = self.run_once(engine).await {
                        tracing::error!(error = %e, "recovery pass failed");
                    }
                }
            }
        }
        tracing::info!(passes, "recovery stopped");
        passes
    }

    fn stale_reason(
        &self,
        consumer: &Consumer,
        status: ScopeStatus,
        now: DateTime<Utc>,
    ) -> Option<String> {
        if !status.is_running() {
            return Some(format!("holding scope {} {status}", consumer.holding_scope));
        }

        let max_hold = self.config.max_hold?;
        if !consumer.is_active() {
            return None;
        }
        let held = elapsed(consumer.acquired_at.unwrap_or(consumer.created_at), now);
        (held > max_hold).then(|| {
            format!(
                "held for {} (limit {})",
                humantime::format_duration(held),
                humantime::format_duration(max_hold)
            )
        })
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
