// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step adapter: the contract a host step honors around admission
//!
//! A step enters, is either admitted or suspended, and is resumed after a
//! promotion. Suspension holds no thread; the host keeps the handle and
//! calls `on_resume` when notified (or when it decides to poll).

use crate::engine::{AcquireRequest, AdmissionEngine};
use crate::error::EngineError;
use rc_adapters::PromotionNotifier;
use rc_core::{ClaimantId, Clock, Consumer, ConsumerId, ConsumerState, HoldingScope, IdGen, UnitKey};
use rc_storage::Ledger;

/// What a suspended step keeps until it is resumed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspendHandle {
    pub consumer_id: ConsumerId,
    pub claimant_id: ClaimantId,
    pub key: UnitKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireResult {
    /// Permits are held; the step may proceed
    Admitted { consumer_id: ConsumerId },
    /// The step must wait for a promotion
    Suspended(SuspendHandle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeResult {
    Resumed(Consumer),
    /// Spurious or duplicate wakeup; keep waiting
    StillBlocked,
}

pub struct StepAdapter<L, N, C: Clock, I: IdGen> {
    engine: AdmissionEngine<L, N, C, I>,
}

impl<L, N, C, I> StepAdapter<L, N, C, I>
where
    L: Ledger,
    N: PromotionNotifier,
    C: Clock,
    I: IdGen,
{
    pub fn new(engine: AdmissionEngine<L, N, C, I>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &AdmissionEngine<L, N, C, I> {
        &self.engine
    }

    /// Acquire on step entry
    ///
    /// Re-entering with the same claimant returns the same consumer.
    pub async fn on_enter(&self, request: AcquireRequest) -> Result<AcquireResult, EngineError> {
        let consumer = self.engine.try_acquire(request).await?;
        match consumer.state {
            ConsumerState::Active => Ok(AcquireResult::Admitted {
                consumer_id: consumer.id,
            }),
            ConsumerState::Blocked => Ok(AcquireResult::Suspended(SuspendHandle {
                key: consumer.key(),
                consumer_id: consumer.id,
                claimant_id: consumer.claimant_id,
            })),
            state @ (ConsumerState::Finished | ConsumerState::Rejected) => {
                tracing::error!(
                    consumer_id = %consumer.id,
                    %state,
                    "acquire returned a released consumer"
                );
                Err(EngineError::InconsistentState {
                    consumer_id: consumer.id,
                    detail: format!("acquire returned a {state} consumer"),
                })
            }
        }
    }

    /// Re-read the consumer after a wakeup
    ///
    /// A released consumer cannot be resumed; that is reported, never
    /// treated as admission.
    pub async fn on_resume(&self, consumer_id: &ConsumerId) -> Result<ResumeResult, EngineError> {
        let consumer = self.engine.consumer(consumer_id).await?;
        match consumer.state {
            ConsumerState::Active => {
                tracing::info!(%consumer_id, "step resumed");
                Ok(ResumeResult::Resumed(consumer))
            }
            ConsumerState::Blocked => {
                tracing::debug!(%consumer_id, "still blocked");
                Ok(ResumeResult::StillBlocked)
            }
            state @ (ConsumerState::Finished | ConsumerState::Rejected) => {
                tracing::error!(%consumer_id, %state, "resume of released consumer");
                Err(EngineError::InconsistentState {
                    consumer_id: consumer_id.clone(),
                    detail: format!("cannot resume a {state} consumer"),
                })
            }
        }
    }

    /// Step cancelled or failed
    pub async fn on_abort(&self, consumer_id: &ConsumerId) -> Result<Consumer, EngineError> {
        self.engine.finish(consumer_id).await
    }

    /// Holding scope of the step completed
    pub async fn on_finish_scope(&self, consumer_id: &ConsumerId) -> Result<Consumer, EngineError> {
        self.engine.finish(consumer_id).await
    }

    /// Release everything a plan or stage still holds
    pub async fn on_scope_end(&self, scope: &HoldingScope) -> Result<usize, EngineError> {
        self.engine.finish_scope(scope).await
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
