// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transactional driver for unit admission
//!
//! Every mutation follows the same loop: load the unit snapshot, run the
//! pure `UnitQueue` transition, commit the resulting writes conditioned on
//! the snapshot version, and retry from a fresh read on conflict. Events are
//! only emitted after a successful commit.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::status::{ActiveScope, ConstraintUsage, HeadOfLine, QueueStatus};
use rc_adapters::PromotionNotifier;
use rc_core::{
    elapsed, AccountId, AcquireMode, Claim, ClaimantId, Clock, ConstraintId, ConstraintSpec,
    Consumer, ConsumerId, Decision, Effect, Event, HoldingScope, IdGen, LedgerWrite,
    ResourceConstraint, ResourceUnit, UnitInput, UnitKey, UnitQueue,
};
use rc_storage::{CasResult, Ledger};

/// Request to claim permits on one resource unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireRequest {
    pub constraint_id: ConstraintId,
    pub resource_unit: ResourceUnit,
    pub claimant_id: ClaimantId,
    pub permits: u32,
    pub acquire_mode: AcquireMode,
    pub holding_scope: HoldingScope,
}

impl AcquireRequest {
    pub fn new(
        constraint_id: impl Into<ConstraintId>,
        resource_unit: impl Into<ResourceUnit>,
        claimant_id: impl Into<ClaimantId>,
        permits: u32,
        holding_scope: HoldingScope,
    ) -> Self {
        Self {
            constraint_id: constraint_id.into(),
            resource_unit: resource_unit.into(),
            claimant_id: claimant_id.into(),
            permits,
            acquire_mode: AcquireMode::Accumulate,
            holding_scope,
        }
    }

    pub fn with_mode(mut self, acquire_mode: AcquireMode) -> Self {
        self.acquire_mode = acquire_mode;
        self
    }

    pub fn key(&self) -> UnitKey {
        UnitKey {
            constraint_id: self.constraint_id.clone(),
            resource_unit: self.resource_unit.clone(),
        }
    }
}

/// Result of releasing a consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// The consumer as stored after the release
    pub consumer: Consumer,
    /// False when the consumer was already terminal
    pub released: bool,
    /// Consumers promoted by the sweep that followed
    pub promoted: Vec<ConsumerId>,
}

/// Engine adapter dependencies
pub struct EngineDeps<L, N> {
    pub ledger: L,
    pub notifier: N,
}

/// Outcome of one committed (or no-op) transition
struct Applied {
    before: UnitQueue,
    after: UnitQueue,
    effects: Vec<Effect>,
}

impl Applied {
    fn promoted(&self) -> Vec<ConsumerId> {
        self.effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Emit(event) => event.promotion().map(|p| p.consumer_id),
                Effect::Write(_) => None,
            })
            .collect()
    }
}

/// Admission engine over a shared ledger
///
/// Holds no admission state of its own; any number of engines (in one
/// process or many) may share a ledger.
#[derive(Clone)]
pub struct AdmissionEngine<L, N, C: Clock, I: IdGen> {
    ledger: L,
    notifier: N,
    clock: C,
    id_gen: I,
    config: EngineConfig,
}

impl<L, N, C, I> AdmissionEngine<L, N, C, I>
where
    L: Ledger,
    N: PromotionNotifier,
    C: Clock,
    I: IdGen,
{
    pub fn new(deps: EngineDeps<L, N>, clock: C, id_gen: I, config: EngineConfig) -> Self {
        Self {
            ledger: deps.ledger,
            notifier: deps.notifier,
            clock,
            id_gen,
            config,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -- constraints --------------------------------------------------------

    pub async fn create_constraint(
        &self,
        spec: ConstraintSpec,
    ) -> Result<ResourceConstraint, EngineError> {
        spec.validate()?;
        let constraint = ResourceConstraint::new(self.id_gen.constraint_id(), spec, self.clock.now());
        self.ledger.create_constraint(constraint.clone()).await?;
        tracing::info!(
            constraint_id = %constraint.id,
            name = %constraint.name,
            capacity = constraint.capacity,
            "constraint created"
        );
        Ok(constraint)
    }

    pub async fn get_constraint(&self, id: &ConstraintId) -> Result<ResourceConstraint, EngineError> {
        self.ledger
            .get_constraint(id)
            .await?
            .ok_or_else(|| EngineError::ConstraintNotFound(id.clone()))
    }

    pub async fn list_constraints(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<ResourceConstraint>, EngineError> {
        Ok(self.ledger.list_constraints(account_id).await?)
    }

    pub async fn delete_constraint(
        &self,
        account_id: &AccountId,
        id: &ConstraintId,
    ) -> Result<bool, EngineError> {
        Ok(self.ledger.delete_constraint(account_id, id).await?)
    }

    pub async fn delete_account(&self, account_id: &AccountId) -> Result<usize, EngineError> {
        Ok(self.ledger.delete_account(account_id).await?)
    }

    // -- admission ----------------------------------------------------------

    /// Claim permits for a claimant, or return its existing claim
    ///
    /// The returned consumer is `Active` when admitted and `Blocked` when it
    /// must wait; in both cases the state is already committed.
    pub async fn try_acquire(&self, request: AcquireRequest) -> Result<Consumer, EngineError> {
        let constraint = self.get_constraint(&request.constraint_id).await?;
        constraint.check_demand(request.permits)?;

        let key = request.key();
        let claim = Claim {
            consumer_id: self.id_gen.consumer_id(),
            claimant_id: request.claimant_id,
            permits: request.permits,
            acquire_mode: request.acquire_mode,
            holding_scope: request.holding_scope,
        };

        let applied = self
            .apply(&key, constraint.capacity, UnitInput::Enqueue(claim.clone()))
            .await?;

        let (consumer_id, queue) = match applied.before.decide(&claim) {
            Decision::Existing(id) => {
                tracing::info!(
                    %key,
                    consumer_id = %id,
                    claimant_id = %claim.claimant_id,
                    "existing claim reused"
                );
                (id, &applied.before)
            }
            // Covered claims get their own zero-permit consumer
            Decision::Covered(_) | Decision::Admit { .. } | Decision::Block { .. } => {
                (claim.consumer_id, &applied.after)
            }
        };

        queue
            .get(&consumer_id)
            .cloned()
            .ok_or_else(|| EngineError::InconsistentState {
                consumer_id,
                detail: format!("claim missing from {key} after commit"),
            })
    }

    /// Release a consumer: active ones finish, blocked ones are rejected
    ///
    /// Releasing a terminal consumer is a no-op that returns it unchanged.
    pub async fn finish(&self, consumer_id: &ConsumerId) -> Result<Consumer, EngineError> {
        let release = self
            .release(consumer_id, |consumer_id| UnitInput::Finish { consumer_id })
            .await?;
        Ok(release.consumer)
    }

    /// Release a consumer on behalf of recovery
    pub async fn reclaim(
        &self,
        consumer_id: &ConsumerId,
        reason: &str,
    ) -> Result<Release, EngineError> {
        self.release(consumer_id, |consumer_id| UnitInput::Reclaim {
            consumer_id,
            reason: reason.to_string(),
        })
        .await
    }

    /// Release every runnable consumer held by a scope
    ///
    /// Blocked consumers go first so their own scope's releases never
    /// promote them. Returns how many consumers were released.
    pub async fn finish_scope(&self, scope: &HoldingScope) -> Result<usize, EngineError> {
        let mut consumers = self.ledger.scope_consumers(scope).await?;
        consumers.sort_by_key(|c| (c.is_active(), c.order));

        let mut released = 0;
        for consumer in consumers {
            let release = self
                .release(&consumer.id, |consumer_id| UnitInput::Finish { consumer_id })
                .await?;
            if release.released {
                released += 1;
            }
        }

        tracing::info!(%scope, released, "scope released");
        Ok(released)
    }

    /// Promote blocked consumers of one unit that now fit
    pub async fn sweep(
        &self,
        constraint_id: &ConstraintId,
        resource_unit: &ResourceUnit,
    ) -> Result<Vec<ConsumerId>, EngineError> {
        let constraint = self.get_constraint(constraint_id).await?;
        let key = UnitKey {
            constraint_id: constraint_id.clone(),
            resource_unit: resource_unit.clone(),
        };
        let applied = self.apply(&key, constraint.capacity, UnitInput::Sweep).await?;
        Ok(applied.promoted())
    }

    /// Sweep every unit of a constraint that has runnable consumers
    pub async fn sweep_constraint(
        &self,
        constraint_id: &ConstraintId,
    ) -> Result<Vec<ConsumerId>, EngineError> {
        let mut promoted = Vec::new();
        for key in self.ledger.units(constraint_id).await? {
            promoted.extend(self.sweep(&key.constraint_id, &key.resource_unit).await?);
        }
        Ok(promoted)
    }

    /// Constraints that currently have blocked consumers
    pub async fn blocked_constraints(&self) -> Result<Vec<ConstraintId>, EngineError> {
        Ok(self.ledger.blocked_constraints().await?)
    }

    // -- queries ------------------------------------------------------------

    pub async fn consumer(&self, consumer_id: &ConsumerId) -> Result<Consumer, EngineError> {
        self.ledger
            .get_consumer(consumer_id)
            .await?
            .ok_or_else(|| EngineError::ConsumerNotFound(consumer_id.clone()))
    }

    pub async fn queue_status(
        &self,
        constraint_id: &ConstraintId,
        resource_unit: &ResourceUnit,
    ) -> Result<QueueStatus, EngineError> {
        let constraint = self.get_constraint(constraint_id).await?;
        let key = UnitKey {
            constraint_id: constraint_id.clone(),
            resource_unit: resource_unit.clone(),
        };
        let snapshot = self.ledger.load_unit(&key).await?;
        let queue = UnitQueue::new(
            key.clone(),
            constraint.capacity,
            snapshot.next_order,
            snapshot.consumers,
        );

        let now = self.clock.now();
        let head_of_line = queue.head_of_line().map(|head| HeadOfLine {
            consumer_id: head.id.clone(),
            claimant_id: head.claimant_id.clone(),
            permits: head.permits,
            order: head.order,
            waiting: elapsed(head.created_at, now),
        });

        Ok(QueueStatus {
            key,
            capacity: constraint.capacity,
            active_permits: queue.active_permits(),
            available_permits: queue.available_permits(),
            active_consumers: queue.active().count(),
            queue_depth: queue.queue_depth(),
            head_of_line,
        })
    }

    /// Active holders of each constraint; all of the account's constraints
    /// when `constraint_ids` is empty
    pub async fn usage(
        &self,
        account_id: &AccountId,
        constraint_ids: &[ConstraintId],
    ) -> Result<Vec<ConstraintUsage>, EngineError> {
        let constraints = if constraint_ids.is_empty() {
            self.ledger.list_constraints(account_id).await?
        } else {
            let mut found = Vec::new();
            for id in constraint_ids {
                match self.ledger.get_constraint(id).await? {
                    Some(c) if &c.account_id == account_id => found.push(c),
                    Some(c) => tracing::error!(
                        constraint_id = %id,
                        owner = %c.account_id,
                        requested_by = %account_id,
                        "usage requested for constraint of another account"
                    ),
                    None => tracing::debug!(constraint_id = %id, "usage requested for unknown constraint"),
                }
            }
            found
        };

        let runnable = self.ledger.runnable_consumers().await?;
        Ok(constraints
            .into_iter()
            .map(|constraint| ConstraintUsage {
                active: runnable
                    .iter()
                    .filter(|c| c.constraint_id == constraint.id && c.is_active())
                    .map(|c| ActiveScope {
                        consumer_id: c.id.clone(),
                        holding_scope: c.holding_scope.clone(),
                        resource_unit: c.resource_unit.clone(),
                        permits: c.permits,
                        acquired_at: c.acquired_at,
                    })
                    .collect(),
                constraint_id: constraint.id,
                name: constraint.name,
                capacity: constraint.capacity,
            })
            .collect())
    }

    // -- internals ----------------------------------------------------------

    async fn release(
        &self,
        consumer_id: &ConsumerId,
        input: impl Fn(ConsumerId) -> UnitInput,
    ) -> Result<Release, EngineError> {
        let consumer = self.consumer(consumer_id).await?;
        if consumer.is_terminal() {
            tracing::debug!(%consumer_id, state = %consumer.state, "already released");
            return Ok(Release {
                consumer,
                released: false,
                promoted: Vec::new(),
            });
        }

        let capacity = match self.ledger.get_constraint(&consumer.constraint_id).await? {
            Some(constraint) => constraint.capacity,
            None => {
                // Nothing can be promoted without a capacity
                tracing::warn!(
                    %consumer_id,
                    constraint_id = %consumer.constraint_id,
                    "constraint missing, releasing without promotion"
                );
                0
            }
        };

        let applied = self
            .apply(&consumer.key(), capacity, input(consumer_id.clone()))
            .await?;
        let released = applied.effects.iter().any(|effect| {
            matches!(effect, Effect::Write(LedgerWrite::Transition { consumer_id: id, .. }) if id == consumer_id)
        });

        Ok(Release {
            consumer: self.consumer(consumer_id).await?,
            released,
            promoted: applied.promoted(),
        })
    }

    /// Run a transition against the latest unit state and commit it
    async fn apply(
        &self,
        key: &UnitKey,
        capacity: u32,
        input: UnitInput,
    ) -> Result<Applied, EngineError> {
        let attempts = self.config.retry.attempts();

        for attempt in 1..=attempts {
            let snapshot = self.ledger.load_unit(key).await?;
            let before = UnitQueue::new(
                key.clone(),
                capacity,
                snapshot.next_order,
                snapshot.consumers,
            );
            let (after, effects) = before.transition(input.clone(), &self.clock);

            let writes: Vec<LedgerWrite> = effects
                .iter()
                .filter_map(|effect| match effect {
                    Effect::Write(write) => Some(write.clone()),
                    Effect::Emit(_) => None,
                })
                .collect();
            if writes.is_empty() {
                return Ok(Applied {
                    before,
                    after,
                    effects,
                });
            }

            match self.ledger.commit(key, snapshot.version, writes).await? {
                CasResult::Committed { version } => {
                    tracing::debug!(%key, version, attempt, "unit committed");
                    self.dispatch(&effects).await;
                    return Ok(Applied {
                        before,
                        after,
                        effects,
                    });
                }
                CasResult::VersionConflict { actual } => {
                    tracing::debug!(
                        %key,
                        attempt,
                        expected = snapshot.version,
                        actual,
                        "version conflict"
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry.delay(attempt)).await;
                    }
                }
            }
        }

        tracing::warn!(%key, attempts, "conflict retries exhausted");
        Err(EngineError::ConflictExceeded {
            key: key.clone(),
            attempts,
        })
    }

    /// Log committed events and deliver promotions
    ///
    /// Delivery failures are logged only: the claimant re-reads its state on
    /// resume and recovery re-sweeps.
    async fn dispatch(&self, effects: &[Effect]) {
        for effect in effects {
            let Effect::Emit(event) = effect else {
                continue;
            };
            log_event(event);

            if let Some(promotion) = event.promotion() {
                if let Err(e) = self.notifier.notify(&promotion).await {
                    tracing::warn!(
                        consumer_id = %promotion.consumer_id,
                        error = %e,
                        "promotion notification failed"
                    );
                }
            }
        }
    }
}

fn log_event(event: &Event) {
    match event {
        Event::ConsumerAdmitted {
            consumer_id,
            claimant_id,
            key,
            permits,
            order,
        } => tracing::info!(%consumer_id, %claimant_id, %key, permits, order, "consumer admitted"),
        Event::ConsumerCovered {
            consumer_id,
            claimant_id,
            key,
            order,
            covered_by,
        } => tracing::info!(
            %consumer_id,
            %claimant_id,
            %key,
            order,
            %covered_by,
            "demand already covered by scope"
        ),
        Event::ConsumerBlocked {
            consumer_id,
            claimant_id,
            key,
            permits,
            order,
            position,
        } => tracing::info!(
            %consumer_id,
            %claimant_id,
            %key,
            permits,
            order,
            position,
            "consumer blocked"
        ),
        Event::ConsumerPromoted {
            consumer_id,
            claimant_id,
            key,
            permits,
        } => tracing::info!(%consumer_id, %claimant_id, %key, permits, "consumer promoted"),
        Event::ConsumerFinished {
            consumer_id,
            key,
            permits,
        } => tracing::info!(%consumer_id, %key, permits, "consumer finished"),
        Event::ConsumerRejected { consumer_id, key } => {
            tracing::info!(%consumer_id, %key, "consumer rejected")
        }
        Event::ConsumerReclaimed {
            consumer_id,
            key,
            permits,
            reason,
        } => tracing::warn!(%consumer_id, %key, permits, reason = %reason, "consumer reclaimed"),
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
