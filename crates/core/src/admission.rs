// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission state machine for one resource unit
//!
//! `UnitQueue` holds the runnable (non-terminal) consumers of a single
//! `(constraint, resource unit)` pair, ordered by FIFO position. All
//! decisions are pure: a transition returns the next queue plus the ledger
//! writes and events it implies. The caller is responsible for committing
//! the writes atomically against the version the queue was loaded at.

use crate::clock::Clock;
use crate::consumer::{AcquireMode, Consumer, ConsumerState, HoldingScope};
use crate::effect::{Effect, Event, LedgerWrite};
use crate::id::{ClaimantId, ConsumerId, UnitKey};

/// A request for permits, before a FIFO position has been assigned
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Claim {
    /// Id the new consumer will get, fixed up front so retries reuse it
    pub consumer_id: ConsumerId,
    pub claimant_id: ClaimantId,
    pub permits: u32,
    pub acquire_mode: AcquireMode,
    pub holding_scope: HoldingScope,
}

/// Outcome of evaluating a claim against the current queue
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// The claimant already holds a runnable consumer; it is reused unchanged
    Existing(ConsumerId),
    /// `Ensure` demand already satisfied by the scope's active consumers;
    /// the claimant gets its own zero-permit consumer, the id names a holder
    Covered(ConsumerId),
    /// A new consumer is admitted immediately
    Admit { permits: u32 },
    /// A new consumer must wait behind the queue
    Block { permits: u32 },
}

/// Inputs that trigger queue transitions
#[derive(Clone, Debug)]
pub enum UnitInput {
    /// Register a claim (idempotent per claimant)
    Enqueue(Claim),
    /// Release a consumer: active ones finish, blocked ones are rejected
    Finish { consumer_id: ConsumerId },
    /// Release a consumer whose claimant is gone
    Reclaim {
        consumer_id: ConsumerId,
        reason: String,
    },
    /// Promote blocked consumers that now fit
    Sweep,
}

/// Runnable consumers of one resource unit, in FIFO order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitQueue {
    pub key: UnitKey,
    pub capacity: u32,
    /// Order the next inserted consumer receives
    pub next_order: u64,
    consumers: Vec<Consumer>,
}

impl UnitQueue {
    /// Build a queue from ledger state; terminal consumers are dropped
    pub fn new(key: UnitKey, capacity: u32, next_order: u64, consumers: Vec<Consumer>) -> Self {
        let mut consumers: Vec<Consumer> = consumers
            .into_iter()
            .filter(|c| !c.is_terminal() && c.key() == key)
            .collect();
        consumers.sort_by_key(|c| c.order);

        let after_last = consumers.last().map(|c| c.order + 1).unwrap_or(1);
        Self {
            key,
            capacity,
            next_order: next_order.max(after_last),
            consumers,
        }
    }

    pub fn consumers(&self) -> &[Consumer] {
        &self.consumers
    }

    pub fn get(&self, consumer_id: &ConsumerId) -> Option<&Consumer> {
        self.consumers.iter().find(|c| &c.id == consumer_id)
    }

    pub fn active(&self) -> impl Iterator<Item = &Consumer> {
        self.consumers.iter().filter(|c| c.is_active())
    }

    pub fn blocked(&self) -> impl Iterator<Item = &Consumer> {
        self.consumers.iter().filter(|c| c.is_blocked())
    }

    /// Sum of permits held by active consumers
    pub fn active_permits(&self) -> u32 {
        self.active().map(|c| c.permits).sum()
    }

    pub fn available_permits(&self) -> u32 {
        self.capacity.saturating_sub(self.active_permits())
    }

    /// Number of blocked consumers
    pub fn queue_depth(&self) -> usize {
        self.blocked().count()
    }

    /// The blocked consumer with the smallest order
    pub fn head_of_line(&self) -> Option<&Consumer> {
        self.blocked().next()
    }

    /// The runnable consumer owned by a claimant, if any
    pub fn claim_of(&self, claimant_id: &ClaimantId) -> Option<&Consumer> {
        self.consumers.iter().find(|c| &c.claimant_id == claimant_id)
    }

    /// Permits currently held (active) by consumers of a holding scope
    pub fn scope_permits(&self, scope: &HoldingScope) -> u32 {
        self.active()
            .filter(|c| &c.holding_scope == scope)
            .map(|c| c.permits)
            .sum()
    }

    /// Evaluate a claim without changing anything
    pub fn decide(&self, claim: &Claim) -> Decision {
        if let Some(existing) = self.claim_of(&claim.claimant_id) {
            return Decision::Existing(existing.id.clone());
        }

        let permits = match claim.acquire_mode {
            AcquireMode::Accumulate => claim.permits,
            AcquireMode::Ensure => claim
                .permits
                .saturating_sub(self.scope_permits(&claim.holding_scope)),
        };

        if permits == 0 {
            if let Some(holder) = self
                .active()
                .find(|c| c.holding_scope == claim.holding_scope && c.permits > 0)
            {
                return Decision::Covered(holder.id.clone());
            }
        }
        let permits = if permits == 0 { claim.permits } else { permits };

        let fits = self.active_permits().saturating_add(permits) <= self.capacity;
        if self.queue_depth() == 0 && fits {
            Decision::Admit { permits }
        } else {
            Decision::Block { permits }
        }
    }

    /// Pure state transition function
    pub fn transition(&self, input: UnitInput, clock: &impl Clock) -> (UnitQueue, Vec<Effect>) {
        let mut next = self.clone();
        let mut effects = Vec::new();

        match input {
            UnitInput::Enqueue(claim) => {
                let decision = self.decide(&claim);
                let (state, permits) = match &decision {
                    Decision::Existing(_) => return (next, effects),
                    Decision::Covered(_) => (ConsumerState::Active, 0),
                    Decision::Admit { permits } => (ConsumerState::Active, *permits),
                    Decision::Block { permits } => (ConsumerState::Blocked, *permits),
                };

                let now = clock.now();
                let order = next.next_order;
                next.next_order += 1;

                let consumer = Consumer {
                    id: claim.consumer_id,
                    constraint_id: self.key.constraint_id.clone(),
                    resource_unit: self.key.resource_unit.clone(),
                    claimant_id: claim.claimant_id,
                    permits,
                    acquire_mode: claim.acquire_mode,
                    order,
                    state,
                    holding_scope: claim.holding_scope,
                    created_at: now,
                    acquired_at: (state == ConsumerState::Active).then_some(now),
                    finished_at: None,
                };

                effects.push(Effect::Write(LedgerWrite::Insert {
                    consumer: consumer.clone(),
                }));
                let event = match (decision, state) {
                    (Decision::Covered(holder), _) => Event::ConsumerCovered {
                        consumer_id: consumer.id.clone(),
                        claimant_id: consumer.claimant_id.clone(),
                        key: self.key.clone(),
                        order,
                        covered_by: holder,
                    },
                    (_, ConsumerState::Active) => Event::ConsumerAdmitted {
                        consumer_id: consumer.id.clone(),
                        claimant_id: consumer.claimant_id.clone(),
                        key: self.key.clone(),
                        permits,
                        order,
                    },
                    (_, _) => Event::ConsumerBlocked {
                        consumer_id: consumer.id.clone(),
                        claimant_id: consumer.claimant_id.clone(),
                        key: self.key.clone(),
                        permits,
                        order,
                        position: self.queue_depth() + 1,
                    },
                };
                effects.push(Effect::Emit(event));
                next.consumers.push(consumer);
            }

            UnitInput::Finish { consumer_id } => {
                next.release(&consumer_id, None, clock, &mut effects);
            }

            UnitInput::Reclaim {
                consumer_id,
                reason,
            } => {
                next.release(&consumer_id, Some(reason), clock, &mut effects);
            }

            UnitInput::Sweep => {
                next.sweep(clock, &mut effects);
            }
        }

        (next, effects)
    }

    /// Remove a runnable consumer and hand its permits to the queue
    fn release(
        &mut self,
        consumer_id: &ConsumerId,
        reason: Option<String>,
        clock: &impl Clock,
        effects: &mut Vec<Effect>,
    ) {
        let Some(index) = self.consumers.iter().position(|c| &c.id == consumer_id) else {
            return;
        };
        let consumer = self.consumers.remove(index);
        let Some(to) = consumer.state.released() else {
            return;
        };

        effects.push(Effect::Write(LedgerWrite::Transition {
            consumer_id: consumer.id.clone(),
            from: consumer.state,
            to,
            at: clock.now(),
        }));

        let event = match (reason, to) {
            (Some(reason), _) => Event::ConsumerReclaimed {
                consumer_id: consumer.id,
                key: self.key.clone(),
                permits: consumer.permits,
                reason,
            },
            (None, ConsumerState::Finished) => Event::ConsumerFinished {
                consumer_id: consumer.id,
                key: self.key.clone(),
                permits: consumer.permits,
            },
            (None, _) => Event::ConsumerRejected {
                consumer_id: consumer.id,
                key: self.key.clone(),
            },
        };
        effects.push(Effect::Emit(event));

        self.sweep(clock, effects);
    }

    /// Promote blocked consumers in order until the head no longer fits
    fn sweep(&mut self, clock: &impl Clock, effects: &mut Vec<Effect>) {
        let mut active = self.active_permits();
        let now = clock.now();

        for consumer in self.consumers.iter_mut().filter(|c| c.is_blocked()) {
            if active.saturating_add(consumer.permits) > self.capacity {
                break;
            }
            active += consumer.permits;
            consumer.set_state(ConsumerState::Active, now);

            effects.push(Effect::Write(LedgerWrite::Transition {
                consumer_id: consumer.id.clone(),
                from: ConsumerState::Blocked,
                to: ConsumerState::Active,
                at: now,
            }));
            effects.push(Effect::Emit(Event::ConsumerPromoted {
                consumer_id: consumer.id.clone(),
                claimant_id: consumer.claimant_id.clone(),
                key: self.key.clone(),
                permits: consumer.permits,
            }));
        }
    }
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod tests;
