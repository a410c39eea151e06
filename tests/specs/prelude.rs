//! Shared harness for the specs

#![allow(dead_code)]

pub use rc_adapters::{FakeNotifier, FakeScopeResolver, ScopeStatus};
pub use rc_core::{
    AcquireMode, ConstraintId, ConstraintSpec, Consumer, ConsumerId, ConsumerState, FakeClock,
    HoldingScope, ResourceUnit, SequentialIdGen,
};
pub use rc_engine::{
    AcquireRequest, AcquireResult, AdmissionEngine, EngineConfig, EngineDeps, EngineError,
    RecoveryConfig, RecoveryTask, ResumeResult, StepAdapter,
};
pub use rc_storage::{Ledger, MemoryLedger, WalLedger};
pub use similar_asserts::assert_eq;
pub use std::time::Duration;

pub type World<L = MemoryLedger> = AdmissionEngine<L, FakeNotifier, FakeClock, SequentialIdGen>;

/// An engine plus the fakes it talks to
pub struct Harness<L: Ledger = MemoryLedger> {
    pub engine: World<L>,
    pub notifier: FakeNotifier,
    pub constraint: ConstraintId,
}

impl Harness<MemoryLedger> {
    pub async fn new(capacity: u32) -> Self {
        Self::with_ledger(MemoryLedger::new(), capacity).await
    }
}

impl<L: Ledger> Harness<L> {
    pub async fn with_ledger(ledger: L, capacity: u32) -> Self {
        let notifier = FakeNotifier::new();
        let engine = AdmissionEngine::new(
            EngineDeps {
                ledger,
                notifier: notifier.clone(),
            },
            FakeClock::new(),
            SequentialIdGen::new("c"),
            EngineConfig::default(),
        );
        let constraint = engine
            .create_constraint(ConstraintSpec::new("acct", "deploys", capacity))
            .await
            .unwrap()
            .id;
        Self {
            engine,
            notifier,
            constraint,
        }
    }

    pub fn request(&self, claimant: &str, permits: u32) -> AcquireRequest {
        AcquireRequest::new(
            self.constraint.clone(),
            "prod",
            claimant,
            permits,
            HoldingScope::plan(format!("exec-{claimant}")),
        )
    }

    pub async fn acquire(&self, claimant: &str, permits: u32) -> Consumer {
        self.engine
            .try_acquire(self.request(claimant, permits))
            .await
            .unwrap()
    }

    pub async fn state_of(&self, consumer: &Consumer) -> ConsumerState {
        self.engine.consumer(&consumer.id).await.unwrap().state
    }

    /// States of the given consumers, in order
    pub async fn states(&self, consumers: &[&Consumer]) -> Vec<ConsumerState> {
        let mut states = Vec::new();
        for consumer in consumers {
            states.push(self.state_of(consumer).await);
        }
        states
    }
}
