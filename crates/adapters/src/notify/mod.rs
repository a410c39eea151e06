// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Promotion notification adapters
//!
//! Delivery is fire-and-forget and at-least-once. A receiver must re-read
//! the consumer before acting on a promotion.

mod channel;
mod noop;
mod outbox;

pub use channel::ChannelNotifier;
pub use noop::NoOpNotifier;
pub use outbox::{OutboxNotifier, OutboxRecord};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeNotifier;

use async_trait::async_trait;
use rc_core::Promotion;
use thiserror::Error;

/// Errors from notification delivery
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("receiver closed")]
    Closed,
    #[error("delivery failed: {0}")]
    Failed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Adapter that tells a suspended claimant it has been admitted
#[async_trait]
pub trait PromotionNotifier: Clone + Send + Sync + 'static {
    async fn notify(&self, promotion: &Promotion) -> Result<(), NotifyError>;
}
