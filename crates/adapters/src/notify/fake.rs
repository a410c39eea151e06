// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake promotion notifier for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{NotifyError, PromotionNotifier};
use async_trait::async_trait;
use rc_core::{ConsumerId, Promotion};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Fake notifier that records every promotion
#[derive(Clone, Default)]
pub struct FakeNotifier {
    promotions: Arc<Mutex<Vec<Promotion>>>,
    failing: Arc<AtomicBool>,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded promotions, including ones that "failed"
    pub fn promotions(&self) -> Vec<Promotion> {
        self.promotions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn promoted_ids(&self) -> Vec<ConsumerId> {
        self.promotions()
            .into_iter()
            .map(|p| p.consumer_id)
            .collect()
    }

    /// Make subsequent deliveries fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PromotionNotifier for FakeNotifier {
    async fn notify(&self, promotion: &Promotion) -> Result<(), NotifyError> {
        self.promotions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(promotion.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Failed("fake delivery failure".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
