// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op notifier for hosts that poll instead of listening.

use super::{NotifyError, PromotionNotifier};
use async_trait::async_trait;
use rc_core::Promotion;

/// Notifier that drops every promotion.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpNotifier;

impl NoOpNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PromotionNotifier for NoOpNotifier {
    async fn notify(&self, _promotion: &Promotion) -> Result<(), NotifyError> {
        Ok(())
    }
}
