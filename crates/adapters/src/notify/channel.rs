// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process notifier for embedding hosts

use super::{NotifyError, PromotionNotifier};
use async_trait::async_trait;
use rc_core::Promotion;
use tokio::sync::mpsc;

/// Forwards promotions to an mpsc receiver owned by the host
#[derive(Clone, Debug)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Promotion>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Promotion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl PromotionNotifier for ChannelNotifier {
    async fn notify(&self, promotion: &Promotion) -> Result<(), NotifyError> {
        self.tx
            .send(promotion.clone())
            .map_err(|_| NotifyError::Closed)
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
