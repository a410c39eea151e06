// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Operator tooling for the resource constraint engine
//!
//! `rcd` drives an [`rc_engine::AdmissionEngine`] over a write-ahead ledger
//! file shared by every process on the host.

pub mod commands;
pub mod config;
pub mod lifecycle;

pub use config::{state_dir, ConfigError, DaemonConfig, Paths};
pub use lifecycle::{open_engine, setup_logging, Daemon, DaemonEngine, DaemonError, PidLock};
