// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: engine wiring, PID lock, logging, recovery loop

use crate::config::{ConfigError, DaemonConfig, Paths};
use fs2::FileExt;
use rc_adapters::{
    NoOpScopeResolver, NotifyError, OutboxNotifier, TracedNotifier, TracedScopeResolver,
};
use rc_core::{SystemClock, UuidIdGen};
use rc_engine::{AdmissionEngine, EngineDeps, EngineError, LedgerStats, RecoveryTask};
use rc_storage::{LedgerError, TracedLedger, WalLedger};
use std::fs::{File, OpenOptions};
use std::future::Future;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Engine with the concrete adapters `rcd` uses (wrapped with tracing)
pub type DaemonEngine = AdmissionEngine<
    TracedLedger<WalLedger>,
    TracedNotifier<OutboxNotifier>,
    SystemClock,
    UuidIdGen,
>;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("rcd already running (pid file {0})")]
    AlreadyRunning(PathBuf),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("outbox error: {0}")]
    Notify(#[from] NotifyError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Open the shared ledger and outbox and build an engine over them
pub fn open_engine(paths: &Paths, config: &DaemonConfig) -> Result<DaemonEngine, DaemonError> {
    let ledger = TracedLedger::new(WalLedger::open(&paths.ledger)?);
    let notifier = TracedNotifier::new(OutboxNotifier::open(&paths.outbox)?);
    Ok(AdmissionEngine::new(
        EngineDeps { ledger, notifier },
        SystemClock,
        UuidIdGen,
        config.engine.clone(),
    ))
}

/// Exclusive lock on the PID file; at most one recovery loop per state dir
#[derive(Debug)]
pub struct PidLock {
    path: PathBuf,
    // Held for the lock; released on drop
    file: File,
}

impl PidLock {
    pub fn acquire(path: &Path) -> Result<Self, DaemonError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        if FileExt::try_lock_exclusive(&file).is_err() {
            return Err(DaemonError::AlreadyRunning(path.to_path_buf()));
        }

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.sync_all()?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// PID recorded in a lock file, if readable
    pub fn read_pid(path: &Path) -> Option<u32> {
        let mut content = String::new();
        File::open(path).ok()?.read_to_string(&mut content).ok()?;
        content.trim().parse().ok()
    }

    /// Remove the PID file and drop the lock
    pub fn release(self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove pid file");
        }
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(error = %e, "failed to unlock pid file");
        }
    }
}

/// Long-running recovery loop over the shared ledger
pub struct Daemon {
    engine: DaemonEngine,
    recovery: RecoveryTask<TracedScopeResolver<NoOpScopeResolver>>,
    lock: PidLock,
}

impl Daemon {
    /// Take the PID lock and open the ledger
    pub fn startup(paths: &Paths, config: &DaemonConfig) -> Result<Self, DaemonError> {
        let lock = PidLock::acquire(&paths.pid)?;
        let engine = open_engine(paths, config)?;
        let recovery = RecoveryTask::new(
            TracedScopeResolver::new(NoOpScopeResolver::new()),
            config.recovery.clone(),
        );

        info!(
            ledger = %paths.ledger.display(),
            outbox = %paths.outbox.display(),
            interval = %humantime::format_duration(config.recovery.interval),
            "rcd started"
        );
        Ok(Self {
            engine,
            recovery,
            lock,
        })
    }

    pub fn engine(&self) -> &DaemonEngine {
        &self.engine
    }

    /// Run recovery passes until `shutdown` resolves; returns the pass count
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<usize, DaemonError> {
        let stats = LedgerStats::collect(self.engine.ledger()).await?;
        info!(
            units = stats.units,
            active = stats.active_consumers,
            blocked = stats.blocked_consumers,
            "ledger loaded"
        );
        Ok(self.recovery.run_until(&self.engine, shutdown).await)
    }

    pub fn shutdown(self) {
        info!("shutting down");
        self.lock.release();
        info!("rcd stopped");
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` overrides `default_filter`. With a log path, output goes
/// through a non-blocking file writer whose guard must be held until exit.
pub fn setup_logging(
    log_path: Option<&Path>,
    default_filter: &str,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, DaemonError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let Some(log_path) = log_path else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    };

    let dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let file_name = log_path
        .file_name()
        .ok_or_else(|| std::io::Error::other(format!("invalid log path {}", log_path.display())))?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();
    Ok(Some(guard))
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
