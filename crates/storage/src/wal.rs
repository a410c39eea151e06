// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log ledger
//!
//! Operations are appended as newline-delimited JSON entries, each carrying a
//! CRC32 of its operation, and fsync'd before the call returns. State is the
//! replay of the log.
//!
//! Several handles (or processes) may share one log file. Every mutation
//! takes an exclusive advisory lock, catches up on entries written by other
//! handles, validates against the caught-up state, and appends. Reads take a
//! shared lock and catch up before answering.
//!
//! An append that fails (write or fsync) is cut back off the file before
//! the error is returned, so a failed commit is never applied later.

use crate::ledger::{CasResult, ConstraintStore, ConsumerLedger, LedgerError, UnitSnapshot};
use crate::operation::Operation;
use crate::state::MaterializedState;
use async_trait::async_trait;
use fs2::FileExt;
use rc_core::{
    AccountId, ConstraintId, Consumer, ConsumerId, HoldingScope, LedgerWrite, ResourceConstraint,
    UnitKey,
};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

/// A single entry in the write-ahead log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Monotonically increasing sequence number
    pub sequence: u64,
    /// Microseconds since Unix epoch
    pub timestamp_micros: u64,
    pub operation: Operation,
    /// CRC32 checksum of the serialized operation
    pub checksum: u32,
}

impl WalEntry {
    pub fn new(sequence: u64, operation: Operation) -> Result<Self, LedgerError> {
        let checksum = Self::checksum(&operation)?;
        let timestamp_micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);

        Ok(Self {
            sequence,
            timestamp_micros,
            operation,
            checksum,
        })
    }

    fn checksum(operation: &Operation) -> Result<u32, LedgerError> {
        let json = serde_json::to_string(operation)?;
        Ok(crc32fast::hash(json.as_bytes()))
    }

    /// Verify the checksum matches the operation
    pub fn verify(&self) -> bool {
        Self::checksum(&self.operation)
            .map(|sum| sum == self.checksum)
            .unwrap_or(false)
    }

    pub fn to_line(&self) -> Result<String, LedgerError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_line(line: &str) -> Result<Self, LedgerError> {
        Ok(serde_json::from_str(line)?)
    }
}

/// Tail position over one log file
struct WalFile {
    path: PathBuf,
    file: File,
    /// Bytes of complete entries already applied
    offset: u64,
    next_sequence: u64,
}

impl WalFile {
    fn open(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset: 0,
            next_sequence: 0,
        })
    }

    /// Run `f` while holding the advisory lock on the log
    fn locked<T>(
        &mut self,
        exclusive: bool,
        f: impl FnOnce(&mut Self) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        if exclusive {
            FileExt::lock_exclusive(&self.file)?;
        } else {
            FileExt::lock_shared(&self.file)?;
        }
        let result = f(self);
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to unlock ledger");
        }
        result
    }

    /// Read complete entries written since the last call
    ///
    /// A trailing line without a newline is an append in progress (or a torn
    /// write) and is left unread.
    fn catch_up(&mut self) -> Result<Vec<Operation>, LedgerError> {
        self.file.seek(SeekFrom::Start(self.offset))?;
        let mut reader = BufReader::new(&self.file);
        let mut ops = Vec::new();
        let mut line = String::new();

        loop {
            line.clear();
            let read = reader.read_line(&mut line)?;
            if read == 0 || !line.ends_with('\n') {
                break;
            }

            let text = line.trim_end();
            if !text.is_empty() {
                let entry = WalEntry::from_line(text).map_err(|_| LedgerError::Corrupt {
                    sequence: self.next_sequence,
                })?;
                if !entry.verify() {
                    return Err(LedgerError::Corrupt {
                        sequence: entry.sequence,
                    });
                }
                self.next_sequence = entry.sequence + 1;
                ops.push(entry.operation);
            }
            self.offset += read as u64;
        }

        Ok(ops)
    }

    /// Drop bytes past the last complete entry; caller holds the exclusive lock
    fn truncate_torn_tail(&mut self) -> Result<(), LedgerError> {
        let len = self.file.metadata()?.len();
        if len > self.offset {
            tracing::warn!(
                path = %self.path.display(),
                bytes = len - self.offset,
                "truncating incomplete ledger entry"
            );
            self.file.set_len(self.offset)?;
        }
        Ok(())
    }

    fn append(&mut self, operation: &Operation) -> Result<u64, LedgerError> {
        self.append_with(operation, File::sync_all)
    }

    /// Append one entry, making it durable with `sync`
    ///
    /// On any failure the file is cut back to `offset`, so an entry the
    /// caller saw fail is never applied by a later catch-up.
    fn append_with(
        &mut self,
        operation: &Operation,
        sync: impl FnOnce(&File) -> std::io::Result<()>,
    ) -> Result<u64, LedgerError> {
        let sequence = self.next_sequence;
        let entry = WalEntry::new(sequence, operation.clone())?;
        let mut line = entry.to_line()?;
        line.push('\n');

        let written = self
            .file
            .seek(SeekFrom::Start(self.offset))
            .and_then(|_| self.file.write_all(line.as_bytes()))
            // Durable before the caller sees the commit
            .and_then(|()| sync(&self.file));
        if let Err(e) = written {
            self.roll_back(sequence);
            return Err(e.into());
        }

        self.offset += line.len() as u64;
        self.next_sequence += 1;
        Ok(sequence)
    }

    /// Drop a failed append; caller holds the exclusive lock
    fn roll_back(&mut self, sequence: u64) {
        match self.file.set_len(self.offset) {
            Ok(()) => tracing::warn!(
                path = %self.path.display(),
                sequence,
                "ledger append failed, entry rolled back"
            ),
            // The entry may still be on disk and will be applied on the next
            // catch-up
            Err(e) => tracing::error!(
                path = %self.path.display(),
                sequence,
                error = %e,
                "failed to roll back ledger append"
            ),
        }
    }
}

struct Inner {
    wal: WalFile,
    state: MaterializedState,
}

impl Inner {
    fn read<T>(&mut self, f: impl FnOnce(&MaterializedState) -> T) -> Result<T, LedgerError> {
        let Inner { wal, state } = self;
        wal.locked(false, |wal| {
            for op in wal.catch_up()? {
                state.apply(&op);
            }
            Ok(f(&*state))
        })
    }

    fn write<T>(
        &mut self,
        f: impl FnOnce(
            &mut MaterializedState,
            &mut dyn FnMut(&Operation) -> Result<(), LedgerError>,
        ) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let Inner { wal, state } = self;
        wal.locked(true, |wal| {
            for op in wal.catch_up()? {
                state.apply(&op);
            }
            wal.truncate_torn_tail()?;
            let mut persist = |op: &Operation| wal.append(op).map(|_| ());
            f(state, &mut persist)
        })
    }
}

/// Durable ledger backed by a shared log file
///
/// File locking and fsync run on tokio's blocking pool, so a handle waiting
/// on another process never stalls an async worker.
#[derive(Clone)]
pub struct WalLedger {
    path: PathBuf,
    inner: Arc<Mutex<Inner>>,
}

impl WalLedger {
    /// Open (or create) the log at `path` and replay it
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let mut inner = Inner {
            wal: WalFile::open(path)?,
            state: MaterializedState::default(),
        };
        let replayed = {
            let Inner { wal, state } = &mut inner;
            wal.locked(false, |wal| {
                let ops = wal.catch_up()?;
                for op in &ops {
                    state.apply(op);
                }
                Ok(ops.len())
            })?
        };
        tracing::info!(path = %path.display(), entries = replayed, "ledger replayed");

        Ok(Self {
            path: path.to_path_buf(),
            inner: Arc::new(Mutex::new(inner)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sequence number the next appended entry will get
    pub fn next_sequence(&self) -> u64 {
        lock(&self.inner).wal.next_sequence
    }

    async fn read<T, F>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&MaterializedState) -> T + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut inner = lock(&inner);
            inner.read(f)
        })
            .await
            .map_err(join_error)?
    }

    async fn write<T, F>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(
                &mut MaterializedState,
                &mut dyn FnMut(&Operation) -> Result<(), LedgerError>,
            ) -> Result<T, LedgerError>
            + Send
            + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut inner = lock(&inner);
            inner.write(f)
        })
            .await
            .map_err(join_error)?
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

fn join_error(e: tokio::task::JoinError) -> LedgerError {
    LedgerError::Io(std::io::Error::other(format!("ledger task failed: {e}")))
}

#[async_trait]
impl ConstraintStore for WalLedger {
    async fn create_constraint(&self, constraint: ResourceConstraint) -> Result<(), LedgerError> {
        self.write(move |state, persist| state.create_constraint(constraint, persist))
            .await
    }

    async fn get_constraint(
        &self,
        id: &ConstraintId,
    ) -> Result<Option<ResourceConstraint>, LedgerError> {
        let id = id.clone();
        self.read(move |state| state.constraints.get(&id).cloned())
            .await
    }

    async fn list_constraints(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<ResourceConstraint>, LedgerError> {
        let account_id = account_id.clone();
        self.read(move |state| state.constraints_of(&account_id))
            .await
    }

    async fn delete_constraint(
        &self,
        account_id: &AccountId,
        id: &ConstraintId,
    ) -> Result<bool, LedgerError> {
        let (account_id, id) = (account_id.clone(), id.clone());
        self.write(move |state, persist| state.delete_constraint(&account_id, &id, persist))
            .await
    }

    async fn delete_account(&self, account_id: &AccountId) -> Result<usize, LedgerError> {
        let account_id = account_id.clone();
        self.write(move |state, persist| state.delete_account(&account_id, persist))
            .await
    }
}

#[async_trait]
impl ConsumerLedger for WalLedger {
    async fn load_unit(&self, key: &UnitKey) -> Result<UnitSnapshot, LedgerError> {
        let key = key.clone();
        self.read(move |state| state.unit_snapshot(&key)).await
    }

    async fn commit(
        &self,
        key: &UnitKey,
        expected_version: u64,
        writes: Vec<LedgerWrite>,
    ) -> Result<CasResult, LedgerError> {
        let key = key.clone();
        self.write(move |state, persist| state.commit(&key, expected_version, writes, persist))
            .await
    }

    async fn get_consumer(&self, id: &ConsumerId) -> Result<Option<Consumer>, LedgerError> {
        let id = id.clone();
        self.read(move |state| state.consumers.get(&id).cloned())
            .await
    }

    async fn runnable_consumers(&self) -> Result<Vec<Consumer>, LedgerError> {
        self.read(|state| state.runnable_consumers()).await
    }

    async fn scope_consumers(&self, scope: &HoldingScope) -> Result<Vec<Consumer>, LedgerError> {
        let scope = scope.clone();
        self.read(move |state| state.scope_consumers(&scope)).await
    }

    async fn units(&self, constraint_id: &ConstraintId) -> Result<Vec<UnitKey>, LedgerError> {
        let constraint_id = constraint_id.clone();
        self.read(move |state| state.units_of(&constraint_id)).await
    }

    async fn blocked_constraints(&self) -> Result<Vec<ConstraintId>, LedgerError> {
        self.read(|state| state.blocked_constraints()).await
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
