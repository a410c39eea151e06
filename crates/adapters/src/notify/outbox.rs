// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only outbox of promotions
//!
//! Each promotion becomes one JSON line. A host tails the file and resumes
//! the named claimants; duplicates are expected and harmless.

use super::{NotifyError, PromotionNotifier};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rc_core::Promotion;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One line of the outbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub emitted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub promotion: Promotion,
}

#[derive(Clone)]
pub struct OutboxNotifier {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl OutboxNotifier {
    pub fn open(path: &Path) -> Result<Self, NotifyError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record written so far, skipping unparsable lines
    pub fn read_all(path: &Path) -> Result<Vec<OutboxRecord>, NotifyError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(error = %e, "skipping malformed outbox line"),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl PromotionNotifier for OutboxNotifier {
    async fn notify(&self, promotion: &Promotion) -> Result<(), NotifyError> {
        let record = OutboxRecord {
            emitted_at: Utc::now(),
            promotion: promotion.clone(),
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "outbox_tests.rs"]
mod tests;
