//! Checkpoint/resume bookkeeping for long batch runs.
//!
//! The whole record is rewritten on every save and the file is the only
//! thing consulted on resume. Resumption is positional (by index into the
//! ordered item list), so it is only correct when the caller presents items
//! in the same stable order used during the original run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::now_iso;

const ERROR_LOG_CAP: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ProgressRecord {
    pub(crate) processed: u64,
    pub(crate) total: u64,
    pub(crate) last_processed_id: Option<String>,
    pub(crate) last_processed_index: Option<u64>,
    pub(crate) timestamp: Option<String>,
    pub(crate) errors: Vec<ErrorEntry>,
    pub(crate) metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorEntry {
    pub(crate) timestamp: String,
    pub(crate) message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) item_index: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum LoadOutcome {
    /// A prior record was read and now backs the in-memory state.
    Loaded,
    /// No file at the path; in-memory state stays fresh.
    NoPriorState,
    /// The file exists but could not be read or parsed; in-memory state is
    /// untouched and the problem was logged.
    Failed,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProgressStatus {
    pub(crate) processed: u64,
    pub(crate) total: u64,
    pub(crate) percentage: f64,
    pub(crate) remaining: u64,
    pub(crate) last_processed_id: Option<String>,
    pub(crate) last_processed_index: Option<u64>,
    pub(crate) timestamp: Option<String>,
    pub(crate) error_count: usize,
}

/// File-backed progress tracker for a single batch loop. Every mutating
/// operation persists immediately; a crash loses at most the last increment.
pub(crate) struct ProgressTracker {
    path: PathBuf,
    record: ProgressRecord,
}

impl ProgressTracker {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            record: ProgressRecord::default(),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn record(&self) -> &ProgressRecord {
        &self.record
    }

    pub(crate) fn load(&mut self) -> LoadOutcome {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return LoadOutcome::NoPriorState;
            }
            Err(err) => {
                eprintln!("[progress] failed to read {}: {err}", self.path.display());
                return LoadOutcome::Failed;
            }
        };
        match serde_json::from_str(&data) {
            Ok(record) => {
                self.record = record;
                LoadOutcome::Loaded
            }
            Err(err) => {
                eprintln!("[progress] malformed checkpoint {}: {err}", self.path.display());
                LoadOutcome::Failed
            }
        }
    }

    /// Stamps the record and rewrites the backing file. A failed write is a
    /// warning, not a crash: the in-memory record stays authoritative and
    /// the next save gets another chance.
    pub(crate) fn save(&mut self) -> bool {
        self.record.timestamp = Some(now_iso());
        match self.write_file() {
            Ok(()) => true,
            Err(err) => {
                eprintln!("[progress] failed to save {}: {err}", self.path.display());
                false
            }
        }
    }

    fn write_file(&self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.record)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub(crate) fn update(
        &mut self,
        processed: u64,
        last_id: Option<&str>,
        last_index: Option<u64>,
    ) -> bool {
        self.record.processed = processed;
        if let Some(id) = last_id {
            if !id.is_empty() {
                self.record.last_processed_id = Some(id.to_string());
            }
        }
        if let Some(index) = last_index {
            self.record.last_processed_index = Some(index);
        }
        self.save()
    }

    pub(crate) fn set_total(&mut self, total: u64) -> bool {
        self.record.total = total;
        self.save()
    }

    pub(crate) fn add_error(
        &mut self,
        message: impl std::fmt::Display,
        item_id: Option<&str>,
        item_index: Option<u64>,
    ) -> bool {
        self.record.errors.push(ErrorEntry {
            timestamp: now_iso(),
            message: message.to_string(),
            item_id: item_id.map(str::to_string),
            item_index,
        });
        if self.record.errors.len() > ERROR_LOG_CAP {
            let overflow = self.record.errors.len() - ERROR_LOG_CAP;
            self.record.errors.drain(..overflow);
        }
        self.save()
    }

    pub(crate) fn set_metadata(&mut self, key: &str, value: serde_json::Value) -> bool {
        self.record.metadata.insert(key.to_string(), value);
        self.save()
    }

    pub(crate) fn get_metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.record.metadata.get(key)
    }

    pub(crate) fn reset(&mut self) -> bool {
        self.record = ProgressRecord::default();
        self.save()
    }

    pub(crate) fn status(&self) -> ProgressStatus {
        let percentage = if self.record.total == 0 {
            0.0
        } else {
            let raw = self.record.processed as f64 / self.record.total as f64 * 100.0;
            (raw * 100.0).round() / 100.0
        };
        ProgressStatus {
            processed: self.record.processed,
            total: self.record.total,
            percentage,
            remaining: self.record.total.saturating_sub(self.record.processed),
            last_processed_id: self.record.last_processed_id.clone(),
            last_processed_index: self.record.last_processed_index,
            timestamp: self.record.timestamp.clone(),
            error_count: self.record.errors.len(),
        }
    }

    /// Positional skip: everything after `lastProcessedIndex`, or the whole
    /// slice when no index is recorded. An index at or past the end yields
    /// an empty slice.
    pub(crate) fn filter_unprocessed<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        match self.record.last_processed_index {
            Some(index) => {
                let start = (index as usize).saturating_add(1).min(items.len());
                &items[start..]
            }
            None => items,
        }
    }
}
