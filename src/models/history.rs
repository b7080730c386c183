//! Append-only test history and its JSON persistence

use crate::error::{AppError, Result};
use crate::models::record::MeasurementRecord;
use std::fs;
use std::path::{Path, PathBuf};

/// Ordered sequence of completed measurement records
///
/// Append-only: insertion order is chronological test order and records are
/// never reordered, deduplicated or mutated once stored.
#[derive(Debug, Clone, Default)]
pub struct History {
    records: Vec<MeasurementRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a finished record
    pub fn append(&mut self, record: MeasurementRecord) {
        self.records.push(record);
    }

    /// Records in chronological order
    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    /// The most recently appended record
    pub fn latest(&self) -> Option<&MeasurementRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// JSON file store for the history
///
/// The whole accumulated list is rewritten on every save; there is no merge
/// step. A missing file loads as an empty history; a corrupt file loads as an
/// empty history with a warning so one bad write never bricks the tool.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the history from disk
    pub fn load(&self) -> Result<History> {
        if !self.path.exists() {
            return Ok(History::new());
        }

        let contents = fs::read_to_string(&self.path)
            .map_err(|e| AppError::io(format!("Failed to read history file {}: {}", self.path.display(), e)))?;

        match serde_json::from_str::<Vec<MeasurementRecord>>(&contents) {
            Ok(records) => Ok(History { records }),
            Err(e) => {
                eprintln!(
                    "Warning: history file {} is not valid JSON ({}); starting with empty history",
                    self.path.display(),
                    e
                );
                Ok(History::new())
            }
        }
    }

    /// Overwrite the stored history with the full accumulated list
    pub fn save(&self, history: &History) -> Result<()> {
        let json = serde_json::to_string_pretty(history.records())?;
        fs::write(&self.path, json)
            .map_err(|e| AppError::io(format!("Failed to write history file {}: {}", self.path.display(), e)))?;
        Ok(())
    }
}
