//! The append-only combined CSV: one row per finished item.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::artifacts::{ArtifactPaths, OutputLayout};
use super::input::WorkItem;
use crate::error::{ItemError, StorageError};
use crate::generation::GenerationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "FAILED")]
    Failed,
}

/// Placeholder for artifact columns of a failed item.
pub const FAILED_MARKER: &str = "FAILED";

/// Field order is the on-disk column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub index: usize,
    pub name: String,
    pub category: String,
    pub audience: String,
    pub keywords: String,
    pub features: String,
    pub description_file: String,
    pub seo_file: String,
    pub title: String,
    pub meta_description: String,
    pub short_description: String,
    pub status: LedgerStatus,
    pub error: String,
}

impl LedgerRow {
    pub fn ok(
        item: &WorkItem,
        layout: &OutputLayout,
        paths: &ArtifactPaths,
        result: &GenerationResult,
    ) -> Self {
        Self {
            index: item.index,
            name: item.name.clone(),
            category: item.category.clone(),
            audience: item.audience.clone(),
            keywords: item.keywords.clone(),
            features: item.features.clone(),
            description_file: layout.relative(&paths.description),
            seo_file: layout.relative(&paths.seo),
            title: result.title.clone(),
            meta_description: result.meta_description.clone(),
            short_description: result.short_description.clone(),
            status: LedgerStatus::Ok,
            error: String::new(),
        }
    }

    pub fn failed(item: &WorkItem, error: &ItemError) -> Self {
        let last_error = error.last_error();
        Self {
            index: item.index,
            name: item.name.clone(),
            category: item.category.clone(),
            audience: item.audience.clone(),
            keywords: item.keywords.clone(),
            features: item.features.clone(),
            description_file: FAILED_MARKER.into(),
            seo_file: FAILED_MARKER.into(),
            title: String::new(),
            meta_description: format!("ERROR: {last_error}"),
            short_description: String::new(),
            status: LedgerStatus::Failed,
            error: last_error.to_string(),
        }
    }
}

/// Appends rows to a CSV file, writing the header only when the file is new.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row and flush before returning.
    pub fn append(&self, row: &LedgerRow) -> Result<(), StorageError> {
        let is_new = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::io("open", &self.path, e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        writer.serialize(row)?;
        writer
            .flush()
            .map_err(|e| StorageError::io("write", &self.path, e))?;
        Ok(())
    }

    /// Every row in file order; a missing ledger reads as empty.
    pub fn read_all(&self) -> Result<Vec<LedgerRow>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let rows = reader.deserialize().collect::<Result<Vec<LedgerRow>, _>>()?;
        Ok(rows)
    }
}

/// Per-index outcome of a ledger. A later row for the same index wins, so an
/// item that failed once and succeeded on a rerun counts as ok.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub rows: usize,
    pub ok: usize,
    pub failed_indices: Vec<usize>,
}

impl LedgerStats {
    pub fn from_rows(rows: &[LedgerRow]) -> Self {
        let latest: BTreeMap<usize, LedgerStatus> =
            rows.iter().map(|r| (r.index, r.status)).collect();
        let failed_indices = latest
            .iter()
            .filter(|(_, status)| **status == LedgerStatus::Failed)
            .map(|(index, _)| *index)
            .collect::<Vec<_>>();
        Self {
            rows: rows.len(),
            ok: latest.len() - failed_indices.len(),
            failed_indices,
        }
    }
}
