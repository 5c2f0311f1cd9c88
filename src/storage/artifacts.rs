//! Artifact naming, atomic JSON writes and the resume check.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::input::WorkItem;
use crate::error::StorageError;

const SLUG_MAX_CHARS: usize = 60;
const HASH_LEN: usize = 6;

/// Lowercase, replace anything but alphanumerics and `-_` / whitespace with
/// `-`, join whitespace runs with `-`, keep at most 60 chars.
pub fn slugify(text: &str) -> String {
    let cleaned: String = text
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c.is_whitespace() {
                c
            } else {
                '-'
            }
        })
        .collect();
    let joined = cleaned.split_whitespace().collect::<Vec<_>>().join("-");
    joined.chars().take(SLUG_MAX_CHARS).collect()
}

/// First six hex chars of SHA-256 over `name` followed by `features`.
pub fn short_hash(name: &str, features: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(features.as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(HASH_LEN);
    digest
}

/// `{index:03}_{slug}_{hash}`, deterministic for a given row.
pub fn file_base(item: &WorkItem) -> String {
    let mut slug = slugify(&item.name);
    if slug.is_empty() {
        slug = format!("item-{}", item.index);
    }
    format!(
        "{:03}_{}_{}",
        item.index,
        slug,
        short_hash(&item.name, &item.features)
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub description: PathBuf,
    pub seo: PathBuf,
}

impl ArtifactPaths {
    /// Both files present means the item was fully persisted by an earlier run.
    pub fn is_complete(&self) -> bool {
        self.description.is_file() && self.seo.is_file()
    }
}

/// Directory layout under the output root.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub const DESCRIPTIONS_DIR: &'static str = "descriptions";
    pub const SEO_DIR: &'static str = "seo_reports";
    pub const COMBINED_DIR: &'static str = "combined";
    pub const LEDGER_FILE: &'static str = "combined.csv";

    /// Create the output root and its subdirectories when missing.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let layout = Self { root: root.into() };
        for dir in [Self::DESCRIPTIONS_DIR, Self::SEO_DIR, Self::COMBINED_DIR] {
            let path = layout.root.join(dir);
            std::fs::create_dir_all(&path).map_err(|e| StorageError::io("create", &path, e))?;
        }
        Ok(layout)
    }

    /// A layout over an existing root, without touching the filesystem.
    pub fn existing(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths_for(&self, item: &WorkItem) -> ArtifactPaths {
        let base = file_base(item);
        ArtifactPaths {
            description: self.root.join(Self::DESCRIPTIONS_DIR).join(format!("{base}.json")),
            seo: self.root.join(Self::SEO_DIR).join(format!("{base}_seo.json")),
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(Self::COMBINED_DIR).join(Self::LEDGER_FILE)
    }

    /// `path` relative to the output root with `/` separators, as stored in the ledger.
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Write pretty JSON to `path.tmp`, flush it to disk, then rename over `path`.
/// Readers never observe a partially written file at `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let mut file = std::fs::File::create(&tmp).map_err(|e| StorageError::io("create", &tmp, e))?;
    file.write_all(&bytes)
        .and_then(|()| file.sync_all())
        .map_err(|e| StorageError::io("write", &tmp, e))?;
    drop(file);

    std::fs::rename(&tmp, path).map_err(|e| StorageError::io("rename", &tmp, e))?;
    Ok(())
}
