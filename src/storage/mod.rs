//! Receipt archive.
//!
//! Keeps a copy of each uploaded receipt and the JSON parsed from it under
//! the receipts directory. Writes are best-effort: callers log failures and
//! carry on.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive disabled")]
    Disabled,
}

/// Where receipts are archived.
#[derive(Debug, Clone)]
pub struct ReceiptArchive {
    dir: PathBuf,
    enabled: bool,
}

impl ReceiptArchive {
    pub fn new(dir: PathBuf, enabled: bool) -> Self {
        Self { dir, enabled }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save an upload as `<timestamp>-<name>`. Returns the written path.
    pub async fn save_upload(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        if !self.enabled {
            return Err(StorageError::Disabled);
        }
        fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(format!(
            "{}-{}",
            Utc::now().format("%Y%m%dT%H%M%S%3f"),
            sanitize_file_name(file_name)
        ));
        fs::write(&path, bytes).await?;
        debug!("Archived upload to {}", path.display());
        Ok(path)
    }

    /// Write `value` as pretty JSON next to the upload it came from, as
    /// `<upload stem>.parsed.json`. The name never equals the upload's own.
    pub async fn save_parsed<T: Serialize>(
        &self,
        upload_path: &Path,
        value: &T,
    ) -> Result<PathBuf, StorageError> {
        if !self.enabled {
            return Err(StorageError::Disabled);
        }
        let path = parsed_path(upload_path);
        let json = serde_json::to_vec_pretty(value)?;
        fs::write(&path, json).await?;
        Ok(path)
    }

    /// Archive an upload and its parse result, logging instead of failing.
    pub async fn archive<T: Serialize>(&self, file_name: &str, bytes: &[u8], parsed: &T) {
        if !self.enabled {
            return;
        }
        let result = match self.save_upload(file_name, bytes).await {
            Ok(upload) => self.save_parsed(&upload, parsed).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!("Could not archive receipt {}: {}", file_name, e);
        }
    }
}

impl Default for ReceiptArchive {
    fn default() -> Self {
        Self::new(PathBuf::from("./receipts"), true)
    }
}

fn parsed_path(upload_path: &Path) -> PathBuf {
    let stem = upload_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "receipt".to_string());
    upload_path.with_file_name(format!("{}.parsed.json", stem))
}

/// Keep only the final path component and safe characters.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "receipt".to_string()
    } else {
        cleaned.to_string()
    }
}
