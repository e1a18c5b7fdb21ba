//! Baseline file
//!
//! A baseline is the JSON snapshot of every tracked table. The document is
//! versioned and carries an md5 checksum of its `tables` value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Error, Result};
use crate::schema::types::Baseline;

/// Current baseline document version
pub const BASELINE_VERSION: u32 = 1;

/// On-disk baseline document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineFile {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub checksum: String,
    pub tables: Baseline,
}

impl BaselineFile {
    /// Wrap a snapshot into a new document
    pub fn new(tables: Baseline) -> Result<Self> {
        let checksum = checksum(&tables)?;
        Ok(Self {
            version: BASELINE_VERSION,
            generated_at: Utc::now(),
            checksum,
            tables,
        })
    }

    /// Parse and verify a document
    pub fn from_json(json: &str) -> Result<Self> {
        let file: BaselineFile = serde_json::from_str(json)?;

        if file.version != BASELINE_VERSION {
            return Err(Error::BaselineError(format!(
                "Unsupported baseline version {} (expected {})",
                file.version, BASELINE_VERSION
            )));
        }

        let expected = checksum(&file.tables)?;
        if expected != file.checksum {
            return Err(Error::BaselineError(format!(
                "Baseline checksum mismatch: recorded {}, computed {}",
                file.checksum, expected
            )));
        }

        for schema in file.tables.values() {
            for index in schema.indexes.values() {
                index.validate().map_err(|e| Error::BaselineError(e.to_string()))?;
            }
        }

        Ok(file)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a baseline file, `None` when it does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if json.trim().is_empty() {
            return Ok(None);
        }

        Self::from_json(&json).map(Some)
    }

    /// Write the baseline file, creating its directory
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), tables = self.tables.len(), "Baseline written");
        Ok(())
    }
}

/// Remove a generated file left from an earlier run
///
/// Returns whether a file was removed. A missing file is not an error.
pub fn remove_stale(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "Stale file removed");
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// md5 hex digest of the compact JSON form of the tables
fn checksum(tables: &Baseline) -> Result<String> {
    let payload = serde_json::to_vec(tables)?;
    Ok(format!("{:x}", md5::compute(payload)))
}
