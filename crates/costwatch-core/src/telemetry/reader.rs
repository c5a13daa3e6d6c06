//! JSON-lines usage log reader

use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::UsageRecord;

/// Reads usage records from an append-only JSON-lines log
///
/// Malformed lines are skipped with a warning; a missing log file yields
/// zero records. Partial data must never block unrelated alerts.
#[derive(Debug, Clone)]
pub struct UsageLogReader {
    path: PathBuf,
}

impl UsageLogReader {
    /// Create a reader for the given log path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to the underlying log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all records with `timestamp >= since`
    pub fn read_since(&self, since: DateTime<Utc>) -> Result<Vec<UsageRecord>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Usage log not found, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        let mut skipped = 0usize;

        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<UsageRecord>(&line) {
                Ok(record) => {
                    if record.timestamp >= since {
                        records.push(record);
                    }
                }
                Err(e) => {
                    skipped += 1;
                    warn!(
                        path = %self.path.display(),
                        line = lineno + 1,
                        error = %e,
                        "Skipping malformed usage record"
                    );
                }
            }
        }

        if skipped > 0 {
            warn!(skipped, path = %self.path.display(), "Usage log contained malformed lines");
        }

        Ok(records)
    }
}
