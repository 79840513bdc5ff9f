//! Market scanners.
//!
//! A scanner produces the ordered candidate list for one tick. Venue
//! integrations plug in behind the `MarketScanner` trait; two scanners
//! ship with the crate:
//! - `IdleScanner` — never finds anything (no venue integration yet)
//! - `FileScanner` — re-reads a JSON candidate file every tick

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use crate::types::{AgentError, Candidate};

/// Source of trade candidates.
#[async_trait]
pub trait MarketScanner: Send + Sync {
    /// Scan for candidates. May be empty; order is preserved downstream.
    async fn scan(&self) -> Result<Vec<Candidate>, AgentError>;

    /// Scanner name for logging.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Idle scanner
// ---------------------------------------------------------------------------

/// Scanner with no venue behind it.
pub struct IdleScanner;

#[async_trait]
impl MarketScanner for IdleScanner {
    async fn scan(&self) -> Result<Vec<Candidate>, AgentError> {
        debug!("Scanning markets (idle — no venue integration)");
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "idle"
    }
}

// ---------------------------------------------------------------------------
// File scanner
// ---------------------------------------------------------------------------

/// Reads a JSON array of candidates from disk on every scan.
///
/// A missing file scans as empty; an unreadable or malformed one is a
/// scan error.
pub struct FileScanner {
    path: PathBuf,
}

impl FileScanner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn error(&self, message: String) -> AgentError {
        AgentError::Scan {
            scanner: self.name().to_string(),
            message,
        }
    }
}

#[async_trait]
impl MarketScanner for FileScanner {
    async fn scan(&self) -> Result<Vec<Candidate>, AgentError> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Candidate file absent");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(self.error(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };

        let candidates: Vec<Candidate> = serde_json::from_str(&json).map_err(|e| {
            self.error(format!("Failed to parse {}: {e}", self.path.display()))
        })?;

        debug!(
            path = %self.path.display(),
            count = candidates.len(),
            "Candidates loaded"
        );
        Ok(candidates)
    }

    fn name(&self) -> &str {
        "file"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
