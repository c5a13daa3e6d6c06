//! Usage telemetry data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token counts attached to a usage record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Total tokens for the call
    #[serde(default)]
    pub total: i64,

    /// Input tokens (if the writer breaks them out)
    #[serde(default)]
    pub input: Option<i64>,

    /// Output tokens (if the writer breaks them out)
    #[serde(default)]
    pub output: Option<i64>,
}

/// One line of the append-only usage log
///
/// The log writer is an external collaborator; unknown fields are ignored
/// so the schema can grow without breaking older engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// When the call completed
    pub timestamp: DateTime<Utc>,

    /// Cost of the call in USD
    #[serde(default)]
    pub cost: f64,

    /// Token usage for the call
    #[serde(default)]
    pub tokens: TokenUsage,

    /// Wall-clock duration in milliseconds
    #[serde(default)]
    pub duration_ms: f64,

    /// Whether the call errored
    #[serde(default)]
    pub error: Option<bool>,

    /// Model that served the call
    #[serde(default)]
    pub model: Option<String>,
}

impl UsageRecord {
    /// Whether this record counts as an errored call
    pub fn is_error(&self) -> bool {
        self.error.unwrap_or(false)
    }
}
