//! Usage telemetry ingestion
//!
//! Reads the append-only JSON-lines usage log and aggregates it into
//! windowed statistics for metric evaluation.

mod reader;
mod stats;

pub use reader::UsageLogReader;
pub use stats::UsageStats;
