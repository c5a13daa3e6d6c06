//! # Costwatch
//!
//! Usage-telemetry alert engine for AI developer workflows.
//!
//! Costwatch evaluates metric thresholds (daily cost, error rate, latency,
//! token volume) against an append-only usage log, throttles repeated
//! notifications with per-alert cooldowns, validates webhook targets
//! against SSRF, and keeps a durable audit trail of every trigger.
//!
//! ## Architecture
//!
//! - **Telemetry**: JSON-lines usage log reader with windowed aggregation
//! - **Alerting**: engine, SQLite-backed repository, notification delivery
//! - **CLI**: thin front-end over the engine (`costwatch check`, `watch`, ...)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod alerting;
pub mod config;
pub mod error;
pub mod models;
pub mod telemetry;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::alerting::{AlertEngine, AlertRepository, Store};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::telemetry::{UsageLogReader, UsageStats};
}
