//! Alerting engine for Costwatch
//!
//! Threshold evaluation over usage telemetry, cooldown-based suppression,
//! SSRF-validated notification targets, and durable trigger history.

mod engine;
mod notifier;
mod repository;
mod validate;

pub use engine::AlertEngine;
pub use notifier::{DeliveryOutcome, NotificationSender};
pub use repository::{AlertRepository, Store};
pub use validate::{validate_email, validate_webhook_url};
