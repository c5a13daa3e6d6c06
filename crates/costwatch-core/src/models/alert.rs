//! Alert data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Metric evaluated against usage telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Total cost over the trailing 24 hours
    DailyCost,
    /// Percentage of calls with an error over the evaluation window
    ErrorRate,
    /// Average call duration in milliseconds over the evaluation window
    AvgLatency,
    /// Total tokens consumed over the evaluation window
    TokenTotal,
}

impl Metric {
    /// Stable string form used for storage and CLI parsing
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::DailyCost => "daily_cost",
            Metric::ErrorRate => "error_rate",
            Metric::AvgLatency => "avg_latency",
            Metric::TokenTotal => "token_total",
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily_cost" => Ok(Metric::DailyCost),
            "error_rate" => Ok(Metric::ErrorRate),
            "avg_latency" => Ok(Metric::AvgLatency),
            "token_total" => Ok(Metric::TokenTotal),
            other => Err(format!("unknown metric '{other}'")),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold comparison operator
///
/// Only "trigger when above" semantics are supported; whether the boundary
/// itself triggers is configurable per alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    /// Strictly greater than the threshold
    #[default]
    Gt,
    /// Greater than or equal to the threshold
    Gte,
}

impl Comparison {
    /// Stable string form used for storage and CLI parsing
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::Gt => "gt",
            Comparison::Gte => "gte",
        }
    }
}

impl FromStr for Comparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gt" => Ok(Comparison::Gt),
            "gte" => Ok(Comparison::Gte),
            other => Err(format!("unknown comparison '{other}' (expected gt or gte)")),
        }
    }
}

/// Alert severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Info,
    /// Warning
    #[default]
    Warning,
    /// Critical
    Critical,
}

impl Severity {
    /// Stable string form used for storage and CLI parsing
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// Notification channel configuration
///
/// The channel-specific target is part of the variant, so a webhook alert
/// without a URL is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Channel {
    /// HTTP POST to a webhook URL
    Webhook { url: String },
    /// Email to a single recipient (sending delegated to an SMTP sender)
    Email { to: String },
    /// Formatted line to standard output
    Stdout,
}

impl Channel {
    /// Short channel name for logs and history output
    pub fn kind(&self) -> &'static str {
        match self {
            Channel::Webhook { .. } => "webhook",
            Channel::Email { .. } => "email",
            Channel::Stdout => "stdout",
        }
    }
}

/// A persisted alert definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertDefinition {
    /// Unique identifier, chosen by the caller
    pub alert_id: String,

    /// Human-readable name
    pub name: String,

    /// Metric to monitor
    pub metric: Metric,

    /// Comparison operator for the threshold
    pub comparison: Comparison,

    /// Threshold value
    pub threshold: f64,

    /// Notification channel
    pub channel: Channel,

    /// Minimum seconds between repeated triggers
    pub cooldown_seconds: i64,

    /// Alert severity
    pub severity: Severity,

    /// Whether the alert is evaluated
    pub enabled: bool,

    /// When the alert was created
    pub created_at: DateTime<Utc>,

    /// When the alert was last updated
    pub updated_at: DateTime<Utc>,
}

impl AlertDefinition {
    /// Check if an observed value breaches this alert's threshold
    pub fn check(&self, value: f64) -> bool {
        match self.comparison {
            Comparison::Gt => value > self.threshold,
            Comparison::Gte => value >= self.threshold,
        }
    }
}

/// Input for creating a new alert definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertInput {
    pub alert_id: String,
    pub name: String,
    pub metric: Metric,
    pub comparison: Option<Comparison>,
    pub threshold: f64,
    pub channel: Channel,
    pub cooldown_seconds: Option<i64>,
    pub severity: Option<Severity>,
    pub enabled: Option<bool>,
}

/// A recorded alert trigger (append-only history row)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// Unique identifier
    pub id: Uuid,

    /// The alert that triggered
    pub alert_id: String,

    /// When the trigger was recorded
    pub triggered_at: DateTime<Utc>,

    /// The metric value that breached the threshold
    pub observed_value: f64,

    /// The threshold at the time of the trigger
    pub threshold: f64,

    /// Severity at the time of the trigger
    pub severity: Severity,

    /// Whether notification delivery succeeded
    pub delivery_success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(comparison: Comparison, threshold: f64) -> AlertDefinition {
        AlertDefinition {
            alert_id: "a1".to_string(),
            name: "test".to_string(),
            metric: Metric::DailyCost,
            comparison,
            threshold,
            channel: Channel::Stdout,
            cooldown_seconds: 3600,
            severity: Severity::Warning,
            enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn gt_is_strict_at_the_boundary() {
        let alert = definition(Comparison::Gt, 10.0);

        assert!(!alert.check(10.0));
        assert!(alert.check(10.01));
        assert!(!alert.check(9.99));
    }

    #[test]
    fn gte_includes_the_boundary() {
        let alert = definition(Comparison::Gte, 10.0);

        assert!(alert.check(10.0));
        assert!(alert.check(10.01));
        assert!(!alert.check(9.99));
    }

    #[test]
    fn metric_round_trips_through_str() {
        for metric in [
            Metric::DailyCost,
            Metric::ErrorRate,
            Metric::AvgLatency,
            Metric::TokenTotal,
        ] {
            assert_eq!(metric.as_str().parse::<Metric>().unwrap(), metric);
        }

        assert!("p99_latency".parse::<Metric>().is_err());
    }

    #[test]
    fn channel_serializes_as_tagged_json() {
        let channel = Channel::Webhook {
            url: "https://hooks.example.com/x".to_string(),
        };
        let json = serde_json::to_value(&channel).unwrap();

        assert_eq!(json["type"], "webhook");
        assert_eq!(json["url"], "https://hooks.example.com/x");
    }
}
