//! Alert engine: definition lifecycle and threshold evaluation

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::AlertingConfig;
use crate::error::{Error, Result};
use crate::models::{AlertDefinition, AlertInput, Channel, Metric, TriggerEvent, UsageRecord};
use crate::telemetry::{UsageLogReader, UsageStats};

use super::notifier::NotificationSender;
use super::repository::AlertRepository;
use super::validate::{validate_email, validate_webhook_url};

/// Evaluates alert definitions against usage telemetry
///
/// An explicit instance holding its store handle; no ambient global state.
/// Multiple instances may share one store because the cooldown guard is
/// enforced by the repository's insert-if-absent write.
pub struct AlertEngine {
    repo: AlertRepository,
    reader: UsageLogReader,
    notifier: NotificationSender,
    /// Evaluation window for rate and latency metrics
    window_minutes: i64,
}

impl AlertEngine {
    /// Create an engine over a repository and a usage log
    pub fn new(repo: AlertRepository, reader: UsageLogReader, config: &AlertingConfig) -> Self {
        Self {
            repo,
            reader,
            notifier: NotificationSender::new(config.delivery_timeout()),
            window_minutes: config.window_minutes,
        }
    }

    /// Repository handle, exposed for front-ends that query history directly
    pub fn repository(&self) -> &AlertRepository {
        &self.repo
    }

    // --- Definition lifecycle ---

    /// Validate and persist a new alert definition
    ///
    /// Webhook URLs are SSRF-checked here, at creation time. A duplicate
    /// `alert_id` is rejected, never upserted.
    pub async fn add_alert(&self, input: AlertInput) -> Result<AlertDefinition> {
        if input.alert_id.trim().is_empty() {
            return Err(Error::validation("alert_id must not be empty"));
        }
        if input.name.trim().is_empty() {
            return Err(Error::validation("name must not be empty"));
        }
        if !input.threshold.is_finite() {
            return Err(Error::validation(format!(
                "threshold must be a finite number, got {}",
                input.threshold
            )));
        }
        if input.cooldown_seconds.is_some_and(|c| c < 0) {
            return Err(Error::validation("cooldown_seconds must not be negative"));
        }

        match &input.channel {
            Channel::Webhook { url } => {
                validate_webhook_url(url)?;
            }
            Channel::Email { to } => validate_email(to)?,
            Channel::Stdout => {}
        }

        let now = Utc::now();
        let alert = AlertDefinition {
            alert_id: input.alert_id,
            name: input.name,
            metric: input.metric,
            comparison: input.comparison.unwrap_or_default(),
            threshold: input.threshold,
            channel: input.channel,
            cooldown_seconds: input.cooldown_seconds.unwrap_or(3600),
            severity: input.severity.unwrap_or_default(),
            enabled: input.enabled.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        self.repo.create(&alert).await?;

        info!(
            alert_id = %alert.alert_id,
            metric = %alert.metric,
            threshold = alert.threshold,
            "Alert created"
        );

        Ok(alert)
    }

    /// Get a definition by id, `None` when absent
    pub async fn get_alert(&self, alert_id: &str) -> Result<Option<AlertDefinition>> {
        self.repo.get(alert_id).await
    }

    /// List all definitions
    pub async fn list_alerts(&self) -> Result<Vec<AlertDefinition>> {
        self.repo.list().await
    }

    /// Enable a definition; returns whether it existed
    pub async fn enable_alert(&self, alert_id: &str) -> Result<bool> {
        self.repo.set_enabled(alert_id, true).await
    }

    /// Disable a definition; returns whether it existed
    pub async fn disable_alert(&self, alert_id: &str) -> Result<bool> {
        self.repo.set_enabled(alert_id, false).await
    }

    /// Delete a definition, retaining its trigger history
    pub async fn delete_alert(&self, alert_id: &str) -> Result<bool> {
        self.repo.delete(alert_id).await
    }

    /// Recent trigger history across all alerts, newest first
    pub async fn history(&self, limit: i64) -> Result<Vec<TriggerEvent>> {
        self.repo.list_history(limit).await
    }

    /// Recent trigger history for one alert, newest first
    pub async fn history_for(&self, alert_id: &str, limit: i64) -> Result<Vec<TriggerEvent>> {
        self.repo.list_history_for(alert_id, limit).await
    }

    // --- Evaluation ---

    /// Evaluate every enabled alert and return the triggers recorded in
    /// this pass
    ///
    /// Idempotent per cooldown window: repeated calls within a window add
    /// no duplicate triggers. Delivery failure is recorded, never fatal;
    /// store failure aborts the pass.
    pub async fn check_and_trigger(&self) -> Result<Vec<TriggerEvent>> {
        let alerts = self.repo.list_enabled().await?;
        if alerts.is_empty() {
            debug!("No enabled alerts");
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let read_start = alerts
            .iter()
            .map(|a| self.window_start(a.metric, now))
            .min()
            .unwrap_or(now);
        let records = self.reader.read_since(read_start)?;

        debug!(
            alerts = alerts.len(),
            records = records.len(),
            "Evaluating alerts"
        );

        let mut triggered = Vec::new();
        for alert in &alerts {
            if let Some(event) = self.evaluate(alert, &records, now).await? {
                triggered.push(event);
            }
        }

        Ok(triggered)
    }

    /// Evaluate a single alert against pre-read telemetry
    async fn evaluate(
        &self,
        alert: &AlertDefinition,
        records: &[UsageRecord],
        now: DateTime<Utc>,
    ) -> Result<Option<TriggerEvent>> {
        let window_start = self.window_start(alert.metric, now);
        let windowed: Vec<UsageRecord> = records
            .iter()
            .filter(|r| r.timestamp >= window_start)
            .cloned()
            .collect();
        let stats = UsageStats::aggregate(&windowed);

        let Some(observed) = stats.observed(alert.metric) else {
            debug!(alert_id = %alert.alert_id, metric = %alert.metric, "No data for metric");
            return Ok(None);
        };

        if !alert.check(observed) {
            debug!(
                alert_id = %alert.alert_id,
                observed,
                threshold = alert.threshold,
                "Threshold not breached"
            );
            return Ok(None);
        }

        let cooldown_start = now - Duration::seconds(alert.cooldown_seconds);
        if let Some(last) = self.repo.latest_trigger(&alert.alert_id).await? {
            if last > cooldown_start {
                debug!(
                    alert_id = %alert.alert_id,
                    last_trigger = %last,
                    "Suppressed by cooldown"
                );
                return Ok(None);
            }
        }

        let mut event = TriggerEvent {
            id: Uuid::new_v4(),
            alert_id: alert.alert_id.clone(),
            triggered_at: now,
            observed_value: observed,
            threshold: alert.threshold,
            severity: alert.severity,
            delivery_success: false,
        };

        let outcome = self.notifier.send(alert, &event).await;
        event.delivery_success = outcome.success;

        // The insert re-checks the cooldown window, so a concurrent engine
        // instance cannot record a second trigger for it.
        if !self.repo.record_trigger(&event, cooldown_start).await? {
            debug!(alert_id = %alert.alert_id, "Trigger already recorded for this window");
            return Ok(None);
        }

        info!(
            alert_id = %alert.alert_id,
            observed,
            threshold = alert.threshold,
            severity = ?event.severity,
            delivered = event.delivery_success,
            "Alert triggered"
        );

        Ok(Some(event))
    }

    /// Start of the evaluation window for a metric
    fn window_start(&self, metric: Metric, now: DateTime<Utc>) -> DateTime<Utc> {
        match metric {
            Metric::DailyCost => now - Duration::hours(24),
            Metric::ErrorRate | Metric::AvgLatency | Metric::TokenTotal => {
                now - Duration::minutes(self.window_minutes)
            }
        }
    }
}
