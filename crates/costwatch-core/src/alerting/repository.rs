//! Durable store for alert definitions and trigger history

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{AlertDefinition, Channel, Comparison, Metric, Severity, TriggerEvent};

/// SQLite-backed store shared by definitions and history
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if needed) a store at the given path and run migrations
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Open an in-memory store (tests and local experimentation)
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Run embedded migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::config(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Repository for alert definitions and trigger events
#[derive(Clone)]
pub struct AlertRepository {
    pool: SqlitePool,
}

impl AlertRepository {
    /// Create a repository over an opened store
    pub fn new(store: &Store) -> Self {
        Self {
            pool: store.pool.clone(),
        }
    }

    // --- Alert definitions ---

    /// Persist a new definition
    ///
    /// Fails with a validation error if `alert_id` already exists; creation
    /// is never an upsert.
    pub async fn create(&self, alert: &AlertDefinition) -> Result<()> {
        let channel_json = serde_json::to_string(&alert.channel)?;

        let result = sqlx::query(
            r#"
            INSERT INTO alerts (
                alert_id, name, metric, comparison, threshold, channel,
                cooldown_seconds, severity, enabled, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&alert.alert_id)
        .bind(&alert.name)
        .bind(alert.metric.as_str())
        .bind(alert.comparison.as_str())
        .bind(alert.threshold)
        .bind(&channel_json)
        .bind(alert.cooldown_seconds)
        .bind(alert.severity.as_str())
        .bind(alert.enabled)
        .bind(alert.created_at)
        .bind(alert.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(Error::validation(
                format!("alert '{}' already exists", alert.alert_id),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a definition by id, `None` when absent
    pub async fn get(&self, alert_id: &str) -> Result<Option<AlertDefinition>> {
        let row = sqlx::query_as::<_, AlertRow>("SELECT * FROM alerts WHERE alert_id = ?")
            .bind(alert_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(AlertRow::into_definition))
    }

    /// List all definitions
    pub async fn list(&self) -> Result<Vec<AlertDefinition>> {
        let rows = sqlx::query_as::<_, AlertRow>("SELECT * FROM alerts ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(AlertRow::into_definition).collect())
    }

    /// List enabled definitions
    pub async fn list_enabled(&self) -> Result<Vec<AlertDefinition>> {
        let rows = sqlx::query_as::<_, AlertRow>(
            "SELECT * FROM alerts WHERE enabled = 1 ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AlertRow::into_definition).collect())
    }

    /// Enable or disable a definition; returns whether a row was updated
    pub async fn set_enabled(&self, alert_id: &str, enabled: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE alerts SET enabled = ?, updated_at = ? WHERE alert_id = ?")
            .bind(enabled)
            .bind(Utc::now())
            .bind(alert_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a definition; trigger history is retained for audit
    pub async fn delete(&self, alert_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM alerts WHERE alert_id = ?")
            .bind(alert_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // --- Trigger history ---

    /// Timestamp of the most recent trigger for an alert
    pub async fn latest_trigger(&self, alert_id: &str) -> Result<Option<DateTime<Utc>>> {
        let row: Option<(DateTime<Utc>,)> = sqlx::query_as(
            r#"
            SELECT triggered_at FROM alert_history
            WHERE alert_id = ?
            ORDER BY triggered_at DESC
            LIMIT 1
            "#,
        )
        .bind(alert_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(t,)| t))
    }

    /// Append a trigger event unless one already exists inside the cooldown
    /// window
    ///
    /// The existence check and the insert run as one statement, so two
    /// engine instances sharing a store cannot both record a trigger for
    /// the same window. Returns whether the row was inserted.
    pub async fn record_trigger(
        &self,
        event: &TriggerEvent,
        window_start: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO alert_history (
                id, alert_id, triggered_at, observed_value, threshold,
                severity, delivery_success
            )
            SELECT ?, ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM alert_history
                WHERE alert_id = ? AND triggered_at > ?
            )
            "#,
        )
        .bind(event.id.to_string())
        .bind(&event.alert_id)
        .bind(event.triggered_at)
        .bind(event.observed_value)
        .bind(event.threshold)
        .bind(event.severity.as_str())
        .bind(event.delivery_success)
        .bind(&event.alert_id)
        .bind(window_start)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List recent triggers across all alerts, newest first
    pub async fn list_history(&self, limit: i64) -> Result<Vec<TriggerEvent>> {
        let rows = sqlx::query_as::<_, TriggerRow>(
            "SELECT * FROM alert_history ORDER BY triggered_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TriggerRow::into_event).collect())
    }

    /// List recent triggers for one alert, newest first
    pub async fn list_history_for(&self, alert_id: &str, limit: i64) -> Result<Vec<TriggerEvent>> {
        let rows = sqlx::query_as::<_, TriggerRow>(
            r#"
            SELECT * FROM alert_history
            WHERE alert_id = ?
            ORDER BY triggered_at DESC
            LIMIT ?
            "#,
        )
        .bind(alert_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TriggerRow::into_event).collect())
    }
}

// Database row types for mapping

#[derive(sqlx::FromRow)]
struct AlertRow {
    alert_id: String,
    name: String,
    metric: String,
    comparison: String,
    threshold: f64,
    channel: String,
    cooldown_seconds: i64,
    severity: String,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AlertRow {
    fn into_definition(self) -> AlertDefinition {
        let channel: Channel =
            serde_json::from_str(&self.channel).unwrap_or(Channel::Stdout);

        AlertDefinition {
            alert_id: self.alert_id,
            name: self.name,
            metric: Metric::from_str(&self.metric).unwrap_or(Metric::DailyCost),
            comparison: Comparison::from_str(&self.comparison).unwrap_or_default(),
            threshold: self.threshold,
            channel,
            cooldown_seconds: self.cooldown_seconds,
            severity: Severity::from_str(&self.severity).unwrap_or_default(),
            enabled: self.enabled,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TriggerRow {
    id: String,
    alert_id: String,
    triggered_at: DateTime<Utc>,
    observed_value: f64,
    threshold: f64,
    severity: String,
    delivery_success: bool,
}

impl TriggerRow {
    fn into_event(self) -> TriggerEvent {
        TriggerEvent {
            id: Uuid::parse_str(&self.id).unwrap_or_else(|_| Uuid::nil()),
            alert_id: self.alert_id,
            triggered_at: self.triggered_at,
            observed_value: self.observed_value,
            threshold: self.threshold,
            severity: Severity::from_str(&self.severity).unwrap_or_default(),
            delivery_success: self.delivery_success,
        }
    }
}
