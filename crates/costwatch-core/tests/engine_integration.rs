//! End-to-end engine scenarios against an in-memory store

use chrono::Utc;
use pretty_assertions::assert_eq;
use std::io::Write;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use costwatch::alerting::{AlertEngine, AlertRepository, Store};
use costwatch::config::AlertingConfig;
use costwatch::models::{
    AlertDefinition, AlertInput, Channel, Comparison, Metric, Severity,
};
use costwatch::telemetry::UsageLogReader;
use costwatch::Error;

struct Harness {
    engine: AlertEngine,
    repo: AlertRepository,
    _log: tempfile::NamedTempFile,
}

/// Engine over an in-memory store and a usage log with the given lines
async fn harness(log_lines: &[String]) -> Harness {
    let mut log = tempfile::NamedTempFile::new().unwrap();
    for line in log_lines {
        writeln!(log, "{line}").unwrap();
    }
    log.flush().unwrap();

    let store = Store::open_in_memory().await.unwrap();
    let repo = AlertRepository::new(&store);
    let reader = UsageLogReader::new(log.path());
    let engine = AlertEngine::new(repo.clone(), reader, &AlertingConfig::default());

    Harness {
        engine,
        repo,
        _log: log,
    }
}

fn usage_line(cost: f64) -> String {
    format!(
        r#"{{"timestamp":"{}","cost":{cost},"tokens":{{"total":500}},"duration_ms":1200.0}}"#,
        Utc::now().to_rfc3339()
    )
}

fn cost_alert(alert_id: &str, threshold: f64, channel: Channel) -> AlertInput {
    AlertInput {
        alert_id: alert_id.to_string(),
        name: format!("{alert_id} daily cost"),
        metric: Metric::DailyCost,
        comparison: None,
        threshold,
        channel,
        cooldown_seconds: Some(3600),
        severity: None,
        enabled: None,
    }
}

#[tokio::test]
async fn cost_alert_triggers_once_per_cooldown_window() {
    // Three records totaling 15.0 against a threshold of 10.0
    let h = harness(&[usage_line(5.0), usage_line(5.0), usage_line(5.0)]).await;
    h.engine
        .add_alert(cost_alert("cost1", 10.0, Channel::Stdout))
        .await
        .unwrap();

    let events = h.engine.check_and_trigger().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].alert_id, "cost1");
    assert_eq!(events[0].observed_value, 15.0);
    assert_eq!(events[0].threshold, 10.0);
    assert!(events[0].delivery_success);

    // Immediately re-checking inside the cooldown window adds nothing
    let events = h.engine.check_and_trigger().await.unwrap();
    assert!(events.is_empty());

    let history = h.engine.history(50).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn threshold_boundary_is_strict_under_gt() {
    let h = harness(&[usage_line(10.0)]).await;
    h.engine
        .add_alert(cost_alert("exact", 10.0, Channel::Stdout))
        .await
        .unwrap();

    // observed == threshold does not trigger under the default gt
    let events = h.engine.check_and_trigger().await.unwrap();
    assert!(events.is_empty());

    let mut gte = cost_alert("exact-gte", 10.0, Channel::Stdout);
    gte.comparison = Some(Comparison::Gte);
    h.engine.add_alert(gte).await.unwrap();

    let events = h.engine.check_and_trigger().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].alert_id, "exact-gte");
}

#[tokio::test]
async fn disabled_alerts_never_trigger() {
    let h = harness(&[usage_line(100.0)]).await;
    h.engine
        .add_alert(cost_alert("quiet", 10.0, Channel::Stdout))
        .await
        .unwrap();
    assert!(h.engine.disable_alert("quiet").await.unwrap());

    let events = h.engine.check_and_trigger().await.unwrap();
    assert!(events.is_empty());
    assert!(h.engine.history(50).await.unwrap().is_empty());

    // Re-enabling restores evaluation
    assert!(h.engine.enable_alert("quiet").await.unwrap());
    let events = h.engine.check_and_trigger().await.unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn delivery_failure_still_records_the_trigger() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let h = harness(&[usage_line(20.0)]).await;

    // The mock server lives on loopback, which add_alert rejects, so the
    // definition goes straight into the store the way a pre-existing row
    // from another writer would.
    let now = Utc::now();
    h.repo
        .create(&AlertDefinition {
            alert_id: "flaky".to_string(),
            name: "flaky webhook".to_string(),
            metric: Metric::DailyCost,
            comparison: Comparison::Gt,
            threshold: 10.0,
            channel: Channel::Webhook {
                url: format!("{}/hook", server.uri()),
            },
            cooldown_seconds: 3600,
            severity: Severity::Critical,
            enabled: true,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    let events = h.engine.check_and_trigger().await.unwrap();
    assert_eq!(events.len(), 1);
    assert!(!events[0].delivery_success);

    let history = h.engine.history_for("flaky", 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(!history[0].delivery_success);
}

#[tokio::test]
async fn ssrf_targets_are_rejected_at_creation() {
    let h = harness(&[]).await;

    for url in [
        "http://127.0.0.1/x",
        "http://169.254.169.254/latest/meta-data",
        "http://10.0.0.5/",
    ] {
        let result = h
            .engine
            .add_alert(cost_alert(
                "bad",
                10.0,
                Channel::Webhook {
                    url: url.to_string(),
                },
            ))
            .await;
        assert!(matches!(result, Err(Error::Security(_))), "{url} accepted");
    }

    // A hard rejection: nothing was persisted
    assert!(h.engine.get_alert("bad").await.unwrap().is_none());

    h.engine
        .add_alert(cost_alert(
            "good",
            10.0,
            Channel::Webhook {
                url: "https://hooks.slack.com/services/T00/B00/XXXX".to_string(),
            },
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn duplicate_alert_id_is_rejected() {
    let h = harness(&[]).await;
    h.engine
        .add_alert(cost_alert("dup", 10.0, Channel::Stdout))
        .await
        .unwrap();

    let result = h
        .engine
        .add_alert(cost_alert("dup", 99.0, Channel::Stdout))
        .await;
    assert!(matches!(result, Err(Error::Validation(_))));

    // The original definition is untouched
    let alert = h.engine.get_alert("dup").await.unwrap().unwrap();
    assert_eq!(alert.threshold, 10.0);
}

#[tokio::test]
async fn invalid_definitions_are_rejected() {
    let h = harness(&[]).await;

    let mut nan = cost_alert("nan", f64::NAN, Channel::Stdout);
    nan.threshold = f64::NAN;
    assert!(matches!(
        h.engine.add_alert(nan).await,
        Err(Error::Validation(_))
    ));

    let bad_email = cost_alert(
        "mail",
        10.0,
        Channel::Email {
            to: "not-an-address".to_string(),
        },
    );
    assert!(matches!(
        h.engine.add_alert(bad_email).await,
        Err(Error::Validation(_))
    ));
}

#[tokio::test]
async fn deleting_an_alert_retains_its_history() {
    let h = harness(&[usage_line(50.0)]).await;
    h.engine
        .add_alert(cost_alert("gone", 10.0, Channel::Stdout))
        .await
        .unwrap();

    let events = h.engine.check_and_trigger().await.unwrap();
    assert_eq!(events.len(), 1);

    assert!(h.engine.delete_alert("gone").await.unwrap());
    assert!(h.engine.get_alert("gone").await.unwrap().is_none());

    let history = h.engine.history_for("gone", 10).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn malformed_telemetry_does_not_block_evaluation() {
    let mut lines: Vec<String> = (0..9).map(|_| usage_line(2.0)).collect();
    lines.insert(3, "{broken json".to_string());

    let h = harness(&lines).await;
    h.engine
        .add_alert(cost_alert("robust", 10.0, Channel::Stdout))
        .await
        .unwrap();

    // Nine valid records at 2.0 each: observed 18.0
    let events = h.engine.check_and_trigger().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].observed_value, 18.0);
}

#[tokio::test]
async fn missing_alert_lookups_and_toggles() {
    let h = harness(&[]).await;

    assert!(h.engine.get_alert("ghost").await.unwrap().is_none());
    assert!(!h.engine.enable_alert("ghost").await.unwrap());
    assert!(!h.engine.disable_alert("ghost").await.unwrap());
    assert!(!h.engine.delete_alert("ghost").await.unwrap());
}
