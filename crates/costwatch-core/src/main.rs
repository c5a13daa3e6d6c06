//! Costwatch CLI
//!
//! Thin command-line front-end over the alert engine.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

use costwatch::alerting::{AlertEngine, AlertRepository, Store};
use costwatch::models::{AlertInput, Channel, Comparison, Metric, Severity};
use costwatch::telemetry::UsageLogReader;
use costwatch::Config;

/// Costwatch - usage alerts for AI workflows
#[derive(Parser)]
#[command(name = "costwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "COSTWATCH_CONFIG")]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (for commands that support it)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new alert
    Add {
        /// Unique alert id
        #[arg(long)]
        id: String,

        /// Display name (defaults to the id)
        #[arg(long)]
        name: Option<String>,

        /// Metric to monitor (daily_cost, error_rate, avg_latency, token_total)
        #[arg(long)]
        metric: String,

        /// Threshold value
        #[arg(long)]
        threshold: f64,

        /// Comparison operator (gt, gte)
        #[arg(long, default_value = "gt")]
        comparison: String,

        /// Notification channel (webhook, email, stdout)
        #[arg(long, default_value = "stdout")]
        channel: String,

        /// Webhook URL (required for --channel webhook)
        #[arg(long)]
        webhook_url: Option<String>,

        /// Email recipient (required for --channel email)
        #[arg(long)]
        email: Option<String>,

        /// Minimum seconds between repeated triggers
        #[arg(long, default_value = "3600")]
        cooldown: i64,

        /// Severity (info, warning, critical)
        #[arg(long, default_value = "warning")]
        severity: String,
    },

    /// List alert definitions
    List,

    /// Run a single evaluation pass
    Check,

    /// Evaluate repeatedly on an interval
    Watch {
        /// Sleep between passes (e.g. "60s", "5m")
        #[arg(long, default_value = "60s")]
        interval: String,
    },

    /// Show trigger history
    History {
        /// Only show history for this alert
        #[arg(long)]
        alert: Option<String>,

        /// Maximum number of rows
        #[arg(long, default_value = "50")]
        limit: i64,
    },

    /// Enable an alert
    Enable {
        /// Alert id
        alert_id: String,
    },

    /// Disable an alert
    Disable {
        /// Alert id
        alert_id: String,
    },

    /// Delete an alert (history is retained)
    Delete {
        /// Alert id
        alert_id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(config, cli.command, cli.format).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config, command: Commands, format: OutputFormat) -> anyhow::Result<()> {
    if let Some(dir) = config.store.path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let store = Store::open(&config.store.path).await?;
    let repo = AlertRepository::new(&store);
    let reader = UsageLogReader::new(&config.telemetry.log_path);
    let engine = AlertEngine::new(repo, reader, &config.alerting);

    match command {
        Commands::Add {
            id,
            name,
            metric,
            threshold,
            comparison,
            channel,
            webhook_url,
            email,
            cooldown,
            severity,
        } => {
            let input = AlertInput {
                name: name.unwrap_or_else(|| id.clone()),
                alert_id: id,
                metric: parse::<Metric>(&metric)?,
                comparison: Some(parse::<Comparison>(&comparison)?),
                threshold,
                channel: parse_channel(&channel, webhook_url, email)?,
                cooldown_seconds: Some(cooldown),
                severity: Some(parse::<Severity>(&severity)?),
                enabled: None,
            };

            let alert = engine.add_alert(input).await?;
            println!("Created alert '{}' ({})", alert.alert_id, alert.metric);
        }

        Commands::List => {
            let alerts = engine.list_alerts().await?;
            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&alerts)?);
                return Ok(());
            }

            if alerts.is_empty() {
                println!("No alerts defined.");
            }
            for alert in alerts {
                println!(
                    "{:<20} {:<12} {} {:<10} cooldown={}s [{}] {}",
                    alert.alert_id,
                    alert.metric,
                    alert.comparison.as_str(),
                    alert.threshold,
                    alert.cooldown_seconds,
                    alert.channel.kind(),
                    if alert.enabled { "enabled" } else { "disabled" },
                );
            }
        }

        Commands::Check => {
            let events = engine.check_and_trigger().await?;
            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&events)?);
                return Ok(());
            }
            println!("{} alert(s) triggered", events.len());
        }

        Commands::Watch { interval } => {
            let interval = humantime::parse_duration(&interval)?;
            watch(&engine, interval).await?;
        }

        Commands::History { alert, limit } => {
            let events = match alert {
                Some(id) => engine.history_for(&id, limit).await?,
                None => engine.history(limit).await?,
            };

            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&events)?);
                return Ok(());
            }

            for event in events {
                println!(
                    "{}  {:<20} observed={:<10.2} threshold={:<10.2} {:<8} delivered={}",
                    event.triggered_at.to_rfc3339(),
                    event.alert_id,
                    event.observed_value,
                    event.threshold,
                    event.severity.as_str(),
                    event.delivery_success,
                );
            }
        }

        Commands::Enable { alert_id } => {
            if engine.enable_alert(&alert_id).await? {
                println!("Enabled '{alert_id}'");
            } else {
                anyhow::bail!("no alert with id '{alert_id}'");
            }
        }

        Commands::Disable { alert_id } => {
            if engine.disable_alert(&alert_id).await? {
                println!("Disabled '{alert_id}'");
            } else {
                anyhow::bail!("no alert with id '{alert_id}'");
            }
        }

        Commands::Delete { alert_id } => {
            if engine.delete_alert(&alert_id).await? {
                println!("Deleted '{alert_id}' (history retained)");
            } else {
                anyhow::bail!("no alert with id '{alert_id}'");
            }
        }
    }

    Ok(())
}

/// Repeated evaluation loop; Ctrl+C stops it
async fn watch(engine: &AlertEngine, interval: Duration) -> anyhow::Result<()> {
    info!(interval = ?interval, "Watching usage log");
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match engine.check_and_trigger().await {
                    Ok(events) if !events.is_empty() => {
                        info!(count = events.len(), "Triggered alerts");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "Evaluation pass failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                return Ok(());
            }
        }
    }
}

fn parse<T>(raw: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse::<T>().map_err(anyhow::Error::msg)
}

fn parse_channel(
    kind: &str,
    webhook_url: Option<String>,
    email: Option<String>,
) -> anyhow::Result<Channel> {
    match kind {
        "webhook" => {
            let url =
                webhook_url.ok_or_else(|| anyhow::anyhow!("--channel webhook requires --webhook-url"))?;
            Ok(Channel::Webhook { url })
        }
        "email" => {
            let to = email.ok_or_else(|| anyhow::anyhow!("--channel email requires --email"))?;
            Ok(Channel::Email { to })
        }
        "stdout" => Ok(Channel::Stdout),
        other => anyhow::bail!("unknown channel '{other}' (expected webhook, email, or stdout)"),
    }
}
