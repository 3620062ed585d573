//! Fraud Review Pipeline - Main Entry Point
//!
//! Receives transactions from NATS, classifies them, applies the risk rules,
//! records every verdict in the audit ledger and alerts on flagged ones.

use anyhow::{Context, Result};
use fraud_review_pipeline::{
    config::AppConfig,
    consumer::TransactionConsumer,
    ledger::{CsvLedger, Ledger},
    metrics::{MetricsReporter, PipelineMetrics},
    models::OnnxClassifier,
    notifier::NatsNotifier,
    pipeline::ReviewPipeline,
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| fraud_review_pipeline::config::DEFAULT_CONFIG_PATH.to_string());
    let config = AppConfig::load_from_path(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    init_logging(&config)?;

    info!(config = %config_path, "Starting Fraud Review Pipeline");

    // Refuse to start without a usable classifier
    let classifier = OnnxClassifier::load(
        &config.model.path,
        config.model.onnx_threads,
        config.model.fraud_threshold,
    )
    .context("Classifier unavailable, refusing to start")?;
    info!(
        path = %config.model.path,
        fraud_threshold = classifier.fraud_threshold(),
        "Classifier loaded"
    );

    // Refuse to append rows that could never be read back
    let ledger = CsvLedger::new(&config.ledger.path);
    let entries = ledger.load_all().with_context(|| {
        format!(
            "Ledger at {} is unreadable, refusing to start",
            config.ledger.path
        )
    })?;
    info!(
        path = %config.ledger.path,
        entries = entries.len(),
        "Ledger opened"
    );

    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = TransactionConsumer::new(client.clone(), &config.nats.transaction_subject);
    let notifier = NatsNotifier::new(
        client.clone(),
        &config.nats.alert_subject,
        &config.notification.recipient,
    );
    info!(
        subject = %notifier.subject(),
        timeout_ms = config.notification.timeout_ms,
        "Review alerts enabled"
    );

    let pipeline = ReviewPipeline::new(
        classifier,
        ledger,
        notifier,
        config.notification.timeout(),
    );

    let metrics = Arc::new(PipelineMetrics::new());
    let reporter = MetricsReporter::new(metrics.clone(), 60);
    tokio::spawn(reporter.start());

    let mut subscription = consumer.subscribe().await?;

    // One evaluation at a time, in arrival order
    while let Some(message) = subscription.next().await {
        let start_time = Instant::now();
        let reply_to = message.reply.as_deref();

        let record = match TransactionConsumer::decode(&message.payload) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Failed to deserialize transaction");
                metrics.record_rejection();
                if let Err(e) = consumer.reply_error(reply_to, &e.to_string()).await {
                    warn!(error = %e, "Failed to send error reply");
                }
                continue;
            }
        };
        let account_number = record.account_number.clone();

        match pipeline.evaluate(record).await {
            Ok(evaluation) => {
                let processing_time = start_time.elapsed();
                metrics.record_evaluation(&evaluation, processing_time);

                info!(
                    account_number = %account_number,
                    model_label = evaluation.verdict.model_label.as_str(),
                    action = ?evaluation.verdict.action,
                    findings = evaluation.verdict.findings.len(),
                    degraded = evaluation.is_degraded(),
                    processing_time_us = processing_time.as_micros(),
                    "Transaction evaluated"
                );
                if let Some(alert_text) = evaluation.verdict.review_message() {
                    warn!(account_number = %account_number, "{}", alert_text);
                }

                if let Err(e) = consumer.reply(reply_to, &evaluation).await {
                    warn!(error = %e, "Failed to send evaluation reply");
                }
            }
            Err(e) => {
                error!(account_number = %account_number, error = %e, "Evaluation rejected");
                metrics.record_rejection();
                if let Err(e) = consumer.reply_error(reply_to, &e.to_string()).await {
                    warn!(error = %e, "Failed to send error reply");
                }
            }
        }
    }

    info!("Pipeline shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(
        format!("fraud_review_pipeline={}", config.logging.level)
            .parse()
            .context("Invalid logging.level")?,
    );

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}
