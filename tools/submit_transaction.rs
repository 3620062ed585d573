//! Transaction Submitter
//!
//! Sends review requests to the pipeline over NATS and logs each verdict.
//! The two reference scenarios go first, followed by randomly drawn records.

use fraud_review_pipeline::FeatureRecord;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Random record generator over the ranges of the review form
struct RecordGenerator {
    rng: rand::rngs::ThreadRng,
}

impl RecordGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    fn generate(&mut self) -> FeatureRecord {
        FeatureRecord::new(
            self.rng.gen_range(10_000_000u32..99_999_999).to_string(),
            (self.rng.gen_range(100.0..10_000.0_f64) * 100.0).round() / 100.0,
        )
        .with_holder(self.random_choice(&["A. Sharma", "R. Gupta", "S. Rao", ""]))
        .with_risk_profile(
            self.rng.gen_range(0..=1000),
            (self.rng.gen_range(0.0..=1.0_f64) * 100.0).round() / 100.0,
            self.rng.gen_range(0..=1000) as f64,
            self.rng.gen_range(0..=5),
        )
        .with_transactions_last_hour(self.rng.gen_range(0..=10))
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn reference_scenarios() -> Vec<FeatureRecord> {
    vec![
        FeatureRecord::new("11111111", 1500.0).with_risk_profile(300, 0.7, 100.0, 0),
        FeatureRecord::new("22222222", 8200.0).with_risk_profile(10, 0.2, 500.0, 3),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("submit_transaction=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args
        .get(2)
        .map(|s| s.as_str())
        .unwrap_or("transactions.review");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(10);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(250);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let mut generator = RecordGenerator::new();
    let mut records = reference_scenarios();
    records.extend((0..count).map(|_| generator.generate()));

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            for record in &records {
                info!("Sample record:\n{}", serde_json::to_string_pretty(record)?);
            }
            return Ok(());
        }
    };

    for (i, record) in records.iter().enumerate() {
        let payload = serde_json::to_vec(record)?;

        match client.request(subject.to_string(), payload.into()).await {
            Ok(reply) => {
                let evaluation: serde_json::Value = serde_json::from_slice(&reply.payload)?;
                info!(
                    n = i + 1,
                    account_number = %record.account_number,
                    verdict = %evaluation["verdict"],
                    ledger = %evaluation["ledger"],
                    notification = %evaluation["notification"],
                    "Evaluated"
                );
            }
            Err(e) => {
                warn!(account_number = %record.account_number, error = %e, "No reply");
            }
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!("Completed! Submitted {} records", records.len());
    Ok(())
}
