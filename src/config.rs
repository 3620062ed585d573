//! Configuration management for the review pipeline

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub model: ModelConfig,
    pub ledger: LedgerConfig,
    pub notification: NotificationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming transactions
    pub transaction_subject: String,
    /// Subject for outgoing review alerts
    pub alert_subject: String,
}

/// Classifier artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the ONNX classifier
    pub path: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
    /// Fraud-class probability at or above which a record is labelled
    /// fraudulent, used when the model exports no label output
    #[serde(default = "default_fraud_threshold")]
    pub fraud_threshold: f64,
}

fn default_onnx_threads() -> usize {
    1
}

fn default_fraud_threshold() -> f64 {
    0.5
}

/// Audit ledger configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// CSV file the ledger appends to
    pub path: String,
}

/// Review alert configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Mailbox or channel alerts are addressed to
    pub recipient: String,
    /// Upper bound on a single delivery attempt in milliseconds
    #[serde(default = "default_notification_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_notification_timeout_ms() -> u64 {
    5000
}

impl NotificationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.model.fraud_threshold) {
            anyhow::bail!(
                "model.fraud_threshold must be within [0, 1], got {}",
                self.model.fraud_threshold
            );
        }
        if self.notification.timeout_ms == 0 {
            anyhow::bail!("notification.timeout_ms must be positive");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                transaction_subject: "transactions.review".to_string(),
                alert_subject: "fraud.review.alerts".to_string(),
            },
            model: ModelConfig {
                path: "models/fraud_model.onnx".to_string(),
                onnx_threads: default_onnx_threads(),
                fraud_threshold: default_fraud_threshold(),
            },
            ledger: LedgerConfig {
                path: "data/fraud_ledger.csv".to_string(),
            },
            notification: NotificationConfig {
                recipient: "security-team@example.com".to_string(),
                timeout_ms: default_notification_timeout_ms(),
            },
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.model.fraud_threshold, 0.5);
        assert_eq!(config.notification.timeout(), Duration::from_secs(5));
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_shipped_config_loads() {
        let config = AppConfig::load().unwrap();
        assert_eq!(config.model.path, "models/fraud_model.onnx");
        assert_eq!(config.ledger.path, "data/fraud_ledger.csv");
    }

    #[test]
    fn test_load_with_defaults() {
        let file = write_config(
            r#"
            [nats]
            url = "nats://nats:4222"
            transaction_subject = "tx"
            alert_subject = "alerts"

            [model]
            path = "models/rf.onnx"

            [ledger]
            path = "/var/lib/review/ledger.csv"

            [notification]
            recipient = "ops@example.com"
            "#,
        );

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.nats.transaction_subject, "tx");
        assert_eq!(config.model.onnx_threads, 1);
        assert_eq!(config.model.fraud_threshold, 0.5);
        assert_eq!(config.notification.timeout_ms, 5000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let file = write_config(
            r#"
            [nats]
            url = "nats://nats:4222"
            transaction_subject = "tx"
            alert_subject = "alerts"

            [model]
            path = "models/rf.onnx"
            fraud_threshold = 1.5

            [ledger]
            path = "ledger.csv"

            [notification]
            recipient = "ops@example.com"
            "#,
        );

        assert!(AppConfig::load_from_path(file.path()).is_err());
    }
}
