//! NATS consumer for transactions submitted for review

use crate::pipeline::Evaluation;
use crate::types::FeatureRecord;
use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::{debug, info};

/// Receives transactions and answers requests with their evaluation
pub struct TransactionConsumer {
    client: Client,
    subject: String,
}

impl TransactionConsumer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the transaction subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to transaction subject");
        Ok(subscriber)
    }

    /// Decode a message payload into a record
    pub fn decode(payload: &[u8]) -> serde_json::Result<FeatureRecord> {
        serde_json::from_slice(payload)
    }

    /// Send the evaluation back when the submitter asked for a reply
    pub async fn reply(&self, reply_to: Option<&str>, evaluation: &Evaluation) -> Result<()> {
        if let Some(reply_to) = reply_to {
            let payload = serde_json::to_vec(evaluation)?;
            self.client
                .publish(reply_to.to_string(), payload.into())
                .await?;
            debug!(reply_to = %reply_to, "Sent evaluation reply");
        }
        Ok(())
    }

    /// Report a rejected submission to the submitter
    pub async fn reply_error(&self, reply_to: Option<&str>, error: &str) -> Result<()> {
        if let Some(reply_to) = reply_to {
            let payload = serde_json::to_vec(&serde_json::json!({ "error": error }))?;
            self.client
                .publish(reply_to.to_string(), payload.into())
                .await?;
        }
        Ok(())
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}
