//! Review alert delivery

use crate::error::NotificationError;
use crate::types::alert::{AlertEnvelope, ReviewAlert};
use async_nats::Client;
use std::future::Future;
use tracing::debug;

/// Out-of-band channel for transactions flagged for review.
///
/// One attempt per call; the caller decides what a failure means.
pub trait Notifier: Send + Sync {
    fn dispatch(
        &self,
        alert: &ReviewAlert,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;
}

/// Publishes review alerts to a NATS subject
#[derive(Clone)]
pub struct NatsNotifier {
    client: Client,
    subject: String,
    recipient: String,
}

impl NatsNotifier {
    pub fn new(client: Client, subject: &str, recipient: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
            recipient: recipient.to_string(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Wrap an alert for `recipient` and encode it as the published JSON payload
pub fn encode_alert(
    alert: &ReviewAlert,
    recipient: &str,
) -> Result<(AlertEnvelope, Vec<u8>), NotificationError> {
    let envelope = AlertEnvelope::new(alert, recipient);
    let payload = serde_json::to_vec(&envelope)?;
    Ok((envelope, payload))
}

impl Notifier for NatsNotifier {
    async fn dispatch(&self, alert: &ReviewAlert) -> Result<(), NotificationError> {
        let (envelope, payload) = encode_alert(alert, &self.recipient)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;
        self.client
            .flush()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        debug!(
            alert_id = %envelope.alert_id,
            account_number = %alert.account_number,
            subject = %self.subject,
            "Published review alert"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::alert::ALERT_SUBJECT;

    #[test]
    fn test_encoded_alert_carries_rendered_message() {
        let alert = ReviewAlert::new("48213377", 2500.0, 500.0, Some(0.2));
        let (envelope, payload) = encode_alert(&alert, "fraud-team@bank.example").unwrap();

        let decoded: AlertEnvelope = serde_json::from_slice(&payload).unwrap();
        assert_eq!(decoded.alert_id, envelope.alert_id);
        assert_eq!(decoded.recipient, "fraud-team@bank.example");
        assert_eq!(decoded.subject, ALERT_SUBJECT);
        assert_eq!(decoded.body, alert.body());
        assert_eq!(decoded.alert, alert);
    }

    #[test]
    fn test_each_encoding_gets_a_fresh_alert_id() {
        let alert = ReviewAlert::new("48213377", 99.5, 250.5, None);
        let (first, _) = encode_alert(&alert, "ops").unwrap();
        let (second, _) = encode_alert(&alert, "ops").unwrap();

        assert_ne!(first.alert_id, second.alert_id);
        assert_eq!(first.body, second.body);
    }

    #[test]
    fn test_payload_is_json_object_with_alert_fields() {
        let alert = ReviewAlert::new("1", 10.0, 300.0, None);
        let (_, payload) = encode_alert(&alert, "ops").unwrap();

        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["alert"]["account_number"], "1");
        assert!(value["alert"]["device_trust_score"].is_null());
        assert!(value["timestamp"].is_string());
    }
}
