//! Review alert data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subject line of every review alert
pub const ALERT_SUBJECT: &str = "Bank Account Alert: Unusual Transaction";

/// Alert for a transaction flagged for manual review.
///
/// Built only from the values passed in; the rendered text is a pure
/// function of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAlert {
    pub account_number: String,
    pub transaction_amount: f64,
    pub location_distance_km: f64,
    /// Omitted from the message when unknown
    pub device_trust_score: Option<f64>,
}

impl ReviewAlert {
    pub fn new(
        account_number: impl Into<String>,
        transaction_amount: f64,
        location_distance_km: f64,
        device_trust_score: Option<f64>,
    ) -> Self {
        Self {
            account_number: account_number.into(),
            transaction_amount,
            location_distance_km,
            device_trust_score,
        }
    }

    pub fn subject(&self) -> &'static str {
        ALERT_SUBJECT
    }

    /// Render the message body
    pub fn body(&self) -> String {
        let mut body = String::from(
            "Hello,\n\nA transaction has been initiated from your Bank Account.\n\n",
        );
        body.push_str(&format!("Account Number: {}\n", self.account_number));
        body.push_str(&format!(
            "Transaction Amount: {:.2}\n",
            self.transaction_amount
        ));
        body.push_str(&format!(
            "Location Distance from Usual: {} km\n",
            self.location_distance_km
        ));
        if let Some(score) = self.device_trust_score {
            body.push_str(&format!("Device Trustworthy Score: {} out of 0 - 1\n", score));
        }
        body.push_str(
            "\nThis transaction appears to be unusual. If this was you, please approve it.\n\n-Security Team\n",
        );
        body
    }
}

/// Wire form of a review alert published to the notification channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEnvelope {
    /// Unique alert identifier
    pub alert_id: String,

    /// Mailbox or channel the alert is addressed to
    pub recipient: String,

    pub subject: String,

    pub body: String,

    /// Structured copy of the message inputs
    pub alert: ReviewAlert,

    /// Alert generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl AlertEnvelope {
    pub fn new(alert: &ReviewAlert, recipient: &str) -> Self {
        Self {
            alert_id: uuid::Uuid::new_v4().to_string(),
            recipient: recipient.to_string(),
            subject: alert.subject().to_string(),
            body: alert.body(),
            alert: alert.clone(),
            timestamp: Utc::now(),
        }
    }
}
