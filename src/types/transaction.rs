//! Transaction record submitted for review

use crate::error::InputError;
use serde::{Deserialize, Deserializer, Serialize};

/// One transaction as entered by the reviewer.
///
/// Integer fields are unsigned, so only the real-valued fields need
/// range checks (see [`FeatureRecord::validate`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Opaque account identifier, used for audit and alert addressing only
    pub account_number: String,

    /// Display name of the account holder
    #[serde(default, deserialize_with = "empty_as_none")]
    pub account_holder: Option<String>,

    /// Transaction amount (currency-agnostic)
    pub transaction_amount: f64,

    /// Age of the account in days
    pub account_age_days: u32,

    /// Device trust score in [0.0, 1.0]
    pub device_trust_score: f64,

    /// Distance from the usual transaction location in km
    pub location_distance_km: f64,

    /// Fraud reports previously filed against the account
    pub previous_fraud_reports: u32,

    /// Transactions on the account during the last hour
    pub transactions_last_hour: u32,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

impl FeatureRecord {
    /// Create a record with neutral risk attributes
    pub fn new(account_number: impl Into<String>, transaction_amount: f64) -> Self {
        Self {
            account_number: account_number.into(),
            account_holder: None,
            transaction_amount,
            account_age_days: 300,
            device_trust_score: 0.7,
            location_distance_km: 100.0,
            previous_fraud_reports: 0,
            transactions_last_hour: 2,
        }
    }

    pub fn with_holder(mut self, holder: impl Into<String>) -> Self {
        let holder = holder.into();
        self.account_holder = (!holder.trim().is_empty()).then_some(holder);
        self
    }

    /// Set the four attributes inspected by the risk rules
    pub fn with_risk_profile(
        mut self,
        account_age_days: u32,
        device_trust_score: f64,
        location_distance_km: f64,
        previous_fraud_reports: u32,
    ) -> Self {
        self.account_age_days = account_age_days;
        self.device_trust_score = device_trust_score;
        self.location_distance_km = location_distance_km;
        self.previous_fraud_reports = previous_fraud_reports;
        self
    }

    pub fn with_transactions_last_hour(mut self, count: u32) -> Self {
        self.transactions_last_hour = count;
        self
    }

    /// Check every field against its declared domain
    pub fn validate(&self) -> Result<(), InputError> {
        if self.account_number.trim().is_empty() {
            return Err(InputError::MissingAccountNumber);
        }

        check_non_negative("transaction_amount", self.transaction_amount)?;
        check_non_negative("location_distance_km", self.location_distance_km)?;

        if !self.device_trust_score.is_finite() {
            return Err(InputError::NotFinite {
                field: "device_trust_score",
                value: self.device_trust_score,
            });
        }
        if !(0.0..=1.0).contains(&self.device_trust_score) {
            return Err(InputError::TrustScoreOutOfRange(self.device_trust_score));
        }

        Ok(())
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), InputError> {
    if !value.is_finite() {
        return Err(InputError::NotFinite { field, value });
    }
    if value < 0.0 {
        return Err(InputError::Negative { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_valid() {
        let record = FeatureRecord::new("12345678", 2500.0).with_holder("A. Sharma");
        assert!(record.validate().is_ok());
        assert_eq!(record.account_holder.as_deref(), Some("A. Sharma"));
    }

    #[test]
    fn test_blank_holder_is_none() {
        let record = FeatureRecord::new("12345678", 10.0).with_holder("  ");
        assert_eq!(record.account_holder, None);

        let json = r#"{
            "account_number": "1",
            "account_holder": "",
            "transaction_amount": 1.0,
            "account_age_days": 1,
            "device_trust_score": 0.5,
            "location_distance_km": 1.0,
            "previous_fraud_reports": 0,
            "transactions_last_hour": 0
        }"#;
        let parsed: FeatureRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.account_holder, None);
    }

    #[test]
    fn test_validation_rejects_out_of_domain_values() {
        let base = FeatureRecord::new("12345678", 100.0);

        let mut record = base.clone();
        record.device_trust_score = 1.2;
        assert_eq!(
            record.validate(),
            Err(InputError::TrustScoreOutOfRange(1.2))
        );

        let mut record = base.clone();
        record.transaction_amount = -1.0;
        assert!(matches!(
            record.validate(),
            Err(InputError::Negative { field: "transaction_amount", .. })
        ));

        let mut record = base.clone();
        record.location_distance_km = f64::NAN;
        assert!(matches!(
            record.validate(),
            Err(InputError::NotFinite { field: "location_distance_km", .. })
        ));

        let mut record = base;
        record.account_number = String::new();
        assert_eq!(record.validate(), Err(InputError::MissingAccountNumber));
    }

    #[test]
    fn test_negative_counts_do_not_deserialize() {
        let json = r#"{
            "account_number": "1",
            "transaction_amount": 1.0,
            "account_age_days": -5,
            "device_trust_score": 0.5,
            "location_distance_km": 1.0,
            "previous_fraud_reports": 0,
            "transactions_last_hour": 0
        }"#;
        assert!(serde_json::from_str::<FeatureRecord>(json).is_err());
    }
}
