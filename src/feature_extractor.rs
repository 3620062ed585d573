//! Feature extraction for classifier inference.
//!
//! The classifier was trained on the ledger table with the identifier,
//! display name and label columns dropped. Features are produced in the
//! remaining column order.

use crate::types::FeatureRecord;

const FEATURE_NAMES: [&str; 6] = [
    "transaction_amount",
    "account_age_days",
    "device_trust_score",
    "location_distance_km",
    "previous_fraud_reports",
    "transactions_last_hour",
];

/// Turns a record into the model input vector
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the feature vector, `account_number` excluded
    pub fn extract(&self, record: &FeatureRecord) -> Vec<f32> {
        vec![
            record.transaction_amount as f32,
            record.account_age_days as f32,
            record.device_trust_score as f32,
            record.location_distance_km as f32,
            record.previous_fraud_reports as f32,
            record.transactions_last_hour as f32,
        ]
    }

    pub fn feature_count(&self) -> usize {
        FEATURE_NAMES.len()
    }

    /// Feature names in training column order
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_extraction() {
        let extractor = FeatureExtractor::new();
        let record = FeatureRecord::new("99999999", 1250.0)
            .with_risk_profile(45, 0.25, 320.0, 1)
            .with_transactions_last_hour(7);

        let features = extractor.extract(&record);

        assert_eq!(features.len(), extractor.feature_count());
        assert_eq!(features, vec![1250.0, 45.0, 0.25, 320.0, 1.0, 7.0]);
    }

    #[test]
    fn test_feature_names() {
        let extractor = FeatureExtractor::new();
        assert_eq!(extractor.feature_names().len(), 6);
        assert!(!extractor.feature_names().contains(&"account_number"));
    }
}
