//! Hand-authored risk rules evaluated alongside the classifier.
//!
//! Each rule looks at a single field against a fixed threshold. Findings are
//! returned in table order, which is also the order the reviewer sees them in.

use crate::types::{FeatureRecord, RuleFinding, Severity};

pub const LOCATION_DISTANCE_LIMIT_KM: f64 = 200.0;
pub const DEVICE_TRUST_FLOOR: f64 = 0.4;
pub const MIN_ACCOUNT_AGE_DAYS: u32 = 30;
pub const PREVIOUS_FRAUD_LIMIT: u32 = 2;

/// A single threshold rule
struct Rule {
    id: &'static str,
    severity: Severity,
    triggered: fn(&FeatureRecord) -> bool,
    message: fn(&FeatureRecord) -> String,
}

static RULES: [Rule; 4] = [
    Rule {
        id: "location",
        severity: Severity::Medium,
        triggered: |r| r.location_distance_km > LOCATION_DISTANCE_LIMIT_KM,
        message: |r| format!("location deviates {} km from usual", r.location_distance_km),
    },
    Rule {
        id: "device_trust",
        severity: Severity::Medium,
        triggered: |r| r.device_trust_score < DEVICE_TRUST_FLOOR,
        message: |_| format!("device trust score below threshold {}", DEVICE_TRUST_FLOOR),
    },
    Rule {
        id: "account_age",
        severity: Severity::Low,
        triggered: |r| r.account_age_days < MIN_ACCOUNT_AGE_DAYS,
        message: |_| format!("account younger than {} days", MIN_ACCOUNT_AGE_DAYS),
    },
    Rule {
        id: "previous_fraud",
        severity: Severity::High,
        triggered: |r| r.previous_fraud_reports > PREVIOUS_FRAUD_LIMIT,
        message: |_| {
            format!(
                "previous fraud reports exceed threshold {}",
                PREVIOUS_FRAUD_LIMIT
            )
        },
    },
];

/// Evaluates the fixed rule table over a record
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    /// Return every triggered rule in declaration order
    pub fn evaluate(&self, record: &FeatureRecord) -> Vec<RuleFinding> {
        RULES
            .iter()
            .filter(|rule| (rule.triggered)(record))
            .map(|rule| RuleFinding {
                rule_id: rule.id,
                human_message: (rule.message)(record),
                severity: rule.severity,
            })
            .collect()
    }

    pub fn rule_count(&self) -> usize {
        RULES.len()
    }

    /// Rule ids in declaration order
    pub fn rule_ids(&self) -> Vec<&'static str> {
        RULES.iter().map(|rule| rule.id).collect()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}
