//! Verdict data structures

use serde::{Deserialize, Serialize};

/// Headline call of the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelLabel {
    Legitimate,
    Fraudulent,
}

impl ModelLabel {
    /// Map a binary class id to a label (1 = fraudulent)
    pub fn from_class(class: i64) -> Self {
        if class == 1 {
            ModelLabel::Fraudulent
        } else {
            ModelLabel::Legitimate
        }
    }

    /// Value of the ledger `is_fraud` column
    pub fn is_fraud(self) -> u8 {
        match self {
            ModelLabel::Legitimate => 0,
            ModelLabel::Fraudulent => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelLabel::Legitimate => "legitimate",
            ModelLabel::Fraudulent => "fraudulent",
        }
    }
}

/// Severity attached to a triggered rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One triggered risk rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleFinding {
    /// Stable rule identifier
    pub rule_id: &'static str,
    /// Human-readable reason shown to the reviewer
    pub human_message: String,
    pub severity: Severity,
}

/// What the pipeline does with the transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    RecordOnly,
    FlagForReview,
}

/// Combined outcome of classification and rule evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub model_label: ModelLabel,
    /// Triggered rules in declaration order
    pub findings: Vec<RuleFinding>,
    pub action: Action,
}

impl Verdict {
    pub fn is_flagged(&self) -> bool {
        self.action == Action::FlagForReview
    }

    /// Alert text listing every triggered rule, `None` for record-only verdicts
    pub fn review_message(&self) -> Option<String> {
        if !self.is_flagged() {
            return None;
        }

        let mut message = String::from("This transaction has triggered the following alerts:");
        for finding in &self.findings {
            message.push_str("\n- ");
            message.push_str(&finding.human_message);
        }
        Some(message)
    }
}
