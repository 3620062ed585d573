//! Merges the classifier label and rule findings into a verdict

use crate::types::{Action, ModelLabel, RuleFinding, Verdict};

/// Decision policy.
///
/// The model label is reported as the headline verdict. Review is driven by
/// the rules alone: any finding flags the transaction, whatever the label.
pub struct DecisionPolicy;

impl DecisionPolicy {
    pub fn new() -> Self {
        Self
    }

    pub fn decide(&self, model_label: ModelLabel, findings: Vec<RuleFinding>) -> Verdict {
        let action = if findings.is_empty() {
            Action::RecordOnly
        } else {
            Action::FlagForReview
        };

        Verdict {
            model_label,
            findings,
            action,
        }
    }
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::new()
    }
}
