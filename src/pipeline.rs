//! End-to-end evaluation of a single transaction.
//!
//! classify -> rules -> decide -> ledger append -> dispatch (flagged only).
//! The ledger write is always attempted before the alert, and neither a
//! ledger nor a notification failure turns the evaluation into an error.
//! Ledger writes are blocking and run on tokio's blocking pool.

use crate::decision::DecisionPolicy;
use crate::error::{EvaluationError, LedgerError, NotificationError};
use crate::ledger::{Ledger, LedgerEntry};
use crate::models::Classifier;
use crate::notifier::Notifier;
use crate::rules::RuleEngine;
use crate::types::{FeatureRecord, ReviewAlert, Verdict};
use serde::Serialize;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Outcome of the audit write
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum LedgerOutcome {
    Recorded,
    Failed(String),
}

/// Outcome of the review alert
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum NotificationOutcome {
    /// Verdict was record-only, nothing sent
    NotRequired,
    Delivered,
    Failed(String),
}

/// Everything the reviewer gets back for one transaction
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub record: FeatureRecord,
    pub verdict: Verdict,
    pub ledger: LedgerOutcome,
    pub notification: NotificationOutcome,
}

impl Evaluation {
    /// True when the audit write or the alert failed
    pub fn is_degraded(&self) -> bool {
        matches!(self.ledger, LedgerOutcome::Failed(_))
            || matches!(self.notification, NotificationOutcome::Failed(_))
    }
}

/// Review pipeline over a classifier, a ledger and a notifier
pub struct ReviewPipeline<C, L, N> {
    classifier: C,
    rules: RuleEngine,
    policy: DecisionPolicy,
    ledger: Arc<L>,
    notifier: N,
    notify_timeout: Duration,
}

impl<C, L, N> ReviewPipeline<C, L, N>
where
    C: Classifier,
    L: Ledger + 'static,
    N: Notifier,
{
    pub fn new(classifier: C, ledger: L, notifier: N, notify_timeout: Duration) -> Self {
        Self {
            classifier,
            rules: RuleEngine::new(),
            policy: DecisionPolicy::new(),
            ledger: Arc::new(ledger),
            notifier,
            notify_timeout,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Evaluate one transaction.
    ///
    /// Returns `Err` only for invalid input or a classifier failure, in which
    /// case nothing was written or sent.
    pub async fn evaluate(&self, record: FeatureRecord) -> Result<Evaluation, EvaluationError> {
        record.validate()?;

        let model_label = self.classifier.predict(&record)?;
        let findings = self.rules.evaluate(&record);
        let verdict = self.policy.decide(model_label, findings);

        let ledger = match self
            .append(LedgerEntry::new(record.clone(), model_label))
            .await
        {
            Ok(()) => LedgerOutcome::Recorded,
            Err(e) => {
                error!(
                    account_number = %record.account_number,
                    error = %e,
                    "Ledger append failed, audit record missing"
                );
                LedgerOutcome::Failed(e.to_string())
            }
        };

        let notification = if verdict.is_flagged() {
            let alert = ReviewAlert::new(
                record.account_number.clone(),
                record.transaction_amount,
                record.location_distance_km,
                Some(record.device_trust_score),
            );
            match self.dispatch(&alert).await {
                Ok(()) => {
                    info!(account_number = %record.account_number, "Review alert delivered");
                    NotificationOutcome::Delivered
                }
                Err(e) => {
                    warn!(
                        account_number = %record.account_number,
                        error = %e,
                        "Review alert delivery failed"
                    );
                    NotificationOutcome::Failed(e.to_string())
                }
            }
        } else {
            NotificationOutcome::NotRequired
        };

        Ok(Evaluation {
            record,
            verdict,
            ledger,
            notification,
        })
    }

    async fn append(&self, entry: LedgerEntry) -> Result<(), LedgerError> {
        let ledger = Arc::clone(&self.ledger);
        tokio::task::spawn_blocking(move || ledger.append(&entry))
            .await
            .map_err(|e| LedgerError::Io(io::Error::new(io::ErrorKind::Other, e)))?
    }

    async fn dispatch(&self, alert: &ReviewAlert) -> Result<(), NotificationError> {
        match tokio::time::timeout(self.notify_timeout, self.notifier.dispatch(alert)).await {
            Ok(result) => result,
            Err(_) => Err(NotificationError::Timeout(self.notify_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InputError, ModelError};
    use crate::ledger::CsvLedger;
    use crate::types::{Action, ModelLabel};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;
    use tempfile::tempdir;

    struct FixedClassifier(ModelLabel);

    impl Classifier for FixedClassifier {
        fn predict(&self, _record: &FeatureRecord) -> Result<ModelLabel, ModelError> {
            Ok(self.0)
        }
    }

    struct BrokenClassifier;

    impl Classifier for BrokenClassifier {
        fn predict(&self, _record: &FeatureRecord) -> Result<ModelLabel, ModelError> {
            Err(ModelError::Inference("session crashed".to_string()))
        }
    }

    #[derive(Default)]
    struct MemoryLedger {
        entries: Mutex<Vec<LedgerEntry>>,
    }

    impl Ledger for MemoryLedger {
        fn append(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        fn load_all(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
            Ok(self.entries.lock().unwrap().clone())
        }
    }

    struct FailingLedger;

    impl Ledger for FailingLedger {
        fn append(&self, _entry: &LedgerEntry) -> Result<(), LedgerError> {
            Err(LedgerError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }

        fn load_all(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
            Ok(Vec::new())
        }
    }

    /// Holds the calling thread for a fixed time on every append
    struct SlowLedger(Duration);

    impl Ledger for SlowLedger {
        fn append(&self, _entry: &LedgerEntry) -> Result<(), LedgerError> {
            std::thread::sleep(self.0);
            Ok(())
        }

        fn load_all(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
            Ok(Vec::new())
        }
    }

    struct PanickingLedger;

    impl Ledger for PanickingLedger {
        fn append(&self, _entry: &LedgerEntry) -> Result<(), LedgerError> {
            panic!("ledger backend crashed");
        }

        fn load_all(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
            Ok(Vec::new())
        }
    }

    /// Records every alert; optionally fails or stalls
    #[derive(Clone, Default)]
    struct SpyNotifier {
        sent: Arc<Mutex<Vec<ReviewAlert>>>,
        fail: bool,
        stall: Option<Duration>,
    }

    impl SpyNotifier {
        fn calls(&self) -> Vec<ReviewAlert> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Notifier for SpyNotifier {
        async fn dispatch(&self, alert: &ReviewAlert) -> Result<(), NotificationError> {
            self.sent.lock().unwrap().push(alert.clone());
            if let Some(stall) = self.stall {
                tokio::time::sleep(stall).await;
            }
            if self.fail {
                return Err(NotificationError::Transport("connection refused".to_string()));
            }
            Ok(())
        }
    }

    fn pipeline<C: Classifier, L: Ledger + 'static>(
        classifier: C,
        ledger: L,
        notifier: SpyNotifier,
    ) -> ReviewPipeline<C, L, SpyNotifier> {
        ReviewPipeline::new(classifier, ledger, notifier, Duration::from_millis(200))
    }

    fn quiet_record() -> FeatureRecord {
        FeatureRecord::new("31415926", 1800.0).with_risk_profile(300, 0.7, 100.0, 0)
    }

    fn risky_record() -> FeatureRecord {
        FeatureRecord::new("27182818", 9400.0)
            .with_holder("M. Iyer")
            .with_risk_profile(10, 0.2, 500.0, 3)
    }

    #[tokio::test]
    async fn test_quiet_transaction_is_recorded_only() {
        let spy = SpyNotifier::default();
        let pipeline = pipeline(
            FixedClassifier(ModelLabel::Fraudulent),
            MemoryLedger::default(),
            spy.clone(),
        );

        let evaluation = pipeline.evaluate(quiet_record()).await.unwrap();

        assert_eq!(evaluation.verdict.model_label, ModelLabel::Fraudulent);
        assert!(evaluation.verdict.findings.is_empty());
        assert_eq!(evaluation.verdict.action, Action::RecordOnly);
        assert_eq!(evaluation.ledger, LedgerOutcome::Recorded);
        assert_eq!(evaluation.notification, NotificationOutcome::NotRequired);
        assert!(spy.calls().is_empty());

        let entries = pipeline.ledger().load_all().unwrap();
        assert_eq!(entries, vec![LedgerEntry::new(quiet_record(), ModelLabel::Fraudulent)]);
    }

    #[tokio::test]
    async fn test_risky_transaction_notifies_once() {
        let spy = SpyNotifier::default();
        let pipeline = pipeline(
            FixedClassifier(ModelLabel::Legitimate),
            MemoryLedger::default(),
            spy.clone(),
        );

        let evaluation = pipeline.evaluate(risky_record()).await.unwrap();

        let ids: Vec<_> = evaluation.verdict.findings.iter().map(|f| f.rule_id).collect();
        assert_eq!(
            ids,
            vec!["location", "device_trust", "account_age", "previous_fraud"]
        );
        assert_eq!(evaluation.verdict.action, Action::FlagForReview);
        assert_eq!(evaluation.notification, NotificationOutcome::Delivered);

        let calls = spy.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], ReviewAlert::new("27182818", 9400.0, 500.0, Some(0.2)));
    }

    #[tokio::test]
    async fn test_ledger_failure_still_returns_verdict() {
        let spy = SpyNotifier::default();
        let pipeline = pipeline(FixedClassifier(ModelLabel::Legitimate), FailingLedger, spy.clone());

        let evaluation = pipeline.evaluate(risky_record()).await.unwrap();

        assert!(matches!(evaluation.ledger, LedgerOutcome::Failed(ref r) if r.contains("disk full")));
        assert_eq!(evaluation.verdict.action, Action::FlagForReview);
        assert_eq!(evaluation.notification, NotificationOutcome::Delivered);
        assert_eq!(spy.calls().len(), 1);
        assert!(evaluation.is_degraded());
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_ledger_entry() {
        let spy = SpyNotifier {
            fail: true,
            ..Default::default()
        };
        let pipeline = pipeline(
            FixedClassifier(ModelLabel::Fraudulent),
            MemoryLedger::default(),
            spy.clone(),
        );

        let evaluation = pipeline.evaluate(risky_record()).await.unwrap();

        assert!(matches!(evaluation.notification, NotificationOutcome::Failed(_)));
        assert_eq!(evaluation.ledger, LedgerOutcome::Recorded);
        assert_eq!(pipeline.ledger().load_all().unwrap().len(), 1);
        assert_eq!(spy.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_slow_notification_times_out() {
        let spy = SpyNotifier {
            stall: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        let pipeline = pipeline(
            FixedClassifier(ModelLabel::Legitimate),
            MemoryLedger::default(),
            spy.clone(),
        );

        let evaluation = pipeline.evaluate(risky_record()).await.unwrap();

        match evaluation.notification {
            NotificationOutcome::Failed(reason) => assert!(reason.contains("timed out")),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(evaluation.verdict.action, Action::FlagForReview);
    }

    #[tokio::test]
    async fn test_invalid_input_has_no_side_effects() {
        let spy = SpyNotifier::default();
        let pipeline = pipeline(
            FixedClassifier(ModelLabel::Legitimate),
            MemoryLedger::default(),
            spy.clone(),
        );

        let mut record = risky_record();
        record.device_trust_score = 1.5;
        let result = pipeline.evaluate(record).await;

        assert!(matches!(
            result,
            Err(EvaluationError::Input(InputError::TrustScoreOutOfRange(_)))
        ));
        assert!(pipeline.ledger().load_all().unwrap().is_empty());
        assert!(spy.calls().is_empty());
    }

    #[tokio::test]
    async fn test_classifier_failure_aborts_before_side_effects() {
        let spy = SpyNotifier::default();
        let pipeline = pipeline(BrokenClassifier, MemoryLedger::default(), spy.clone());

        let result = pipeline.evaluate(risky_record()).await;

        assert!(matches!(result, Err(EvaluationError::Model(_))));
        assert!(pipeline.ledger().load_all().unwrap().is_empty());
        assert!(spy.calls().is_empty());
    }

    #[tokio::test]
    async fn test_notifier_invoked_only_for_flagged_verdicts() {
        let spy = SpyNotifier::default();
        let pipeline = pipeline(
            FixedClassifier(ModelLabel::Legitimate),
            MemoryLedger::default(),
            spy.clone(),
        );

        let records = vec![
            quiet_record(),
            risky_record(),
            quiet_record().with_risk_profile(300, 0.7, 201.0, 0),
            quiet_record().with_risk_profile(30, 0.4, 200.0, 2),
        ];

        let mut flagged = 0;
        for record in records {
            let evaluation = pipeline.evaluate(record).await.unwrap();
            if evaluation.verdict.is_flagged() {
                flagged += 1;
            } else {
                assert_eq!(evaluation.notification, NotificationOutcome::NotRequired);
            }
        }

        assert_eq!(flagged, 2);
        assert_eq!(spy.calls().len(), flagged);
        assert_eq!(pipeline.ledger().load_all().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_csv_ledger_end_to_end() {
        let dir = tempdir().unwrap();
        let ledger = CsvLedger::new(dir.path().join("fraud_ledger.csv"));
        let pipeline = pipeline(
            FixedClassifier(ModelLabel::Fraudulent),
            ledger,
            SpyNotifier::default(),
        );

        pipeline.evaluate(quiet_record()).await.unwrap();
        pipeline.evaluate(risky_record()).await.unwrap();

        let entries = pipeline.ledger().load_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].record, risky_record());
        assert_eq!(entries[1].model_label, ModelLabel::Fraudulent);
    }

    #[tokio::test]
    async fn test_ledger_write_does_not_stall_runtime() {
        let pipeline = pipeline(
            FixedClassifier(ModelLabel::Legitimate),
            SlowLedger(Duration::from_millis(300)),
            SpyNotifier::default(),
        );

        let ((evaluation, evaluated_at), ticked_at) = tokio::join!(
            async {
                let evaluation = pipeline.evaluate(quiet_record()).await.unwrap();
                (evaluation, Instant::now())
            },
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Instant::now()
            },
        );

        assert_eq!(evaluation.ledger, LedgerOutcome::Recorded);
        assert!(ticked_at < evaluated_at);
    }

    #[tokio::test]
    async fn test_crashed_ledger_write_is_reported_as_failure() {
        let spy = SpyNotifier::default();
        let pipeline = pipeline(FixedClassifier(ModelLabel::Legitimate), PanickingLedger, spy.clone());

        let evaluation = pipeline.evaluate(risky_record()).await.unwrap();

        assert!(matches!(evaluation.ledger, LedgerOutcome::Failed(_)));
        assert_eq!(evaluation.notification, NotificationOutcome::Delivered);
        assert_eq!(spy.calls().len(), 1);
    }

    #[test]
    fn test_evaluation_serialization() {
        let evaluation = Evaluation {
            record: quiet_record(),
            verdict: crate::decision::DecisionPolicy::new()
                .decide(ModelLabel::Legitimate, Vec::new()),
            ledger: LedgerOutcome::Failed("disk full".to_string()),
            notification: NotificationOutcome::NotRequired,
        };

        let json = serde_json::to_value(&evaluation).unwrap();
        assert_eq!(json["verdict"]["action"], "record_only");
        assert_eq!(json["ledger"]["status"], "failed");
        assert_eq!(json["ledger"]["reason"], "disk full");
        assert_eq!(json["notification"]["status"], "not_required");
    }
}
