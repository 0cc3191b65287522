use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;

use crate::history::{DecisionStore, MemoryDecisionStore};
use crate::model::artifact::{ArtifactMetrics, ModelArtifact, ARTIFACT_FORMAT_VERSION};
use crate::model::vectorizer::TfidfVectorizer;
use crate::model::{ScoreSource, SqlClassifier};
use crate::rules::{RuleConfig, RuleEngine};

use super::executor::{ExecError, ExecOutput, NullExecutor, SqlExecutor};
use super::types::{ExecutionOutcome, ThresholdBand, Verdict};
use super::DecisionGate;

/// Executor that counts calls and returns a fixed row count.
#[derive(Default)]
struct CountingExecutor {
    calls: AtomicUsize,
}

impl SqlExecutor for CountingExecutor {
    fn execute(&self, _sql: &str) -> Result<ExecOutput, ExecError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ExecOutput::Affected(1))
    }
}

/// Executor that always fails with an engine error.
struct FailingExecutor;

impl SqlExecutor for FailingExecutor {
    fn execute(&self, _sql: &str) -> Result<ExecOutput, ExecError> {
        Err(ExecError::Sql("no such table: nowhere".to_string()))
    }
}

/// Model whose only strong positive signal is the masked tautology.
fn tautology_artifact() -> ModelArtifact {
    let docs = vec![
        "select name from customer where id = val_str or val_str = val_str".to_string(),
        "select title from film where id = val_str or val_str = val_str".to_string(),
        "select name from customer limit val_num".to_string(),
        "select title from film limit val_num".to_string(),
    ];
    let mut vectorizer = TfidfVectorizer::default();
    vectorizer.fit(&docs).unwrap();

    let n = vectorizer.vocabulary_len();
    let mut weights = vec![0.0f32; n];
    for (index, _) in vectorizer.transform("val_str or val_str = val_str").unwrap() {
        weights[index] = 12.0;
    }
    ModelArtifact {
        format_version: ARTIFACT_FORMAT_VERSION,
        trained_at: Utc::now(),
        vocab_hash: vectorizer.vocab_hash(),
        vectorizer,
        weights,
        bias: -4.0,
        threshold: 0.8,
        metrics: ArtifactMetrics::default(),
    }
}

fn gate_with(
    classifier: Arc<SqlClassifier>,
    executor: Arc<dyn SqlExecutor>,
) -> (DecisionGate, Arc<MemoryDecisionStore>) {
    let history = Arc::new(MemoryDecisionStore::new());
    let gate = DecisionGate::new(
        RuleEngine::new(RuleConfig::default()),
        classifier,
        executor,
        history.clone(),
    );
    (gate, history)
}

#[test]
fn test_rule_block_skips_execution() {
    let executor = Arc::new(CountingExecutor::default());
    let (gate, history) = gate_with(Arc::new(SqlClassifier::new()), executor.clone());

    let decision = gate.decide("DROP TABLE users;").unwrap();

    assert_eq!(decision.verdict, Verdict::Blocked);
    assert_eq!(decision.rule_verdict.reason, "Blocked command: DROP");
    assert_eq!(decision.outcome, ExecutionOutcome::Skipped);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    assert_eq!(history.len().unwrap(), 1);
}

#[test]
fn test_rule_block_still_records_score() {
    let (gate, _) = gate_with(Arc::new(SqlClassifier::new()), Arc::new(NullExecutor));
    let decision = gate.decide("DROP TABLE users;").unwrap();
    // Untrained classifier: score logged as 0.0 with a visible source.
    assert_eq!(decision.score.probability, 0.0);
    assert_eq!(decision.score.source, ScoreSource::Untrained);
}

#[test]
fn test_safe_statement_executes_exactly_once() {
    let executor = Arc::new(CountingExecutor::default());
    let (gate, history) = gate_with(Arc::new(SqlClassifier::new()), executor.clone());

    let decision = gate.decide("SELECT * FROM customer LIMIT 10;").unwrap();

    assert_eq!(decision.verdict, Verdict::Allowed);
    assert!(!decision.flagged);
    assert_eq!(decision.outcome, ExecutionOutcome::RowCount(1));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(history.len().unwrap(), 1);
}

#[test]
fn test_classifier_blocks_above_high_threshold() {
    let classifier = Arc::new(SqlClassifier::new());
    classifier.publish(tautology_artifact());
    let executor = Arc::new(CountingExecutor::default());
    let (gate, _) = gate_with(classifier, executor.clone());

    // Passes the rule engine (no tautology token in the default blocklist)
    // but the statistical signal alone blocks it.
    let decision = gate
        .decide("SELECT * FROM customer WHERE id = '' OR '1'='1';")
        .unwrap();

    assert!(decision.rule_verdict.is_safe);
    assert!(decision.score.probability >= 0.8);
    assert_eq!(decision.verdict, Verdict::Blocked);
    assert_eq!(decision.outcome, ExecutionOutcome::Skipped);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_suspicious_band_allows_with_flag() {
    // Mild weights: the tautology scores inside the [low, high) band.
    let mut artifact = tautology_artifact();
    for weight in artifact.weights.iter_mut() {
        if *weight > 0.0 {
            *weight = 2.0;
        }
    }
    artifact.bias = -2.0;
    let classifier = Arc::new(SqlClassifier::new());
    classifier.publish(artifact);

    let executor = Arc::new(CountingExecutor::default());
    let history = Arc::new(MemoryDecisionStore::new());
    let gate = DecisionGate::with_band(
        RuleEngine::new(RuleConfig::default()),
        classifier,
        executor.clone(),
        history,
        ThresholdBand { low: 0.5, high: 0.8 },
    );

    let decision = gate
        .decide("SELECT * FROM customer WHERE id = '' OR '1'='1';")
        .unwrap();

    assert!(decision.score.probability >= 0.5);
    assert!(decision.score.probability < 0.8);
    assert_eq!(decision.verdict, Verdict::Allowed);
    assert!(decision.flagged);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_execution_error_recorded_on_allowed_decision() {
    let (gate, history) = gate_with(Arc::new(SqlClassifier::new()), Arc::new(FailingExecutor));

    let decision = gate.decide("SELECT * FROM nowhere;").unwrap();

    assert_eq!(decision.verdict, Verdict::Allowed);
    assert!(decision.outcome.is_error());
    assert_eq!(history.len().unwrap(), 1);
}

#[test]
fn test_no_connection_recorded_not_raised() {
    let (gate, _) = gate_with(Arc::new(SqlClassifier::new()), Arc::new(NullExecutor));

    let decision = gate.decide("SELECT 1;").unwrap();

    assert_eq!(decision.verdict, Verdict::Allowed);
    assert_eq!(
        decision.outcome,
        ExecutionOutcome::Error("no live database connection".to_string())
    );
}

#[test]
fn test_every_decide_appends_exactly_one_decision() {
    let (gate, history) = gate_with(Arc::new(SqlClassifier::new()), Arc::new(NullExecutor));
    gate.decide("SELECT 1;").unwrap();
    gate.decide("DROP TABLE t;").unwrap();
    gate.decide("").unwrap();
    assert_eq!(history.len().unwrap(), 3);
}

#[test]
fn test_calibrated_threshold_overrides_band() {
    let classifier = Arc::new(SqlClassifier::new());
    let mut artifact = tautology_artifact();
    artifact.threshold = 0.42;
    classifier.publish(artifact);

    let (gate, _) = gate_with(classifier, Arc::new(NullExecutor));
    assert!((gate.effective_high() - 0.42).abs() < 1e-6);
}
