//! Evaluation Metrics
//!
//! Per-class precision/recall/F1 report, ROC-AUC (rank statistic with tie
//! averaging), precision-recall curve, and the precision-targeted
//! threshold scan used for calibration.

use serde::{Deserialize, Serialize};

/// Precision/recall/F1/support for one class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub support: usize,
}

/// Two-class evaluation summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Class 0 (allowed / safe)
    pub negative: ClassMetrics,
    /// Class 1 (blocked / threat)
    pub positive: ClassMetrics,
    pub accuracy: f32,
}

impl std::fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:>12} {:>10} {:>10} {:>10} {:>10}", "", "precision", "recall", "f1-score", "support")?;
        for (name, class) in [("0", &self.negative), ("1", &self.positive)] {
            writeln!(
                f,
                "{:>12} {:>10.4} {:>10.4} {:>10.4} {:>10}",
                name, class.precision, class.recall, class.f1, class.support
            )?;
        }
        write!(
            f,
            "{:>12} {:>10} {:>10} {:>10.4} {:>10}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.negative.support + self.positive.support
        )
    }
}

fn class_metrics(y_true: &[u8], y_pred: &[u8], class: u8) -> ClassMetrics {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    let mut support = 0usize;
    for (&truth, &pred) in y_true.iter().zip(y_pred.iter()) {
        if truth == class {
            support += 1;
        }
        match (truth == class, pred == class) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }
    let precision = if tp + fp > 0 { tp as f32 / (tp + fp) as f32 } else { 0.0 };
    let recall = if tp + fn_ > 0 { tp as f32 / (tp + fn_) as f32 } else { 0.0 };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    ClassMetrics {
        precision,
        recall,
        f1,
        support,
    }
}

/// Full two-class report.
pub fn classification_report(y_true: &[u8], y_pred: &[u8]) -> ClassificationReport {
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    let accuracy = if y_true.is_empty() {
        0.0
    } else {
        correct as f32 / y_true.len() as f32
    };
    ClassificationReport {
        negative: class_metrics(y_true, y_pred, 0),
        positive: class_metrics(y_true, y_pred, 1),
        accuracy,
    }
}

/// F1 of the positive class; the grid-search objective.
pub fn f1_score(y_true: &[u8], y_pred: &[u8]) -> f32 {
    class_metrics(y_true, y_pred, 1).f1
}

/// Area under the ROC curve via the rank statistic, ties averaged.
/// Degenerate single-class input scores 0.5.
pub fn roc_auc(y_true: &[u8], scores: &[f32]) -> f32 {
    let positives = y_true.iter().filter(|&&label| label == 1).count();
    let negatives = y_true.len() - positives;
    if positives == 0 || negatives == 0 {
        log::warn!("ROC-AUC undefined for single-class input, reporting 0.5");
        return 0.5;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(std::cmp::Ordering::Equal));

    // Average ranks across tied scores (1-based ranks).
    let mut ranks = vec![0.0f64; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        let rank = (start + 1 + end + 1) as f64 / 2.0;
        for &index in &order[start..=end] {
            ranks[index] = rank;
        }
        start = end + 1;
    }

    let positive_rank_sum: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(&label, _)| label == 1)
        .map(|(_, &rank)| rank)
        .sum();
    let auc = (positive_rank_sum - (positives * (positives + 1)) as f64 / 2.0)
        / (positives * negatives) as f64;
    auc as f32
}

/// One cut-point on the precision-recall curve.
#[derive(Debug, Clone, Copy)]
pub struct PrPoint {
    pub threshold: f32,
    pub precision: f32,
    pub recall: f32,
}

/// Precision/recall at every distinct score, highest threshold first.
pub fn precision_recall_curve(y_true: &[u8], scores: &[f32]) -> Vec<PrPoint> {
    let total_positives = y_true.iter().filter(|&&label| label == 1).count();
    if total_positives == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(std::cmp::Ordering::Equal));

    let mut points = Vec::new();
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut position = 0;
    while position < order.len() {
        let threshold = scores[order[position]];
        // Consume the whole tie group before emitting a point.
        while position < order.len() && scores[order[position]] == threshold {
            if y_true[order[position]] == 1 {
                tp += 1;
            } else {
                fp += 1;
            }
            position += 1;
        }
        points.push(PrPoint {
            threshold,
            precision: tp as f32 / (tp + fp) as f32,
            recall: tp as f32 / total_positives as f32,
        });
    }
    points
}

/// Scan cut-points from the highest probability downward; first one whose
/// precision meets the target wins. `None` means calibration failed.
pub fn calibrate_threshold(y_true: &[u8], scores: &[f32], target_precision: f32) -> Option<f32> {
    precision_recall_curve(y_true, scores)
        .into_iter()
        .find(|point| point.precision >= target_precision)
        .map(|point| point.threshold)
}
