// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Evaluation metrics for the binary screening task
//!
//! Implements the standard classification-report computation: confusion
//! matrix, per-class precision/recall/F1/support, accuracy, and macro and
//! support-weighted averages.

use crate::datasets::Label;
use serde::{Deserialize, Serialize};

/// Benchmark aggregate accuracy the screening model is measured against
pub const BENCHMARK_ACCURACY: f64 = 0.86;

/// Confusion matrix for binary classification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// True Positives (correctly predicted healthy living)
    pub tp: usize,
    /// True Negatives (correctly predicted other)
    pub tn: usize,
    /// False Positives (other predicted as healthy living)
    pub fp: usize,
    /// False Negatives (healthy living predicted as other)
    pub fn_: usize,
}

impl ConfusionMatrix {
    /// Create from predictions and ground truth labels
    pub fn from_predictions(predictions: &[Label], ground_truth: &[Label]) -> Self {
        assert_eq!(
            predictions.len(),
            ground_truth.len(),
            "Prediction and ground truth lengths must match"
        );

        let mut matrix = Self::default();

        for (pred, truth) in predictions.iter().zip(ground_truth.iter()) {
            match (pred, truth) {
                (Label::HealthyLiving, Label::HealthyLiving) => matrix.tp += 1,
                (Label::Other, Label::Other) => matrix.tn += 1,
                (Label::HealthyLiving, Label::Other) => matrix.fp += 1,
                (Label::Other, Label::HealthyLiving) => matrix.fn_ += 1,
            }
        }

        matrix
    }

    /// Total number of samples
    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// Accuracy: (TP + TN) / Total
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.tp + self.tn) as f64 / total as f64
    }

    /// Positive-class precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// Positive-class recall: TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// Negative-class precision: TN / (TN + FN)
    pub fn negative_precision(&self) -> f64 {
        ratio(self.tn, self.tn + self.fn_)
    }

    /// Negative-class recall (specificity): TN / (TN + FP)
    pub fn negative_recall(&self) -> f64 {
        ratio(self.tn, self.tn + self.fp)
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

fn f1(precision: f64, recall: f64) -> f64 {
    let denom = precision + recall;
    if denom == 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / denom
}

/// Per-class metrics row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Full classification report in the standard layout: one row per class,
/// aggregate accuracy, macro and support-weighted averages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub confusion_matrix: ConfusionMatrix,
    /// Class 0 (other)
    pub negative: ClassMetrics,
    /// Class 1 (healthy living)
    pub positive: ClassMetrics,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub support: usize,
}

impl ClassificationReport {
    /// Generate full report from a confusion matrix
    pub fn from_confusion_matrix(cm: ConfusionMatrix) -> Self {
        let positive = ClassMetrics {
            precision: cm.precision(),
            recall: cm.recall(),
            f1_score: f1(cm.precision(), cm.recall()),
            support: cm.tp + cm.fn_,
        };
        let negative = ClassMetrics {
            precision: cm.negative_precision(),
            recall: cm.negative_recall(),
            f1_score: f1(cm.negative_precision(), cm.negative_recall()),
            support: cm.tn + cm.fp,
        };

        let support = cm.total();
        let macro_avg = ClassMetrics {
            precision: (negative.precision + positive.precision) / 2.0,
            recall: (negative.recall + positive.recall) / 2.0,
            f1_score: (negative.f1_score + positive.f1_score) / 2.0,
            support,
        };

        let (wn, wp) = if support == 0 {
            (0.0, 0.0)
        } else {
            (
                negative.support as f64 / support as f64,
                positive.support as f64 / support as f64,
            )
        };
        let weighted_avg = ClassMetrics {
            precision: wn * negative.precision + wp * positive.precision,
            recall: wn * negative.recall + wp * positive.recall,
            f1_score: wn * negative.f1_score + wp * positive.f1_score,
            support,
        };

        Self {
            accuracy: cm.accuracy(),
            negative,
            positive,
            macro_avg,
            weighted_avg,
            support,
            confusion_matrix: cm,
        }
    }

    /// Generate report from predictions and ground truth
    pub fn from_predictions(predictions: &[Label], ground_truth: &[Label]) -> Self {
        let cm = ConfusionMatrix::from_predictions(predictions, ground_truth);
        Self::from_confusion_matrix(cm)
    }

    /// Whether aggregate accuracy clears the benchmark target
    pub fn meets_benchmark(&self, target_accuracy: f64) -> bool {
        self.accuracy >= target_accuracy
    }

    /// Format as a human-readable report
    pub fn format(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:>14} {:>9} {:>9} {:>9}\n\n",
            "precision", "recall", "f1-score", "support"
        ));

        for (name, class) in [("0", &self.negative), ("1", &self.positive)] {
            out.push_str(&format!(
                "{:>4} {:>9.2} {:>9.2} {:>9.2} {:>9}\n",
                name, class.precision, class.recall, class.f1_score, class.support
            ));
        }

        out.push('\n');
        out.push_str(&format!(
            "{:>4} {:>29.2} {:>9}\n",
            "accuracy", self.accuracy, self.support
        ));
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            out.push_str(&format!(
                "{:>12} {:>6.2} {:>9.2} {:>9.2} {:>9}\n",
                name, avg.precision, avg.recall, avg.f1_score, avg.support
            ));
        }

        out.push_str(&format!(
            "\nConfusion Matrix:\n                 Predicted\n                 Health    Other\nActual Health   {:>6}   {:>6}\n       Other    {:>6}   {:>6}\n",
            self.confusion_matrix.tp,
            self.confusion_matrix.fn_,
            self.confusion_matrix.fp,
            self.confusion_matrix.tn,
        ));

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_matrix_perfect() {
        let predictions = vec![
            Label::HealthyLiving,
            Label::HealthyLiving,
            Label::Other,
            Label::Other,
        ];
        let ground_truth = predictions.clone();

        let cm = ConfusionMatrix::from_predictions(&predictions, &ground_truth);

        assert_eq!(cm.tp, 2);
        assert_eq!(cm.tn, 2);
        assert_eq!(cm.fp, 0);
        assert_eq!(cm.fn_, 0);
        assert!((cm.accuracy() - 1.0).abs() < 1e-6);
        assert!((cm.precision() - 1.0).abs() < 1e-6);
        assert!((cm.recall() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_confusion_matrix_worst() {
        let predictions = vec![Label::Other, Label::Other, Label::HealthyLiving];
        let ground_truth = vec![Label::HealthyLiving, Label::HealthyLiving, Label::Other];

        let cm = ConfusionMatrix::from_predictions(&predictions, &ground_truth);

        assert_eq!(cm.tp, 0);
        assert_eq!(cm.tn, 0);
        assert_eq!(cm.fp, 1);
        assert_eq!(cm.fn_, 2);
        assert!((cm.accuracy() - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_report_mixed_predictions() {
        let predictions = vec![
            Label::HealthyLiving,
            Label::HealthyLiving,
            Label::Other,
            Label::Other,
        ];
        let ground_truth = vec![
            Label::HealthyLiving,
            Label::Other,
            Label::Other,
            Label::HealthyLiving,
        ];

        let report = ClassificationReport::from_predictions(&predictions, &ground_truth);

        assert!((report.accuracy - 0.5).abs() < 1e-6);
        assert_eq!(report.positive.support, 2);
        assert_eq!(report.negative.support, 2);
        assert!((report.positive.precision - 0.5).abs() < 1e-6);
        assert!((report.positive.recall - 0.5).abs() < 1e-6);
        assert_eq!(report.support, 4);
    }

    #[test]
    fn test_weighted_avg_respects_supports() {
        // 3 positives all correct, 1 negative misclassified
        let predictions = vec![
            Label::HealthyLiving,
            Label::HealthyLiving,
            Label::HealthyLiving,
            Label::HealthyLiving,
        ];
        let ground_truth = vec![
            Label::HealthyLiving,
            Label::HealthyLiving,
            Label::HealthyLiving,
            Label::Other,
        ];

        let report = ClassificationReport::from_predictions(&predictions, &ground_truth);

        // weighted recall = 0.75 * 1.0 + 0.25 * 0.0
        assert!((report.weighted_avg.recall - 0.75).abs() < 1e-6);
        // macro recall = (1.0 + 0.0) / 2
        assert!((report.macro_avg.recall - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_benchmark_gate_reference_scenario() {
        // The benchmark test set: 1339 rows, supports 669 (other) and
        // 670 (healthy living), with per-class precision and recall
        // above 86%.
        let cm = ConfusionMatrix {
            tp: 603,
            tn: 582,
            fp: 87,
            fn_: 67,
        };
        let report = ClassificationReport::from_confusion_matrix(cm);

        assert_eq!(report.support, 1339);
        assert_eq!(report.positive.support, 670);
        assert_eq!(report.negative.support, 669);
        assert!(report.positive.precision >= 0.86);
        assert!(report.positive.recall >= 0.86);
        assert!(report.negative.precision >= 0.86);
        assert!(report.negative.recall >= 0.86);
        assert!(report.meets_benchmark(BENCHMARK_ACCURACY));
    }

    #[test]
    fn test_benchmark_gate_fails_below_target() {
        // Coin-flip performance on a balanced set
        let cm = ConfusionMatrix {
            tp: 335,
            tn: 334,
            fp: 335,
            fn_: 335,
        };
        let report = ClassificationReport::from_confusion_matrix(cm);

        assert!(!report.meets_benchmark(BENCHMARK_ACCURACY));
    }

    #[test]
    fn test_report_format_layout() {
        let predictions = vec![Label::HealthyLiving, Label::Other];
        let ground_truth = vec![Label::HealthyLiving, Label::Other];

        let report = ClassificationReport::from_predictions(&predictions, &ground_truth);
        let formatted = report.format();

        assert!(formatted.contains("precision"));
        assert!(formatted.contains("accuracy"));
        assert!(formatted.contains("macro avg"));
        assert!(formatted.contains("weighted avg"));
        assert!(formatted.contains("Confusion Matrix"));
    }
}
