// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Model capability for the screening pipeline
//!
//! The pipeline only depends on the narrow `TextClassifier` trait
//! (train on labeled rows, predict a probability for a text), so the
//! concrete backend is swappable and the orchestration is testable with a
//! stub. The shipped backend is a TF-IDF weighted naive-Bayes classifier
//! with a JSON-persisted artifact.

use crate::datasets::{Label, TableRow};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const MODEL_FILE: &str = "model.json";
pub const META_FILE: &str = "meta.json";

/// Prediction output: the positive class is "healthy living"
#[derive(Debug, Clone)]
pub struct Prediction {
    pub label: Label,
    /// P(healthy living)
    pub probability: f64,
}

/// Trait for trainable text classifiers
pub trait TextClassifier: Send + Sync {
    /// Fit the model on labeled table rows
    fn train(&mut self, rows: &[TableRow]);

    /// Predict the label and positive-class probability for one text
    fn predict(&self, text: &str) -> Prediction;

    /// Predict over a whole table
    fn predict_batch(&self, rows: &[TableRow]) -> Vec<Prediction> {
        rows.iter().map(|r| self.predict(&r.text)).collect()
    }

    /// Model name
    fn name(&self) -> &str;

    /// Model description
    fn description(&self) -> &str;
}

/// Format the single-text probability query answer
pub fn probability_label(probability: f64) -> String {
    format!("Healthy Living probability: {:.2}", probability)
}

/// Metadata header persisted next to the model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub model_name: String,
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub training_rows: usize,
}

/// TF-IDF weighted naive-Bayes text classifier
///
/// Term statistics are collected per class during training; prediction
/// scores a text's TF-IDF vector against both class distributions and
/// normalizes the log scores into a probability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TfIdfClassifier {
    /// Word frequencies in the healthy-living class
    health_tf: HashMap<String, f64>,
    /// Word frequencies in the other class
    other_tf: HashMap<String, f64>,
    /// Document frequencies across all training rows
    df: HashMap<String, usize>,
    /// Total training rows
    n_docs: usize,
    /// Prior probability of the healthy-living class
    prior_health: f64,
    /// Vocabulary
    vocab: Vec<String>,
}

impl TfIdfClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| s.len() > 2) // Skip short words
            .map(|s| s.to_string())
            .collect()
    }

    fn compute_tfidf(&self, text: &str) -> HashMap<String, f64> {
        let tokens = Self::tokenize(text);
        let mut tf: HashMap<String, usize> = HashMap::new();

        for token in &tokens {
            *tf.entry(token.clone()).or_insert(0) += 1;
        }

        let doc_len = tokens.len() as f64;
        let mut tfidf = HashMap::new();

        for (term, count) in tf {
            let tf_val = count as f64 / doc_len.max(1.0);
            let df_val = *self.df.get(&term).unwrap_or(&1);
            let idf = (self.n_docs as f64 / df_val as f64).ln() + 1.0;
            tfidf.insert(term, tf_val * idf);
        }

        tfidf
    }

    /// Number of rows the model was fitted on
    pub fn training_rows(&self) -> usize {
        self.n_docs
    }

    /// Persist the fitted model and its metadata header under `dir`
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create model directory {}", dir.display()))?;

        let model_json = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(MODEL_FILE), model_json)
            .with_context(|| format!("Failed to write model artifact in {}", dir.display()))?;

        let meta = ArtifactMeta {
            model_name: self.name().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: Utc::now(),
            training_rows: self.n_docs,
        };
        let meta_json = serde_json::to_string_pretty(&meta)?;
        std::fs::write(dir.join(META_FILE), meta_json)?;

        tracing::info!("Predictor artifact saved to {}", dir.display());
        Ok(())
    }

    /// Load a persisted model artifact from `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MODEL_FILE);
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read predictor artifact {}", path.display()))?;
        let model: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid predictor artifact {}", path.display()))?;

        if model.n_docs == 0 {
            anyhow::bail!("Predictor artifact {} was never trained", path.display());
        }
        Ok(model)
    }
}

impl TextClassifier for TfIdfClassifier {
    fn train(&mut self, rows: &[TableRow]) {
        self.health_tf.clear();
        self.other_tf.clear();
        self.df.clear();
        self.vocab.clear();

        let mut health_word_counts: HashMap<String, usize> = HashMap::new();
        let mut other_word_counts: HashMap<String, usize> = HashMap::new();
        let mut health_total_words = 0usize;
        let mut other_total_words = 0usize;
        let mut n_health = 0usize;
        let mut n_other = 0usize;

        for row in rows {
            let tokens = Self::tokenize(&row.text);

            // Track document frequency
            let unique_tokens: std::collections::HashSet<_> = tokens.iter().cloned().collect();
            for token in &unique_tokens {
                *self.df.entry(token.clone()).or_insert(0) += 1;
            }

            // Track term frequency per class
            match Label::from_binary(row.label) {
                Label::HealthyLiving => {
                    n_health += 1;
                    for token in &tokens {
                        *health_word_counts.entry(token.clone()).or_insert(0) += 1;
                        health_total_words += 1;
                    }
                }
                Label::Other => {
                    n_other += 1;
                    for token in &tokens {
                        *other_word_counts.entry(token.clone()).or_insert(0) += 1;
                        other_total_words += 1;
                    }
                }
            }
        }

        self.n_docs = n_health + n_other;
        self.prior_health = n_health as f64 / self.n_docs.max(1) as f64;

        // Normalize to term frequencies
        for (term, count) in health_word_counts {
            self.health_tf
                .insert(term.clone(), count as f64 / health_total_words.max(1) as f64);
            self.vocab.push(term);
        }

        for (term, count) in other_word_counts {
            self.other_tf
                .insert(term.clone(), count as f64 / other_total_words.max(1) as f64);
            self.vocab.push(term);
        }

        self.vocab.sort();
        self.vocab.dedup();

        tracing::info!(
            "Fitted {} on {} rows ({} positive, {} other, vocab {})",
            self.name(),
            self.n_docs,
            n_health,
            n_other,
            self.vocab.len()
        );
    }

    fn predict(&self, text: &str) -> Prediction {
        let tfidf = self.compute_tfidf(text);

        // Naive Bayes-style scoring
        let mut health_score = self.prior_health.max(f64::MIN_POSITIVE).ln();
        let mut other_score = (1.0 - self.prior_health).max(f64::MIN_POSITIVE).ln();

        let smoothing = 1e-10;

        for (term, weight) in &tfidf {
            let health_prob = self.health_tf.get(term).copied().unwrap_or(smoothing);
            let other_prob = self.other_tf.get(term).copied().unwrap_or(smoothing);

            health_score += weight * health_prob.ln();
            other_score += weight * other_prob.ln();
        }

        // Convert log scores to probability
        let max_score = health_score.max(other_score);
        let health_exp = (health_score - max_score).exp();
        let other_exp = (other_score - max_score).exp();
        let total = health_exp + other_exp;

        let probability = health_exp / total;

        Prediction {
            label: if probability > 0.5 {
                Label::HealthyLiving
            } else {
                Label::Other
            },
            probability,
        }
    }

    fn name(&self) -> &str {
        "TF-IDF"
    }

    fn description(&self) -> &str {
        "TF-IDF weighted naive-Bayes health-topic classifier"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_rows() -> Vec<TableRow> {
        let health = [
            "Five habits for a longer healthier life and better fitness",
            "Daily exercise and good nutrition improve heart health",
            "Sleep hygiene tips from doctors for healthy living",
            "Balanced diet and hydration keep your body healthy",
        ];
        let other = [
            "Senate passes budget after marathon overnight debate",
            "Home team clinches the playoff spot in overtime thriller",
            "Box office weekend smashes all summer expectations",
            "Markets rally as quarterly earnings season opens strong",
        ];

        health
            .iter()
            .map(|t| (t, 1u8))
            .chain(other.iter().map(|t| (t, 0u8)))
            .enumerate()
            .map(|(index, (text, label))| TableRow {
                index,
                text: text.to_string(),
                label,
            })
            .collect()
    }

    #[test]
    fn test_training_populates_statistics() {
        let mut model = TfIdfClassifier::new();
        model.train(&training_rows());

        assert_eq!(model.training_rows(), 8);
        assert!(!model.vocab.is_empty());
        assert!(!model.health_tf.is_empty());
        assert!(!model.other_tf.is_empty());
        assert!((model.prior_health - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_predicts_health_text_as_positive() {
        let mut model = TfIdfClassifier::new();
        model.train(&training_rows());

        let pred = model.predict("Exercise and a healthy diet improve your life");
        assert_eq!(pred.label, Label::HealthyLiving);
        assert!(pred.probability > 0.5);

        let pred = model.predict("Senate budget debate continues into the weekend");
        assert_eq!(pred.label, Label::Other);
        assert!(pred.probability < 0.5);
    }

    #[test]
    fn test_predict_batch_matches_row_count() {
        let rows = training_rows();
        let mut model = TfIdfClassifier::new();
        model.train(&rows);

        let predictions = model.predict_batch(&rows);
        assert_eq!(predictions.len(), rows.len());
        for pred in &predictions {
            assert!((0.0..=1.0).contains(&pred.probability));
        }
    }

    #[test]
    fn test_artifact_roundtrip_preserves_predictions() {
        let mut model = TfIdfClassifier::new();
        model.train(&training_rows());

        let dir = tempfile::tempdir().unwrap();
        model.save(dir.path()).unwrap();
        let restored = TfIdfClassifier::load(dir.path()).unwrap();

        let text = "Nutrition experts share advice on healthy habits";
        let before = model.predict(text);
        let after = restored.predict(text);

        assert_eq!(before.label, after.label);
        assert!((before.probability - after.probability).abs() < 1e-12);
    }

    #[test]
    fn test_loading_untrained_artifact_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        TfIdfClassifier::new().save(dir.path()).unwrap();

        assert!(TfIdfClassifier::load(dir.path()).is_err());
    }

    #[test]
    fn test_loading_missing_artifact_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TfIdfClassifier::load(dir.path()).is_err());
    }

    #[test]
    fn test_probability_label_format() {
        assert_eq!(probability_label(0.8712), "Healthy Living probability: 0.87");
        assert_eq!(probability_label(1.0), "Healthy Living probability: 1.00");
        assert_eq!(probability_label(0.0), "Healthy Living probability: 0.00");

        // The formatted tail parses back into [0, 1]
        let message = probability_label(0.4251);
        let value: f64 = message
            .strip_prefix("Healthy Living probability: ")
            .unwrap()
            .parse()
            .unwrap();
        assert!((0.0..=1.0).contains(&value));
    }
}
