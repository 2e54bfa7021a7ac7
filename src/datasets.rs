// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Dataset loading and label derivation for health-topic screening

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Binary label for health-topic screening
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    /// Article is about health and wellness
    HealthyLiving,
    /// Any other news category
    Other,
}

impl Label {
    /// Convert to numeric code for metrics and table files
    pub fn to_binary(&self) -> u8 {
        match self {
            Label::HealthyLiving => 1,
            Label::Other => 0,
        }
    }

    /// Create from binary code (1 = healthy living, 0 = other)
    pub fn from_binary(value: u8) -> Self {
        if value == 1 {
            Label::HealthyLiving
        } else {
            Label::Other
        }
    }
}

/// One raw news item as it appears in the input file
///
/// A record missing any of these fields is malformed and fails the load;
/// unknown extra fields (author, link, date) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsRecord {
    pub category: String,
    pub headline: String,
    pub short_description: String,
}

/// Rule deriving the binary target from the categorical field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelRule {
    /// Category designated as the positive class
    pub positive_category: String,
}

impl LabelRule {
    pub fn new(positive_category: impl Into<String>) -> Self {
        Self {
            positive_category: positive_category.into(),
        }
    }

    /// Map a category to its binary label
    pub fn label(&self, category: &str) -> Label {
        if category == self.positive_category {
            Label::HealthyLiving
        } else {
            Label::Other
        }
    }
}

/// A labeled sample flowing through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Ordinal position in the raw input
    pub index: usize,
    /// Original news category
    pub category: String,
    /// Headline and short description joined into one text field
    pub text: String,
    /// Derived binary target
    pub label: Label,
}

/// One row of a persisted split table: (original index, text, label code)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub index: usize,
    pub text: String,
    pub label: u8,
}

impl TableRow {
    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            index: sample.index,
            text: sample.text.clone(),
            label: sample.label.to_binary(),
        }
    }
}

/// Load raw records from a JSON file.
///
/// The dataset circulates in two shapes: a single top-level JSON array, and
/// newline-delimited records. Both are accepted; anything else is fatal.
pub fn load_records(path: &Path) -> Result<Vec<NewsRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;

    let trimmed = raw.trim_start();
    let records = if trimmed.starts_with('[') {
        serde_json::from_str::<Vec<NewsRecord>>(trimmed)
            .with_context(|| format!("Malformed JSON array in {}", path.display()))?
    } else {
        let mut records = Vec::new();
        for (line_no, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: NewsRecord = serde_json::from_str(line).with_context(|| {
                format!("Malformed record on line {} of {}", line_no + 1, path.display())
            })?;
            records.push(record);
        }
        records
    };

    if records.is_empty() {
        anyhow::bail!("Input file {} contains no records", path.display());
    }

    tracing::info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Derive labeled samples from raw records.
///
/// Text is the headline and short description joined by a single space.
pub fn build_samples(records: &[NewsRecord], rule: &LabelRule) -> Vec<Sample> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| Sample {
            index,
            category: record.category.clone(),
            text: format!("{} {}", record.headline, record.short_description),
            label: rule.label(&record.category),
        })
        .collect()
}

/// Count samples per label
pub fn label_distribution(samples: &[Sample]) -> HashMap<Label, usize> {
    let mut dist = HashMap::new();
    for sample in samples {
        *dist.entry(sample.label).or_insert(0) += 1;
    }
    dist
}

/// Generate a seeded synthetic dataset for development and testing.
///
/// Mimics the category skew of the real corpus: the positive category is a
/// minority, the noisy near-topic category is larger, and the bulk of
/// records fall into unrelated categories.
pub fn load_synthetic(size: usize, seed: u64) -> Vec<NewsRecord> {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let health_phrases = [
        "Five habits for a longer healthier life",
        "How daily exercise transforms your heart health",
        "Nutrition experts share balanced diet advice",
        "Simple sleep changes that improve wellbeing",
        "Why walking every morning keeps you fit",
    ];

    let wellness_phrases = [
        "Horoscope insights for a mindful week",
        "Crystal rituals celebrities swear by",
        "Finding your inner spirit through retreats",
        "The mindful art of decluttering your home",
        "Aromatherapy trends taking over social media",
    ];

    let other_phrases = [
        "Senate passes new budget after long debate",
        "Home team clinches playoff spot in overtime",
        "Box office weekend smashes expectations",
        "Markets rally as earnings season opens",
        "Ten destinations to visit this summer",
    ];

    let other_categories = ["POLITICS", "SPORTS", "ENTERTAINMENT", "BUSINESS", "TRAVEL"];

    (0..size)
        .map(|i| {
            let roll: f64 = rng.gen();
            // Roughly 20% positive, 15% noisy, 65% unrelated.
            let (category, phrases) = if roll < 0.20 {
                ("HEALTHY LIVING", &health_phrases)
            } else if roll < 0.35 {
                ("WELLNESS", &wellness_phrases)
            } else {
                let idx = rng.gen_range(0..other_categories.len());
                (other_categories[idx], &other_phrases)
            };

            let phrase_idx = rng.gen_range(0..phrases.len());
            NewsRecord {
                category: category.to_string(),
                headline: phrases[phrase_idx].to_string(),
                short_description: format!("Story {} with further details.", i),
            }
        })
        .collect()
}
