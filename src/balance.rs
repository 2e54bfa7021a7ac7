// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Class balancing through seeded undersampling of the majority class

use crate::datasets::{Label, Sample};
use anyhow::Result;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Balance a sample set to a 1:1 class ratio.
///
/// `n = floor(utilization * count(positive))` rows are drawn without
/// replacement from each class partition, positives first, with a single
/// seeded RNG so membership is reproducible. Asking for more rows than a
/// partition holds is a fatal precondition violation, never a silent
/// truncation.
pub fn balance(samples: &[Sample], utilization: f64, seed: u64) -> Result<Vec<Sample>> {
    if !(utilization > 0.0 && utilization <= 1.0) {
        anyhow::bail!("Utilization must be in (0, 1], got {}", utilization);
    }

    let positives: Vec<&Sample> = samples
        .iter()
        .filter(|s| s.label == Label::HealthyLiving)
        .collect();
    let negatives: Vec<&Sample> = samples.iter().filter(|s| s.label == Label::Other).collect();

    let n = (positives.len() as f64 * utilization).floor() as usize;
    if n == 0 {
        anyhow::bail!(
            "No positive samples to balance against ({} positives, utilization {})",
            positives.len(),
            utilization
        );
    }
    if negatives.len() < n {
        anyhow::bail!(
            "Insufficient negative samples for 1:1 balancing: need {}, have {}",
            n,
            negatives.len()
        );
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut balanced = Vec::with_capacity(2 * n);
    balanced.extend(draw(&positives, n, &mut rng));
    balanced.extend(draw(&negatives, n, &mut rng));

    tracing::info!(
        "Balanced sample set: {} positive + {} negative of {} total",
        n,
        n,
        samples.len()
    );

    Ok(balanced)
}

/// Draw `n` rows without replacement via a seeded index shuffle
fn draw(partition: &[&Sample], n: usize, rng: &mut ChaCha8Rng) -> Vec<Sample> {
    let mut indices: Vec<usize> = (0..partition.len()).collect();
    indices.shuffle(rng);
    indices.truncate(n);
    indices.into_iter().map(|i| partition[i].clone()).collect()
}
