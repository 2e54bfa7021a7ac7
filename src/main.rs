// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! End-to-end training pipeline CLI
//!
//! Usage:
//!   train-pipeline --dataset synthetic --sample-seed 5
//!   train-pipeline --dataset json --input data/news_category_trainingdata.json

use anyhow::Result;
use clap::Parser;
use healthscreen::metrics::BENCHMARK_ACCURACY;
use healthscreen::pipeline::{DataSource, Pipeline, PipelineConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "train-pipeline")]
#[command(about = "Prepare data, train, and evaluate the health-topic classifier")]
#[command(version)]
struct Args {
    /// Data source kind (json, synthetic)
    #[arg(short, long, default_value = "json")]
    dataset: String,

    /// Path to the JSON records file
    #[arg(short, long, default_value = "data/news_category_trainingdata.json")]
    input: PathBuf,

    /// Record count for the synthetic source
    #[arg(long, default_value_t = 4000)]
    synthetic_size: usize,

    /// Output directory for split tables and the run report
    #[arg(short, long, default_value = "data/splits")]
    output: PathBuf,

    /// Directory for the predictor artifact
    #[arg(short, long, default_value = "models/health_predictor")]
    model_dir: PathBuf,

    /// Category treated as the positive class
    #[arg(long, default_value = "HEALTHY LIVING")]
    positive_category: String,

    /// Category excluded from the training partition only
    #[arg(long, default_value = "WELLNESS")]
    noisy_category: String,

    /// Fraction of the positive count used for balancing
    #[arg(long, default_value_t = 1.0)]
    utilization: f64,

    /// Fraction of the balanced set held out for testing
    #[arg(long, default_value_t = 0.10)]
    test_fraction: f64,

    /// Fraction of the filtered train table held out for validation
    #[arg(long, default_value_t = 0.10)]
    val_fraction: f64,

    /// Random seed for class balancing
    #[arg(long, default_value_t = 5)]
    sample_seed: u64,

    /// Random seed for the stratified split
    #[arg(long, default_value_t = 1)]
    split_seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    tracing::info!("Health-Topic Screening Pipeline");
    tracing::info!("===============================");
    tracing::info!("Source: {}", args.dataset);
    tracing::info!("Sample seed: {}, split seed: {}", args.sample_seed, args.split_seed);

    let source = match args.dataset.as_str() {
        "synthetic" => DataSource::Synthetic {
            size: args.synthetic_size,
            seed: args.sample_seed,
        },
        _ => DataSource::JsonFile(args.input.clone()),
    };

    let config = PipelineConfig {
        source,
        data_dir: args.output.clone(),
        model_dir: args.model_dir,
        positive_category: args.positive_category,
        noisy_category: args.noisy_category,
        utilization: args.utilization,
        test_fraction: args.test_fraction,
        val_fraction: args.val_fraction,
        sample_seed: args.sample_seed,
        split_seed: args.split_seed,
    };

    let pipeline = Pipeline::new(config);
    let report = pipeline.run()?;

    println!("\n{}", "=".repeat(70));
    println!("PIPELINE SUMMARY");
    println!("{}", "=".repeat(70));
    println!("\nRecords loaded:       {}", report.dataset.total_records);
    println!("Balanced rows:        {}", report.dataset.balanced_rows);
    println!(
        "Train rows:           {} ({} after '{}' exclusion)",
        report.dataset.train_rows,
        report.dataset.train_filtered_rows,
        report.config.noisy_category
    );
    println!("Test rows:            {}", report.dataset.test_rows);

    if let Some(ref validation) = report.validation_report {
        println!("\nValidation report:");
        println!("{:-<70}", "");
        println!("{}", validation.format());
    }

    println!("\nTest report:");
    println!("{:-<70}", "");
    println!("{}", report.test_report.format());

    let verdict = if report.benchmark_passed { "PASSED" } else { "MISSED" };
    println!(
        "Benchmark gate (accuracy >= {:.2}): {} at {:.4}",
        BENCHMARK_ACCURACY, verdict, report.test_report.accuracy
    );

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let report_path = args.output.join(format!("run_report_{}.json", timestamp));
    Pipeline::save_report(&report, &report_path)?;
    println!("\nRun report saved to: {}", report_path.display());

    Ok(())
}
