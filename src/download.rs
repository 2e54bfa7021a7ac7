// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Dataset download utility for the screening pipeline
//!
//! Retrieves the news-headline training dataset (a plain JSON records
//! file) and sanity-checks that it parses before the pipeline runs.

use anyhow::{Context, Result};
use clap::Parser;
use healthscreen::datasets::load_records;
use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "download-dataset")]
#[command(about = "Download the news-headline training dataset")]
#[command(version)]
struct Args {
    /// Output directory
    #[arg(short, long, default_value = "data")]
    output: PathBuf,

    /// Skip checksum verification
    #[arg(long)]
    skip_verify: bool,

    /// Skip the post-download parse check
    #[arg(long)]
    skip_parse_check: bool,

    /// Force re-download even if the file exists
    #[arg(short, long)]
    force: bool,
}

struct DatasetDownload {
    id: &'static str,
    name: &'static str,
    url: &'static str,
    filename: &'static str,
    sha256: Option<&'static str>,
}

const DATASET: DatasetDownload = DatasetDownload {
    id: "huffpost-headlines",
    name: "HuffPost News Category Dataset (2012-2018)",
    url: "http://128.138.93.164/news_category_trainingdata.json",
    filename: "news_category_trainingdata.json",
    sha256: None, // Mirror publishes no checksum; the parse check stands in
};

fn download_file(url: &str, output_path: &Path) -> Result<()> {
    tracing::info!("Downloading from: {}", url);

    let response = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(600))
        .build()?
        .get(url)
        .send()
        .context("Failed to send request")?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status: {}", response.status());
    }

    let total_size = response.content_length().unwrap_or(0);

    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut file = File::create(output_path).context("Failed to create output file")?;
    let content = response.bytes().context("Failed to read response")?;

    pb.set_position(content.len() as u64);
    file.write_all(&content)?;

    pb.finish_with_message("Downloaded");
    Ok(())
}

fn verify_sha256(path: &Path, expected: &str) -> Result<bool> {
    tracing::info!("Verifying checksum...");

    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let result = hex::encode(hasher.finalize());
    let matches = result == expected;

    if !matches {
        tracing::warn!("Checksum mismatch: expected {}, got {}", expected, result);
    } else {
        tracing::info!("Checksum verified: {}", result);
    }

    Ok(matches)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    tracing::info!("Dataset Download Utility");
    tracing::info!("========================");
    tracing::info!("Dataset: {} ({})", DATASET.name, DATASET.id);

    std::fs::create_dir_all(&args.output)?;
    let target = args.output.join(DATASET.filename);

    if target.exists() && !args.force {
        tracing::info!("Dataset already exists: {}", target.display());
        tracing::info!("Use --force to re-download");
    } else {
        if let Err(e) = download_file(DATASET.url, &target) {
            tracing::error!("Failed to download {}: {}", DATASET.id, e);
            tracing::info!("Manual download instructions:");
            tracing::info!("  1. Fetch: {}", DATASET.url);
            tracing::info!("  2. Save as: {}", target.display());
            return Err(e);
        }
    }

    if !args.skip_verify {
        if let Some(expected_hash) = DATASET.sha256 {
            if !verify_sha256(&target, expected_hash)? {
                anyhow::bail!("Checksum verification failed for {}", DATASET.filename);
            }
        }
    }

    if !args.skip_parse_check {
        let records = load_records(&target)
            .with_context(|| format!("Downloaded file {} does not parse", target.display()))?;
        tracing::info!("Parse check passed: {} records", records.len());
    }

    println!("\n{}", "=".repeat(60));
    println!("Dataset Preparation Complete");
    println!("{}", "=".repeat(60));
    println!("\nDataset ready at: {}", target.display());

    Ok(())
}
