// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Standalone probability query runner
//!
//! Loads a persisted predictor artifact and answers the single-text
//! probability query for ad-placement screening.

use anyhow::Result;
use clap::Parser;
use healthscreen::pipeline::query_probability;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "predict")]
#[command(about = "Query the trained model for a healthy-living probability")]
#[command(version)]
struct Args {
    /// Directory holding the predictor artifact
    #[arg(short, long, default_value = "models/health_predictor")]
    model_dir: PathBuf,

    /// Text to score
    #[arg(short, long, default_value = "This is a healthy lifestyle article.")]
    text: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let answer = query_probability(&args.model_dir, &args.text)?;
    println!("{}", answer);

    Ok(())
}
