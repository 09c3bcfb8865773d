//! Finsight: spending-persona analytics CLI
//!
//! This is the main entrypoint that orchestrates transaction loading,
//! persona prediction, recommendation generation, and model retraining.

use anyhow::{Context, Result};
use clap::Parser;
use finsight::features::total_income;
use finsight::{
    compute_insights, load_transactions, retrain, Args, InsightError, SpendingClassifier,
};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let as_of = args.as_of_date()?;
    let start_time = Instant::now();

    let transactions = load_transactions(&args.input, args.months, as_of)
        .with_context(|| format!("failed to load transactions from {}", args.input))?;
    if args.verbose {
        eprintln!(
            "Loaded {} transactions from {} ({} month window ending {})",
            transactions.len(),
            args.input,
            args.months,
            as_of
        );
    }

    let classifier = SpendingClassifier::new(&args.model_dir, args.clusters);

    if args.retrain {
        run_retrain(&classifier, &transactions)?;
    } else {
        run_insights(&args, &classifier, &transactions)?;
    }

    if args.verbose {
        eprintln!(
            "Total processing time: {:.2}s",
            start_time.elapsed().as_secs_f64()
        );
    }
    Ok(())
}

/// Retrain the persona model on the loaded window
fn run_retrain(
    classifier: &SpendingClassifier,
    transactions: &[finsight::Transaction],
) -> Result<()> {
    match retrain(classifier, transactions) {
        Ok(()) => {
            println!("Model retrained successfully");
            Ok(())
        }
        Err(InsightError::InsufficientData) => {
            anyhow::bail!(
                "Not enough data to train the model. Add at least {} expense transactions.",
                finsight::insights::MIN_TRAINING_TRANSACTIONS
            )
        }
        Err(e) => Err(e).context("model retraining failed"),
    }
}

/// Compute and emit the insights payload
fn run_insights(
    args: &Args,
    classifier: &SpendingClassifier,
    transactions: &[finsight::Transaction],
) -> Result<()> {
    let trailing_income = total_income(transactions);

    let report = match compute_insights(classifier, transactions, trailing_income, args.months) {
        Ok(report) => report,
        Err(InsightError::InsufficientData) => {
            anyhow::bail!("Not enough data. Add more expense transactions to get insights.")
        }
        Err(e) => return Err(e).context("insight computation failed"),
    };

    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write insights to {path}"))?;
            println!("Insights written to {path}");
        }
        None => println!("{json}"),
    }

    Ok(())
}
