//! Command-line interface definitions and argument parsing

use chrono::{NaiveDate, Utc};
use clap::Parser;

/// Spending-persona analytics over a personal transaction history
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file (id,amount,description,date,category,type)
    #[arg(short, long, default_value = "transactions.csv")]
    pub input: String,

    /// Number of persona clusters for K-Means
    #[arg(short = 'k', long, default_value = "3")]
    pub clusters: usize,

    /// Trailing analysis window in months
    #[arg(short, long, default_value = "6")]
    pub months: u32,

    /// Reference date for the trailing window (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub as_of: Option<String>,

    /// Directory holding the persisted model artifacts
    #[arg(long, default_value = "models")]
    pub model_dir: String,

    /// Retrain the persona model instead of computing insights
    #[arg(long)]
    pub retrain: bool,

    /// Write the insights JSON to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Resolve the reference date for the trailing window.
    pub fn as_of_date(&self) -> crate::Result<NaiveDate> {
        match &self.as_of {
            Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|_| anyhow::anyhow!("Invalid --as-of date: {raw} (expected YYYY-MM-DD)")),
            None => Ok(Utc::now().date_naive()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            input: "transactions.csv".to_string(),
            clusters: 3,
            months: 6,
            as_of: None,
            model_dir: "models".to_string(),
            retrain: false,
            output: None,
            verbose: false,
        }
    }

    #[test]
    fn test_as_of_date_parsing() {
        let mut args = base_args();
        args.as_of = Some("2025-06-30".to_string());
        assert_eq!(
            args.as_of_date().unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
        );

        args.as_of = Some("30/06/2025".to_string());
        assert!(args.as_of_date().is_err());

        args.as_of = None;
        assert!(args.as_of_date().is_ok());
    }
}
