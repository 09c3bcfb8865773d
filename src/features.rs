//! Feature extraction from raw transaction data
//!
//! Turns a user's transaction history into a [`FeatureSet`] (per-category
//! statistics plus behavioral aggregates) and a fixed-order numeric feature
//! vector suitable for clustering.

use chrono::{Datelike, NaiveDate, Weekday};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::InsightError;

/// Categories with a fixed slot in the clustering feature vector.
///
/// The order is a hard contract with the classifier: it must stay stable
/// across train and predict, or persisted models become meaningless.
pub const STANDARD_CATEGORIES: [&str; 7] = [
    "Food & Dining",
    "Transportation",
    "Shopping",
    "Entertainment",
    "Bills & Utilities",
    "Healthcare",
    "Other",
];

/// Length of the clustering feature vector: one percentage slot per standard
/// category plus four behavioral features.
pub const FEATURE_VECTOR_LEN: usize = STANDARD_CATEGORIES.len() + 4;

/// Whether a category records money coming in or going out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Income,
    Expense,
}

impl std::str::FromStr for CategoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(CategoryType::Income),
            "expense" => Ok(CategoryType::Expense),
            other => Err(format!("unknown category type: {other}")),
        }
    }
}

/// A single transaction row as supplied by the data layer.
///
/// `amount` is the positive magnitude; `category_type` says whether it is
/// income or an expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub amount: f64,
    pub description: String,
    pub date: NaiveDate,
    pub category_name: String,
    pub category_type: CategoryType,
}

impl Transaction {
    pub fn is_expense(&self) -> bool {
        self.category_type == CategoryType::Expense
    }

    pub fn is_income(&self) -> bool {
        self.category_type == CategoryType::Income
    }
}

/// Per-category expense statistics, recomputed on every extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: String,
    pub total: f64,
    pub avg: f64,
    pub count: usize,
    /// Population standard deviation; 0 when the category has one transaction.
    pub std: f64,
    pub max: f64,
    /// Share of total expense, rounded to 2 decimals.
    pub percentage: f64,
}

/// Aggregate spending features extracted from one user's expense history
#[derive(Debug, Clone, Serialize)]
pub struct FeatureSet {
    pub total_expense: f64,
    pub num_transactions: usize,
    pub avg_transaction: f64,
    pub std_transaction: f64,
    pub max_transaction: f64,
    /// Fraction of total expense spent on Saturdays and Sundays.
    pub weekend_spending_ratio: f64,
    /// One row per category, in first-encountered order.
    pub category_stats: Vec<CategoryStats>,
    pub num_categories: usize,
    pub top_category: String,
    pub top_category_percentage: f64,
}

/// Round to 2 decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Population standard deviation of a sample; 0 for fewer than 2 values.
fn population_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Extract spending features from a transaction history.
///
/// Only expense rows contribute; income rows are ignored here. Fails with
/// [`InsightError::InsufficientData`] when the input is empty or contains no
/// expense rows, so callers never see division-by-zero artifacts.
pub fn extract_features(transactions: &[Transaction]) -> Result<FeatureSet, InsightError> {
    let expenses: Vec<&Transaction> =
        transactions.iter().filter(|t| t.is_expense()).collect();

    if expenses.is_empty() {
        return Err(InsightError::InsufficientData);
    }

    let total_expense: f64 = expenses.iter().map(|t| t.amount).sum();

    // Group amounts by category, preserving first-encountered order so
    // tie-breaking stays deterministic.
    let mut grouped: Vec<(String, Vec<f64>)> = Vec::new();
    for tx in &expenses {
        match grouped.iter_mut().find(|(name, _)| *name == tx.category_name) {
            Some((_, amounts)) => amounts.push(tx.amount),
            None => grouped.push((tx.category_name.clone(), vec![tx.amount])),
        }
    }

    let category_stats: Vec<CategoryStats> = grouped
        .into_iter()
        .map(|(category, amounts)| {
            let total: f64 = amounts.iter().sum();
            let avg = total / amounts.len() as f64;
            let max = amounts.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let percentage = if total_expense > 0.0 {
                round2(total / total_expense * 100.0)
            } else {
                0.0
            };
            CategoryStats {
                std: population_std(&amounts, avg),
                count: amounts.len(),
                category,
                total,
                avg,
                max,
                percentage,
            }
        })
        .collect();

    let weekend_spending: f64 = expenses
        .iter()
        .filter(|t| is_weekend(t.date))
        .map(|t| t.amount)
        .sum();
    let weekend_spending_ratio = if total_expense > 0.0 {
        weekend_spending / total_expense
    } else {
        0.0
    };

    let amounts: Vec<f64> = expenses.iter().map(|t| t.amount).collect();
    let avg_transaction = total_expense / amounts.len() as f64;
    let std_transaction = population_std(&amounts, avg_transaction);
    let max_transaction = amounts.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    // Top category by total; strict comparison keeps the first-encountered
    // category on ties.
    let top = category_stats
        .iter()
        .fold(None::<&CategoryStats>, |best, row| match best {
            Some(b) if b.total >= row.total => Some(b),
            _ => Some(row),
        })
        .expect("category_stats is non-empty when expenses exist");

    Ok(FeatureSet {
        total_expense,
        num_transactions: expenses.len(),
        avg_transaction,
        std_transaction,
        max_transaction,
        weekend_spending_ratio,
        num_categories: category_stats.len(),
        top_category: top.category.clone(),
        top_category_percentage: top.percentage,
        category_stats,
    })
}

/// Build the fixed-order clustering feature vector from a feature set.
///
/// Pure and deterministic: the same feature set always yields the same
/// vector. Categories absent from the user's stats contribute 0.0.
pub fn build_feature_vector(features: &FeatureSet) -> Array1<f64> {
    let mut vector = Vec::with_capacity(FEATURE_VECTOR_LEN);

    for cat in STANDARD_CATEGORIES {
        let percentage = features
            .category_stats
            .iter()
            .find(|row| row.category == cat)
            .map(|row| row.percentage)
            .unwrap_or(0.0);
        vector.push(percentage);
    }

    // Behavioral features, scaled to roughly comparable magnitudes
    vector.push(features.avg_transaction / 1000.0);
    vector.push(features.std_transaction / 1000.0);
    vector.push(features.weekend_spending_ratio * 100.0);
    vector.push(features.num_transactions as f64 / 10.0);

    Array1::from_vec(vector)
}

/// Sum of income-type transactions. Window filtering happens at ingestion;
/// callers divide by the window length to estimate monthly income.
pub fn total_income(transactions: &[Transaction]) -> f64 {
    transactions
        .iter()
        .filter(|t| t.is_income())
        .map(|t| t.amount)
        .sum()
}

/// Savings rate as a percentage of income, rounded to 2 decimals.
///
/// Returns 0.0 when there is no income (nothing meaningful to report).
pub fn savings_rate(transactions: &[Transaction]) -> f64 {
    let income = total_income(transactions);
    if income == 0.0 {
        return 0.0;
    }
    let expense: f64 = transactions
        .iter()
        .filter(|t| t.is_expense())
        .map(|t| t.amount)
        .sum();
    round2((income - expense) / income * 100.0)
}
