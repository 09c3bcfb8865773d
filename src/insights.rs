//! Insight computation and model retraining
//!
//! Ties the pipeline together: extraction, persona prediction, and
//! recommendation generation, producing the JSON payload the service layer
//! hands back to clients.

use serde::Serialize;
use tracing::debug;

use crate::classifier::{ClusterInsights, SpendingClassifier};
use crate::error::InsightError;
use crate::features::{
    build_feature_vector, extract_features, savings_rate, CategoryStats, FeatureSet, Transaction,
};
use crate::recommend::{
    generate_recommendations, prioritize_recommendations, total_savings_potential, Recommendation,
};

/// Minimum number of expense transactions required to retrain the model
pub const MIN_TRAINING_TRANSACTIONS: usize = 10;

/// Headline spending figures echoed back alongside the recommendations
#[derive(Debug, Clone, Serialize)]
pub struct SpendingSummary {
    pub total_expense: f64,
    pub num_transactions: usize,
    pub avg_transaction: f64,
    pub top_category: String,
    pub top_category_percentage: f64,
}

impl SpendingSummary {
    fn from_features(features: &FeatureSet) -> Self {
        SpendingSummary {
            total_expense: features.total_expense,
            num_transactions: features.num_transactions,
            avg_transaction: features.avg_transaction,
            top_category: features.top_category.clone(),
            top_category_percentage: features.top_category_percentage,
        }
    }
}

/// Full insights payload for one user's transaction window
#[derive(Debug, Clone, Serialize)]
pub struct InsightsReport {
    pub cluster_id: usize,
    pub cluster_insights: ClusterInsights,
    pub recommendations: Vec<Recommendation>,
    pub total_savings_potential: f64,
    pub savings_rate: f64,
    pub category_breakdown: Vec<CategoryStats>,
    pub spending_summary: SpendingSummary,
}

/// Run the full extraction → predict → recommend chain.
///
/// `trailing_income` is the income total over the same trailing window as
/// the transactions; divided by `window_months` it estimates monthly income
/// for the budget-alignment rule. Fails with
/// [`InsightError::InsufficientData`] when there is nothing to analyze.
pub fn compute_insights(
    classifier: &SpendingClassifier,
    transactions: &[Transaction],
    trailing_income: f64,
    window_months: u32,
) -> Result<InsightsReport, InsightError> {
    let features = extract_features(transactions)?;
    let vector = build_feature_vector(&features);

    let cluster_id = classifier.predict(&vector);
    let cluster_insights = classifier.cluster_insights(cluster_id, &features);
    debug!(cluster_id, persona = %cluster_insights.persona, "persona assigned");

    let monthly_income = if trailing_income > 0.0 {
        Some(trailing_income / window_months.max(1) as f64)
    } else {
        None
    };

    let recommendations = generate_recommendations(&features, &cluster_insights, monthly_income);
    let recommendations = prioritize_recommendations(recommendations);
    let total_savings = total_savings_potential(&recommendations);

    Ok(InsightsReport {
        cluster_id,
        cluster_insights,
        total_savings_potential: total_savings,
        savings_rate: savings_rate(transactions),
        category_breakdown: features.category_stats.clone(),
        spending_summary: SpendingSummary::from_features(&features),
        recommendations,
    })
}

/// Retrain the persona model on one user's transaction window.
///
/// Requires at least [`MIN_TRAINING_TRANSACTIONS`] expense rows; the trained
/// model replaces any previously persisted one.
pub fn retrain(
    classifier: &SpendingClassifier,
    transactions: &[Transaction],
) -> Result<(), InsightError> {
    let expense_count = transactions.iter().filter(|t| t.is_expense()).count();
    if expense_count < MIN_TRAINING_TRANSACTIONS {
        return Err(InsightError::InsufficientData);
    }

    let features = extract_features(transactions)?;
    let vector = build_feature_vector(&features);
    classifier.train(&[vector])
}
