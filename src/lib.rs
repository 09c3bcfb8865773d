//! Finsight: spending-persona analytics for personal finance data
//!
//! This library turns raw income/expense transactions into a spending profile:
//! per-category statistics, a clustering-derived spending persona, and a
//! prioritized list of savings recommendations with estimated impact.

pub mod classifier;
pub mod cli;
pub mod data;
pub mod error;
pub mod features;
pub mod insights;
pub mod recommend;

// Re-export public items for easier access
pub use classifier::SpendingClassifier;
pub use cli::Args;
pub use data::load_transactions;
pub use error::InsightError;
pub use features::{build_feature_vector, extract_features, FeatureSet, Transaction};
pub use insights::{compute_insights, retrain, InsightsReport};
pub use recommend::{generate_recommendations, prioritize_recommendations, Recommendation};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
