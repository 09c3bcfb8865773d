//! Error types for the analytics pipeline

use thiserror::Error;

/// Errors surfaced by feature extraction, training, and insight generation.
///
/// A missing model is deliberately NOT an error: prediction degrades to a
/// default cluster instead (cold start is expected).
#[derive(Debug, Error)]
pub enum InsightError {
    /// Input had no transactions, no expense rows, or too few rows to train on.
    #[error("not enough transaction data; add more transactions and try again")]
    InsufficientData,

    /// Reading or writing the persisted model artifacts failed.
    #[error("failed to persist model artifacts")]
    Persistence(#[from] std::io::Error),

    /// The clustering fit itself failed.
    #[error("model training failed")]
    Training(#[from] linfa_clustering::KMeansError),
}

impl InsightError {
    /// True when the caller should respond with an "add more data" message.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, InsightError::InsufficientData)
    }
}
