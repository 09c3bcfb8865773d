//! Persona classification via K-Means clustering
//!
//! One global model slot shared across all users: an explicit train call
//! fits a scaler + K-Means model and persists both; prediction loads the
//! last persisted model lazily and falls back to a default cluster when
//! nothing has been trained yet.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::InsightError;
use crate::features::FeatureSet;

/// Cluster returned when no model exists yet ("Balanced Saver")
pub const DEFAULT_CLUSTER: usize = 1;

/// Default number of personas to learn
pub const DEFAULT_CLUSTERS: usize = 3;

const MODEL_FILE: &str = "kmeans_model.json";
const SCALER_FILE: &str = "scaler.json";

// Fixed seed so retraining on the same data reproduces the same model
const KMEANS_SEED: u64 = 42;
const KMEANS_MAX_ITERATIONS: u64 = 300;
const KMEANS_TOLERANCE: f64 = 1e-4;
const KMEANS_RESTARTS: usize = 10;

/// Per-dimension zero-mean/unit-variance transform fitted on the training
/// batch. Zero-variance dimensions pass through unscaled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Array1<f64>,
    stds: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(records: &Array2<f64>) -> Self {
        let n = records.nrows() as f64;
        let means = records.mean_axis(Axis(0)).unwrap_or_else(|| {
            Array1::zeros(records.ncols())
        });
        let stds = records
            .axis_iter(Axis(1))
            .enumerate()
            .map(|(j, column)| {
                let variance =
                    column.iter().map(|v| (v - means[j]).powi(2)).sum::<f64>() / n;
                let std = variance.sqrt();
                if std > 0.0 {
                    std
                } else {
                    1.0
                }
            })
            .collect();
        StandardScaler { means, stds }
    }

    pub fn transform(&self, records: &Array2<f64>) -> Array2<f64> {
        let mut scaled = records.clone();
        for mut row in scaled.axis_iter_mut(Axis(0)) {
            row.zip_mut_with(&self.means, |v, m| *v -= m);
            row.zip_mut_with(&self.stds, |v, s| *v /= s);
        }
        scaled
    }

    pub fn transform_one(&self, vector: &Array1<f64>) -> Array1<f64> {
        (vector - &self.means) / &self.stds
    }
}

/// Fitted centroid state, the part of the K-Means model that survives
/// persistence. Prediction only needs centroids, not the full linfa state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaModel {
    pub n_clusters: usize,
    pub centroids: Array2<f64>,
}

impl PersonaModel {
    /// Assign a scaled feature vector to its nearest centroid (L2).
    pub fn nearest_cluster(&self, scaled: &Array1<f64>) -> usize {
        let mut min_distance = f64::INFINITY;
        let mut closest_cluster = 0;

        for (cluster_idx, centroid) in self.centroids.outer_iter().enumerate() {
            let distance: f64 = scaled
                .iter()
                .zip(centroid.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt();

            if distance < min_distance {
                min_distance = distance;
                closest_cluster = cluster_idx;
            }
        }

        closest_cluster
    }
}

/// Model + scaler pair; both are required to predict consistently
#[derive(Debug, Serialize, Deserialize)]
struct TrainedState {
    model: PersonaModel,
    scaler: StandardScaler,
}

/// Qualitative spending traits derived from a feature set
#[derive(Debug, Clone, Serialize)]
pub struct Characteristics {
    pub spending_level: &'static str,
    pub transaction_frequency: &'static str,
    pub spending_consistency: &'static str,
    pub weekend_bias: &'static str,
    /// Top 3 categories by percentage of total expense.
    pub top_categories: Vec<crate::features::CategoryStats>,
}

/// Persona payload consumed by the recommendation engine
#[derive(Debug, Clone, Serialize)]
pub struct ClusterInsights {
    pub persona: String,
    pub spending_level: &'static str,
    pub main_focus: String,
    pub frequency: &'static str,
    pub consistency: &'static str,
    pub weekend_pattern: &'static str,
}

/// Service object owning exclusive access to the global model slot.
///
/// Train and predict serialize on one lock for the whole load/fit/save
/// duration, so readers never observe a model without its matching scaler.
pub struct SpendingClassifier {
    model_dir: PathBuf,
    n_clusters: usize,
    slot: Mutex<Option<TrainedState>>,
}

impl SpendingClassifier {
    pub fn new(model_dir: impl Into<PathBuf>, n_clusters: usize) -> Self {
        SpendingClassifier {
            model_dir: model_dir.into(),
            n_clusters: n_clusters.max(1),
            slot: Mutex::new(None),
        }
    }

    /// Classifier with the default cluster count and model directory.
    pub fn with_defaults() -> Self {
        Self::new("models", DEFAULT_CLUSTERS)
    }

    fn model_path(&self) -> PathBuf {
        self.model_dir.join(MODEL_FILE)
    }

    fn scaler_path(&self) -> PathBuf {
        self.model_dir.join(SCALER_FILE)
    }

    /// Fit the scaler and K-Means model on a batch of feature vectors,
    /// persist both, and replace the in-memory model.
    ///
    /// When fewer samples than clusters are supplied the cluster count is
    /// reduced to the sample count to keep the fit well-defined.
    pub fn train(&self, vectors: &[Array1<f64>]) -> Result<(), InsightError> {
        if vectors.is_empty() {
            return Err(InsightError::InsufficientData);
        }

        let n_samples = vectors.len();
        let n_features = vectors[0].len();
        let mut data = Vec::with_capacity(n_samples * n_features);
        for vector in vectors {
            data.extend(vector.iter().copied());
        }
        let records = Array2::from_shape_vec((n_samples, n_features), data)
            .expect("vectors have uniform length");

        let scaler = StandardScaler::fit(&records);
        let scaled = scaler.transform(&records);

        let effective_clusters = self.n_clusters.min(n_samples);
        let rng = SmallRng::seed_from_u64(KMEANS_SEED);
        let targets: Array1<usize> = Array1::zeros(n_samples);
        let dataset = Dataset::new(scaled, targets);

        let mut params = KMeans::params_with(effective_clusters, rng, L2Dist)
            .max_n_iterations(KMEANS_MAX_ITERATIONS)
            .tolerance(KMEANS_TOLERANCE);
        if effective_clusters == self.n_clusters {
            // Multiple restarts to avoid poor local optima; skipped when the
            // cluster count was already reduced for a tiny batch.
            params = params.n_runs(KMEANS_RESTARTS);
        }
        let fitted = params.fit(&dataset)?;

        let state = TrainedState {
            model: PersonaModel {
                n_clusters: effective_clusters,
                centroids: fitted.centroids().clone(),
            },
            scaler,
        };

        // Hold the lock across persist + in-memory replacement so concurrent
        // predicts never mix an old model with a new scaler.
        let mut slot = self.slot.lock().expect("classifier lock poisoned");
        self.persist(&state)?;
        info!(
            clusters = effective_clusters,
            samples = n_samples,
            "persona model trained"
        );
        *slot = Some(state);
        Ok(())
    }

    /// Predict the persona cluster for a feature vector.
    ///
    /// Loads the last persisted model on first use. With no model available
    /// at all this degrades to [`DEFAULT_CLUSTER`] rather than erroring,
    /// since cold start is expected.
    pub fn predict(&self, vector: &Array1<f64>) -> usize {
        let mut slot = self.slot.lock().expect("classifier lock poisoned");

        if slot.is_none() {
            *slot = self.load_persisted();
        }

        match slot.as_ref() {
            Some(state) => {
                let scaled = state.scaler.transform_one(vector);
                state.model.nearest_cluster(&scaled)
            }
            None => {
                info!("no trained model available, using default cluster");
                DEFAULT_CLUSTER
            }
        }
    }

    /// Human-readable persona label for a cluster id.
    ///
    /// Cluster ids are not guaranteed to keep semantic meaning across
    /// retrains; if centroids reorder, labels swap with them.
    pub fn cluster_name(cluster_id: usize) -> &'static str {
        match cluster_id {
            0 => "Budget Master",
            1 => "Balanced Saver",
            2 => "Needs Improvement",
            _ => "Average Spender",
        }
    }

    /// Classify qualitative spending traits from the feature set.
    pub fn characterize(features: &FeatureSet) -> Characteristics {
        let mut by_percentage = features.category_stats.clone();
        by_percentage.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
        by_percentage.truncate(3);

        Characteristics {
            spending_level: classify_spending_level(features.total_expense),
            transaction_frequency: classify_frequency(features.num_transactions),
            spending_consistency: classify_consistency(
                features.std_transaction,
                features.avg_transaction,
            ),
            weekend_bias: classify_weekend_bias(features.weekend_spending_ratio),
            top_categories: by_percentage,
        }
    }

    /// Bundle the persona label and characteristics into the payload the
    /// recommendation engine consumes.
    pub fn cluster_insights(&self, cluster_id: usize, features: &FeatureSet) -> ClusterInsights {
        let characteristics = Self::characterize(features);
        let main_focus = characteristics
            .top_categories
            .first()
            .map(|c| c.category.clone())
            .unwrap_or_else(|| "General".to_string());

        ClusterInsights {
            persona: Self::cluster_name(cluster_id).to_string(),
            spending_level: characteristics.spending_level,
            main_focus,
            frequency: characteristics.transaction_frequency,
            consistency: characteristics.spending_consistency,
            weekend_pattern: characteristics.weekend_bias,
        }
    }

    /// Write scaler then model. Scaler goes first so a reader that finds the
    /// model file can rely on its matching scaler already being in place.
    fn persist(&self, state: &TrainedState) -> Result<(), InsightError> {
        std::fs::create_dir_all(&self.model_dir)?;
        write_json(&self.scaler_path(), &state.scaler)?;
        write_json(&self.model_path(), &state.model)?;
        Ok(())
    }

    /// Load the persisted model + scaler pair, or None when absent or
    /// unreadable. Load failures degrade to cold-start behavior.
    fn load_persisted(&self) -> Option<TrainedState> {
        let model_path = self.model_path();
        let scaler_path = self.scaler_path();
        if !model_path.exists() || !scaler_path.exists() {
            return None;
        }

        match (read_json(&model_path), read_json(&scaler_path)) {
            (Ok(model), Ok(scaler)) => {
                info!(path = %model_path.display(), "loaded persisted persona model");
                Some(TrainedState { model, scaler })
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "failed to load persisted model, falling back to default");
                None
            }
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), InsightError> {
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), value)
        .map_err(std::io::Error::from)?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, InsightError> {
    let file = File::open(path)?;
    let value = serde_json::from_reader(BufReader::new(file))
        .map_err(std::io::Error::from)?;
    Ok(value)
}

fn classify_spending_level(total_expense: f64) -> &'static str {
    if total_expense < 20_000.0 {
        "Low"
    } else if total_expense < 50_000.0 {
        "Moderate"
    } else {
        "High"
    }
}

fn classify_frequency(num_transactions: usize) -> &'static str {
    if num_transactions < 20 {
        "Occasional"
    } else if num_transactions < 50 {
        "Regular"
    } else {
        "Frequent"
    }
}

fn classify_consistency(std: f64, mean: f64) -> &'static str {
    if mean == 0.0 {
        return "Stable";
    }
    let cv = (std / mean) * 100.0; // Coefficient of variation
    if cv < 50.0 {
        "Very Consistent"
    } else if cv < 100.0 {
        "Moderately Consistent"
    } else {
        "Highly Variable"
    }
}

fn classify_weekend_bias(ratio: f64) -> &'static str {
    if ratio < 0.2 {
        "Weekday Focused"
    } else if ratio < 0.4 {
        "Balanced"
    } else {
        "Weekend Heavy"
    }
}
