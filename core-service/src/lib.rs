//! Fraud Scoring Core
//!
//! Projects raw transactions into a latent vector, scores them with a
//! weighted ensemble and monitors live performance for drift.
//!
//! ## Layout
//! - `logic::features` - Feature Projector (impute, scale, encode, PCA)
//! - `logic::model` - Ensemble Scorer (MLP, forest, boosted trees)
//! - `logic::bundle` - Model Bundle Store + serving registry
//! - `logic::monitor` - Performance Monitor (sliding window, drift)
//! - `logic::pipeline` - Training orchestration

pub mod constants;
pub mod logic;

pub use logic::bundle::{BundleError, BundleHandle, BundleStore, ModelBundle, ModelRegistry};
pub use logic::config::ScoringConfig;
pub use logic::error::FraudError;
pub use logic::features::{
    FeatureKind, FeatureProjector, FeatureSchema, LabeledTransaction, LatentVector,
    ProjectorError, RawTransaction, RawValue,
};
pub use logic::model::{EnsembleModel, PredictionRecord, ScorerError};
pub use logic::monitor::{DriftReport, MetricsSnapshot, MonitorError, PerformanceMonitor};
pub use logic::pipeline::FraudDetector;

/// Initialise `env_logger` with an `info` default filter.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
