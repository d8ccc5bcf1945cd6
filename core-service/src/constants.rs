//! Central Configuration Constants
//!
//! Single source of truth for all scoring defaults.
//! Every value can be overridden through the environment; helpers below
//! fall back to the compiled default when the variable is absent or invalid.

/// Number of retained PCA components (V1..V28)
pub const DEFAULT_N_COMPONENTS: usize = 28;

/// Decision threshold applied to the ensemble score (`score > threshold`)
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Capacity of the performance monitor's sliding window
pub const DEFAULT_MONITOR_WINDOW: usize = 1000;

/// Relative change above which a metric is reported as drifted
pub const DEFAULT_DRIFT_THRESHOLD: f64 = 0.1;

/// Fraction of labelled examples held out for validation during training
pub const DEFAULT_VALIDATION_FRACTION: f64 = 0.2;

/// Seed used for splits, bootstraps and weight init
pub const DEFAULT_SEED: u64 = 42;

/// Voting weight given to each default ensemble member
pub const DEFAULT_MEMBER_WEIGHT: f64 = 0.25;

/// Sentinel category used for absent categorical values
pub const MISSING_CATEGORY: &str = "missing";

/// App directory name under the platform data dir
pub const APP_DIR_NAME: &str = "fraud-scoring";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get decision threshold from environment or use default
pub fn get_threshold() -> f64 {
    std::env::var("FRAUD_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|t: &f64| (0.0..=1.0).contains(t))
        .unwrap_or(DEFAULT_THRESHOLD)
}

/// Get number of PCA components from environment or use default
pub fn get_n_components() -> usize {
    std::env::var("FRAUD_N_COMPONENTS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n: &usize| *n > 0)
        .unwrap_or(DEFAULT_N_COMPONENTS)
}

/// Get monitor window size from environment or use default
pub fn get_monitor_window() -> usize {
    std::env::var("FRAUD_MONITOR_WINDOW")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n: &usize| *n > 0)
        .unwrap_or(DEFAULT_MONITOR_WINDOW)
}

/// Get drift threshold from environment or use default
pub fn get_drift_threshold() -> f64 {
    std::env::var("FRAUD_DRIFT_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|t: &f64| t.is_finite() && *t >= 0.0)
        .unwrap_or(DEFAULT_DRIFT_THRESHOLD)
}

/// Get model bundle directory from environment or use the platform data dir
pub fn get_model_dir() -> std::path::PathBuf {
    std::env::var("FRAUD_MODEL_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| std::path::PathBuf::from("."))
                .join(APP_DIR_NAME)
                .join("models")
        })
}
