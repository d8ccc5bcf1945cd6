//! Monitor Module - Live performance and drift
//!
//! Bounded sliding windows of predictions and delayed ground truth,
//! precision / recall / F1 over the labelled tail, and relative drift
//! against a reference snapshot.

pub mod window;
pub mod metrics;
pub mod drift;
pub mod performance;


// Re-export common types
pub use metrics::MetricsSnapshot;
pub use drift::{detect_drift, DriftReport, ZeroReferencePolicy};
pub use performance::{MonitorConfig, MonitorStatus, PerformanceMonitor};

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorError {
    /// Relative change undefined because the reference value is zero
    MetricUndefined { metric: String },
    /// Drift threshold negative or not finite
    InvalidThreshold(f64),
}

impl std::fmt::Display for MonitorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorError::MetricUndefined { metric } => {
                write!(f, "Drift undefined for '{}': reference value is zero", metric)
            }
            MonitorError::InvalidThreshold(t) => write!(f, "Invalid drift threshold: {}", t),
        }
    }
}

impl std::error::Error for MonitorError {}
