//! Performance Monitor - sliding windows of predictions and ground truth
//!
//! **Window invariants**
//! 1. predictions.len() <= window_size
//! 2. labels.len() <= predictions.len()
//! 3. the k labels pair with the k most recent predictions
//!
//! All mutation happens under one `parking_lot::Mutex`; metrics are
//! computed from a snapshot taken under the same lock.

use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DRIFT_THRESHOLD, DEFAULT_MONITOR_WINDOW};
use crate::logic::model::PredictionRecord;

use super::drift::{self, detect_drift, DriftReport, ZeroReferencePolicy};
use super::metrics::MetricsSnapshot;
use super::window::BoundedWindow;
use super::MonitorError;

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub window_size: usize,
    pub drift_threshold: f64,
    pub zero_reference: ZeroReferencePolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_MONITOR_WINDOW,
            drift_threshold: DEFAULT_DRIFT_THRESHOLD,
            zero_reference: ZeroReferencePolicy::default(),
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.window_size == 0 {
            return Err("window_size must be at least 1".to_string());
        }
        drift::validate_threshold(self.drift_threshold).map_err(|e| e.to_string())
    }
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug)]
struct WindowState {
    predictions: BoundedWindow<PredictionRecord>,
    labels: BoundedWindow<bool>,
    total_recorded: u64,
    dropped_labels: u64,
}

impl WindowState {
    fn new(capacity: usize) -> Self {
        Self {
            predictions: BoundedWindow::new(capacity),
            labels: BoundedWindow::new(capacity),
            total_recorded: 0,
            dropped_labels: 0,
        }
    }

    fn metrics(&self) -> MetricsSnapshot {
        let k = self.labels.len();
        if k == 0 {
            return MetricsSnapshot::empty();
        }
        let predicted: Vec<bool> = self.predictions.latest(k).map(|p| p.is_fraud()).collect();
        let actual: Vec<bool> = self.labels.iter().copied().collect();
        MetricsSnapshot::compute(&predicted, &actual)
    }
}

/// Monitor counters for status endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub window_size: usize,
    pub predictions: usize,
    pub labels: usize,
    pub total_recorded: u64,
    pub dropped_labels: u64,
}

// ============================================================================
// MONITOR
// ============================================================================

pub struct PerformanceMonitor {
    config: MonitorConfig,
    state: Mutex<WindowState>,
}

impl PerformanceMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        let capacity = config.window_size.max(1);
        Self {
            config,
            state: Mutex::new(WindowState::new(capacity)),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Append a prediction and, if known, its ground truth
    pub fn record(&self, prediction: PredictionRecord, ground_truth: Option<bool>) {
        let mut state = self.state.lock();
        state.total_recorded += 1;

        if state.predictions.push(prediction).is_some() {
            // keep labels aligned with the surviving predictions
            state.labels.pop_oldest();
        }
        if let Some(label) = ground_truth {
            state.labels.push(label);
        }
    }

    /// Ground truth arriving after its prediction was recorded
    pub fn record_label(&self, label: bool) -> bool {
        let mut state = self.state.lock();
        if state.labels.len() >= state.predictions.len() {
            state.dropped_labels += 1;
            warn!(
                "Dropping label: {} labels already pair with {} predictions",
                state.labels.len(),
                state.predictions.len()
            );
            return false;
        }
        state.labels.push(label);
        true
    }

    pub fn compute_metrics(&self) -> MetricsSnapshot {
        let metrics = self.state.lock().metrics();
        debug!(
            "Window metrics over {} samples: {:?}/{:?}/{:?}",
            metrics.sample_count, metrics.precision, metrics.recall, metrics.f1
        );
        metrics
    }

    /// Compare the current window with a reference snapshot
    pub fn check_drift(&self, reference: &MetricsSnapshot, threshold: Option<f64>) -> Result<DriftReport, MonitorError> {
        let threshold = threshold.unwrap_or(self.config.drift_threshold);
        let current = self.compute_metrics();
        detect_drift(reference, &current, threshold, self.config.zero_reference)
    }

    pub fn window_len(&self) -> usize {
        self.state.lock().predictions.len()
    }

    pub fn label_count(&self) -> usize {
        self.state.lock().labels.len()
    }

    /// Copy of the prediction window, oldest first
    pub fn predictions(&self) -> Vec<PredictionRecord> {
        self.state.lock().predictions.iter().copied().collect()
    }

    pub fn status(&self) -> MonitorStatus {
        let state = self.state.lock();
        MonitorStatus {
            window_size: state.predictions.capacity(),
            predictions: state.predictions.len(),
            labels: state.labels.len(),
            total_recorded: state.total_recorded,
            dropped_labels: state.dropped_labels,
        }
    }

    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.predictions.clear();
        state.labels.clear();
        debug!("Performance monitor window cleared");
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}
