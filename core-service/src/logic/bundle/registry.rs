//! Serving Registry - the currently active bundle
//!
//! Readers clone an `Arc<ModelBundle>` under a short read lock and score
//! without holding it. Publishing swaps the `Arc`, so a reload never blocks
//! in-flight requests and no request ever sees a half-replaced bundle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use log::{info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::logic::error::FraudError;
use crate::logic::features::RawTransaction;
use crate::constants::DEFAULT_THRESHOLD;
use crate::logic::model::{PredictionRecord, ThresholdConfig};

use super::store::{BundleHandle, BundleStore};
use super::types::ModelBundle;
use super::validate::{validate_bundle, BundleError};

// ============================================================================
// STATE
// ============================================================================

struct Active {
    bundle: Arc<ModelBundle>,
    published_at: DateTime<Utc>,
}

/// Registry status for UI / health checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServingStatus {
    pub ready: bool,
    pub bundle_id: Option<String>,
    pub projection_id: Option<String>,
    pub latent_width: Option<usize>,
    pub published_at: Option<DateTime<Utc>>,
    pub default_threshold: f64,
    pub avg_latency_ms: f32,
    pub score_count: u64,
    pub error_count: u64,
}

pub struct ModelRegistry {
    active: RwLock<Option<Active>>,
    threshold: RwLock<ThresholdConfig>,
    latency_sum_us: AtomicU64,
    score_count: AtomicU64,
    error_count: AtomicU64,
}

impl ModelRegistry {
    pub const fn new() -> Self {
        Self::with_threshold(ThresholdConfig::new(DEFAULT_THRESHOLD))
    }

    /// Registry whose requests without a threshold fall back to `threshold`
    pub const fn with_threshold(threshold: ThresholdConfig) -> Self {
        Self {
            active: RwLock::new(None),
            threshold: RwLock::new(threshold),
            latency_sum_us: AtomicU64::new(0),
            score_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
        }
    }

    /// Make `bundle` the active one. Returns the bundle it replaced.
    pub fn publish(&self, bundle: ModelBundle) -> Result<Option<Arc<ModelBundle>>, BundleError> {
        self.swap_in(bundle).map(|(_, previous)| previous)
    }

    /// Returns the newly active `Arc` together with the one it replaced
    fn swap_in(&self, bundle: ModelBundle) -> Result<(Arc<ModelBundle>, Option<Arc<ModelBundle>>), BundleError> {
        validate_bundle(&bundle)?;
        let bundle = Arc::new(bundle);
        let next = Active {
            bundle: Arc::clone(&bundle),
            published_at: Utc::now(),
        };
        let previous = self.active.write().replace(next).map(|a| a.bundle);
        match &previous {
            Some(old) => info!("Published bundle {} (replacing {})", bundle.id(), old.id()),
            None => info!("Published bundle {}", bundle.id()),
        }
        Ok((bundle, previous))
    }

    pub fn current(&self) -> Option<Arc<ModelBundle>> {
        self.active.read().as_ref().map(|a| Arc::clone(&a.bundle))
    }

    pub fn is_ready(&self) -> bool {
        self.active.read().is_some()
    }

    /// Load from the store and publish. The active bundle is untouched on error.
    pub fn load_and_publish(&self, store: &BundleStore, handle: &BundleHandle) -> Result<Arc<ModelBundle>, BundleError> {
        let bundle = store.load(handle)?;
        self.swap_in(bundle).map(|(active, _)| active)
    }

    pub fn threshold(&self) -> ThresholdConfig {
        self.threshold.read().clone()
    }

    /// Replace the fallback decision threshold
    pub fn set_threshold(&self, threshold: ThresholdConfig) -> Result<(), FraudError> {
        threshold
            .validate()
            .map_err(|e| FraudError::Config(format!("threshold: {}", e)))?;
        info!("Default threshold set to {}", threshold.default_threshold);
        *self.threshold.write() = threshold;
        Ok(())
    }

    /// Score one raw transaction with the active bundle
    pub fn score(&self, row: &RawTransaction, threshold: Option<f64>) -> Result<PredictionRecord, FraudError> {
        let Some(bundle) = self.current() else {
            self.error_count.fetch_add(1, Ordering::Relaxed);
            return Err(FraudError::NotReady);
        };
        let threshold = self.threshold.read().resolve(threshold);

        let start = Instant::now();
        let result = bundle.score_one(row, threshold);
        let elapsed_us = start.elapsed().as_micros() as u64;

        match &result {
            Ok(_) => {
                self.latency_sum_us.fetch_add(elapsed_us, Ordering::Relaxed);
                self.score_count.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.error_count.fetch_add(1, Ordering::Relaxed);
                warn!("Scoring with bundle {} failed: {}", bundle.id(), e);
            }
        }
        result
    }

    pub fn status(&self) -> ServingStatus {
        let active = self.active.read();
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.score_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 };

        ServingStatus {
            ready: active.is_some(),
            bundle_id: active.as_ref().map(|a| a.bundle.id().to_string()),
            projection_id: active.as_ref().map(|a| a.bundle.ensemble().projection_id().to_string()),
            latent_width: active.as_ref().map(|a| a.bundle.latent_width()),
            published_at: active.as_ref().map(|a| a.published_at),
            default_threshold: self.threshold.read().default_threshold,
            avg_latency_ms: avg,
            score_count: count,
            error_count: self.error_count.load(Ordering::Relaxed),
        }
    }

    /// Drop the active bundle and reset counters
    pub fn clear(&self) {
        *self.active.write() = None;
        self.latency_sum_us.store(0, Ordering::Relaxed);
        self.score_count.store(0, Ordering::Relaxed);
        self.error_count.store(0, Ordering::Relaxed);
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// PROCESS-WIDE REGISTRY
// ============================================================================

static REGISTRY: ModelRegistry = ModelRegistry::new();

pub fn registry() -> &'static ModelRegistry {
    &REGISTRY
}

pub fn publish(bundle: ModelBundle) -> Result<Option<Arc<ModelBundle>>, BundleError> {
    REGISTRY.publish(bundle)
}

pub fn current() -> Option<Arc<ModelBundle>> {
    REGISTRY.current()
}

pub fn is_ready() -> bool {
    REGISTRY.is_ready()
}

pub fn score(row: &RawTransaction, threshold: Option<f64>) -> Result<PredictionRecord, FraudError> {
    REGISTRY.score(row, threshold)
}

pub fn set_threshold(threshold: ThresholdConfig) -> Result<(), FraudError> {
    REGISTRY.set_threshold(threshold)
}

pub fn get_status() -> ServingStatus {
    REGISTRY.status()
}
