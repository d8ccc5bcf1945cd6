//! Decision Threshold Configuration
//!
//! The boundary is exclusive: a score equal to the threshold is not fraud.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_THRESHOLD;

/// Threshold Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Decision threshold used when a request does not supply one (0.0 - 1.0)
    pub default_threshold: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            default_threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ThresholdConfig {
    pub const fn new(threshold: f64) -> Self {
        Self {
            default_threshold: threshold,
        }
    }

    /// High sensitivity (lower threshold)
    pub fn high_sensitivity() -> Self {
        Self::new(0.3)
    }

    /// Low sensitivity (higher threshold)
    pub fn low_sensitivity() -> Self {
        Self::new(0.8)
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_threshold(self.default_threshold)
    }

    /// Resolve an optional per-request threshold
    pub fn resolve(&self, requested: Option<f64>) -> f64 {
        requested.unwrap_or(self.default_threshold)
    }
}

pub fn validate_threshold(threshold: f64) -> Result<(), String> {
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        return Err(format!("threshold {} is outside [0, 1]", threshold));
    }
    Ok(())
}

/// Fraud iff `score > threshold`
#[inline]
pub fn classify(score: f64, threshold: f64) -> bool {
    score > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_is_exclusive() {
        assert!(!classify(0.5, 0.5));
        assert!(classify(0.5000001, 0.5));
        assert!(!classify(0.0, 0.0));
        assert!(!classify(1.0, 1.0));
    }

    #[test]
    fn test_presets() {
        assert_eq!(ThresholdConfig::default().default_threshold, 0.5);
        assert!(ThresholdConfig::high_sensitivity().default_threshold < 0.5);
        assert!(ThresholdConfig::low_sensitivity().default_threshold > 0.5);
    }

    #[test]
    fn test_validate_and_resolve() {
        assert!(ThresholdConfig::new(0.0).validate().is_ok());
        assert!(ThresholdConfig::new(1.0).validate().is_ok());
        assert!(ThresholdConfig::new(1.2).validate().is_err());
        assert!(ThresholdConfig::new(f64::NAN).validate().is_err());

        let config = ThresholdConfig::default();
        assert_eq!(config.resolve(None), 0.5);
        assert_eq!(config.resolve(Some(0.9)), 0.9);
    }
}
