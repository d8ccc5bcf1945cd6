//! Scoring Configuration
//!
//! One struct aggregating every tunable. `Default` uses the compiled
//! defaults from `constants`; `from_env` applies the `FRAUD_*` overrides.

use serde::{Deserialize, Serialize};

use crate::constants::{
    get_drift_threshold, get_monitor_window, get_n_components, get_threshold, DEFAULT_SEED,
    DEFAULT_VALIDATION_FRACTION,
};

use super::error::FraudError;
use super::features::ProjectorConfig;
use super::model::{EnsembleConfig, ThresholdConfig};
use super::monitor::MonitorConfig;

/// Train / validation split settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of each class held out for validation (0.0 disables)
    pub validation_fraction: f64,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            validation_fraction: DEFAULT_VALIDATION_FRACTION,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub projector: ProjectorConfig,
    pub ensemble: EnsembleConfig,
    pub threshold: ThresholdConfig,
    pub monitor: MonitorConfig,
    pub training: TrainingConfig,
}

impl ScoringConfig {
    /// Defaults with `FRAUD_*` environment overrides applied
    pub fn from_env() -> Self {
        Self {
            projector: ProjectorConfig {
                n_components: get_n_components(),
            },
            threshold: ThresholdConfig::new(get_threshold()),
            monitor: MonitorConfig {
                window_size: get_monitor_window(),
                drift_threshold: get_drift_threshold(),
                ..MonitorConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), FraudError> {
        self.projector
            .validate()
            .map_err(|e| FraudError::Config(format!("projector: {}", e)))?;
        self.ensemble
            .validate()
            .map_err(|e| FraudError::Config(format!("ensemble: {}", e)))?;
        self.threshold
            .validate()
            .map_err(|e| FraudError::Config(format!("threshold: {}", e)))?;
        self.monitor
            .validate()
            .map_err(|e| FraudError::Config(format!("monitor: {}", e)))?;

        let fraction = self.training.validation_fraction;
        if !fraction.is_finite() || !(0.0..1.0).contains(&fraction) {
            return Err(FraudError::Config(format!(
                "training: validation_fraction {} is outside [0, 1)",
                fraction
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScoringConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.projector.n_components, 28);
        assert_eq!(config.threshold.default_threshold, 0.5);
        assert_eq!(config.training.validation_fraction, 0.2);
        assert_eq!(config.ensemble.members.len(), 4);
    }

    #[test]
    fn test_invalid_sections_are_reported() {
        let mut config = ScoringConfig::default();
        config.threshold = ThresholdConfig::new(1.5);
        assert!(matches!(config.validate(), Err(FraudError::Config(msg)) if msg.starts_with("threshold")));

        let mut config = ScoringConfig::default();
        config.training.validation_fraction = 1.0;
        assert!(matches!(config.validate(), Err(FraudError::Config(msg)) if msg.starts_with("training")));

        let mut config = ScoringConfig::default();
        config.projector.n_components = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_ignores_environment() {
        std::env::set_var("FRAUD_MONITOR_WINDOW", "7");
        std::env::set_var("FRAUD_DRIFT_THRESHOLD", "0.33");

        let config = ScoringConfig::default();
        assert_eq!(config.monitor.window_size, 1000);
        assert_eq!(config.monitor.drift_threshold, 0.1);

        let config = ScoringConfig::from_env();
        assert_eq!(config.monitor.window_size, 7);
        assert_eq!(config.monitor.drift_threshold, 0.33);

        std::env::remove_var("FRAUD_MONITOR_WINDOW");
        std::env::remove_var("FRAUD_DRIFT_THRESHOLD");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ScoringConfig =
            serde_json::from_str(r#"{ "projector": { "n_components": 5 } }"#).unwrap();
        assert_eq!(config.projector.n_components, 5);
        assert_eq!(config.training, TrainingConfig::default());
    }
}
