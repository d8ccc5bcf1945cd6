//! Prediction Record - scorer output and monitor input

use serde::{Deserialize, Serialize};

/// One scored transaction. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    is_fraud: bool,
    probability: f64,
    threshold: f64,
}

impl PredictionRecord {
    pub fn new(is_fraud: bool, probability: f64, threshold: f64) -> Self {
        Self {
            is_fraud,
            probability,
            threshold,
        }
    }

    /// Build from a score, applying the exclusive threshold rule
    pub fn from_score(probability: f64, threshold: f64) -> Self {
        Self::new(super::threshold::classify(probability, threshold), probability, threshold)
    }

    pub fn is_fraud(&self) -> bool {
        self.is_fraud
    }

    /// Weighted ensemble score (in [0,1] when weights sum to at most 1)
    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_score() {
        assert!(!PredictionRecord::from_score(0.5, 0.5).is_fraud());
        assert!(PredictionRecord::from_score(0.51, 0.5).is_fraud());
    }

    #[test]
    fn test_json_shape() {
        let record = PredictionRecord::new(true, 0.75, 0.5);
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["is_fraud"], true);
        assert_eq!(json["probability"], 0.75);
        assert_eq!(json["threshold"], 0.5);
    }
}
