//! Ensemble members - the scoring capability and the concrete families
//!
//! Every family answers `score(x)` with either a probability or a hard
//! class. The ensemble only ever sees `ScoreOutput::contribution()`.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::boosting::{BoostingParams, GradientBoosting};
use super::forest::{ForestParams, RandomForest};
use super::mlp::{MlpParams, NeuralNet};
use super::ScorerError;

// ============================================================================
// SCORING CAPABILITY
// ============================================================================

/// Output of one member for one vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScoreOutput {
    /// Fraud probability in [0, 1]
    Probability(f64),
    /// Hard fraud decision
    HardClass(bool),
}

impl ScoreOutput {
    /// Value summed into the weighted vote
    pub fn contribution(&self) -> f64 {
        match self {
            ScoreOutput::Probability(p) => p.clamp(0.0, 1.0),
            ScoreOutput::HardClass(true) => 1.0,
            ScoreOutput::HardClass(false) => 0.0,
        }
    }
}

pub trait Scoreable {
    fn score(&self, x: &[f64]) -> ScoreOutput;
}

// ============================================================================
// CLASS BALANCE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassBalance {
    pub positives: usize,
    pub negatives: usize,
}

impl ClassBalance {
    pub fn from_labels(labels: &[bool]) -> Self {
        let positives = labels.iter().filter(|&&y| y).count();
        Self {
            positives,
            negatives: labels.len() - positives,
        }
    }

    pub fn total(&self) -> usize {
        self.positives + self.negatives
    }

    pub fn is_single_class(&self) -> bool {
        self.positives == 0 || self.negatives == 0
    }

    /// negatives / positives, 1.0 when undefined
    pub fn scale_pos_weight(&self) -> f64 {
        if self.positives == 0 {
            1.0
        } else {
            self.negatives as f64 / self.positives as f64
        }
    }

    /// Per-class weight n / (2 * n_class)
    pub fn balanced_weight(&self, label: bool) -> f64 {
        let n_class = if label { self.positives } else { self.negatives };
        if n_class == 0 {
            1.0
        } else {
            self.total() as f64 / (2.0 * n_class as f64)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImbalanceStrategy {
    /// Positives weighted negatives / positives
    ScalePosWeight,
    /// Each class weighted n / (2 * n_class)
    Balanced,
    /// Unit weights
    None,
}

impl ImbalanceStrategy {
    pub fn sample_weights(self, labels: &[bool]) -> Vec<f64> {
        let balance = ClassBalance::from_labels(labels);
        labels
            .iter()
            .map(|&y| match self {
                ImbalanceStrategy::ScalePosWeight if y => balance.scale_pos_weight(),
                ImbalanceStrategy::ScalePosWeight => 1.0,
                ImbalanceStrategy::Balanced => balance.balanced_weight(y),
                ImbalanceStrategy::None => 1.0,
            })
            .collect()
    }
}

// ============================================================================
// TRAINING INPUT
// ============================================================================

/// Borrowed training / validation matrices shared by every member
pub struct TrainingSet<'a> {
    pub rows: Vec<&'a [f64]>,
    pub labels: &'a [bool],
    pub val_rows: Vec<&'a [f64]>,
    pub val_labels: &'a [bool],
}

impl TrainingSet<'_> {
    pub fn width(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn has_validation(&self) -> bool {
        !self.val_rows.is_empty()
    }
}

// ============================================================================
// SUB-MODELS
// ============================================================================

/// Trained member, serialisable inside the bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum SubModel {
    Mlp(NeuralNet),
    Forest(RandomForest),
    Boosting(GradientBoosting),
}

impl Scoreable for SubModel {
    fn score(&self, x: &[f64]) -> ScoreOutput {
        match self {
            SubModel::Mlp(m) => m.score(x),
            SubModel::Forest(m) => m.score(x),
            SubModel::Boosting(m) => m.score(x),
        }
    }
}

impl SubModel {
    pub fn family(&self) -> &'static str {
        match self {
            SubModel::Mlp(_) => "mlp",
            SubModel::Forest(_) => "forest",
            SubModel::Boosting(_) => "boosting",
        }
    }

    /// Expected input width
    pub fn input_width(&self) -> usize {
        match self {
            SubModel::Mlp(m) => m.input_width(),
            SubModel::Forest(m) => m.input_width(),
            SubModel::Boosting(m) => m.input_width(),
        }
    }
}

/// Family choice plus its hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum FamilyConfig {
    Mlp(MlpParams),
    Forest(ForestParams),
    Boosting(BoostingParams),
}

impl FamilyConfig {
    pub fn train(&self, data: &TrainingSet<'_>, rng: &mut StdRng) -> Result<SubModel, ScorerError> {
        Ok(match self {
            FamilyConfig::Mlp(p) => SubModel::Mlp(NeuralNet::fit(data, p, rng)?),
            FamilyConfig::Forest(p) => SubModel::Forest(RandomForest::fit(data, p, rng)?),
            FamilyConfig::Boosting(p) => SubModel::Boosting(GradientBoosting::fit(data, p, rng)?),
        })
    }
}

/// One configured ensemble member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSpec {
    pub name: String,
    pub weight: f64,
    pub config: FamilyConfig,
}

impl MemberSpec {
    pub fn new(name: &str, weight: f64, config: FamilyConfig) -> Self {
        Self {
            name: name.to_string(),
            weight,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contribution() {
        assert_eq!(ScoreOutput::Probability(0.3).contribution(), 0.3);
        assert_eq!(ScoreOutput::Probability(1.7).contribution(), 1.0);
        assert_eq!(ScoreOutput::HardClass(true).contribution(), 1.0);
        assert_eq!(ScoreOutput::HardClass(false).contribution(), 0.0);
    }

    #[test]
    fn test_class_weights() {
        let labels = [true, false, false, false];
        let balance = ClassBalance::from_labels(&labels);
        assert_eq!(balance.scale_pos_weight(), 3.0);
        assert_eq!(balance.balanced_weight(true), 2.0);
        assert!((balance.balanced_weight(false) - 4.0 / 6.0).abs() < 1e-12);

        assert_eq!(
            ImbalanceStrategy::ScalePosWeight.sample_weights(&labels),
            vec![3.0, 1.0, 1.0, 1.0]
        );
        assert_eq!(ImbalanceStrategy::None.sample_weights(&labels), vec![1.0; 4]);
    }

    #[test]
    fn test_single_class_balance() {
        let balance = ClassBalance::from_labels(&[false, false]);
        assert!(balance.is_single_class());
        assert_eq!(balance.scale_pos_weight(), 1.0);
        assert_eq!(balance.balanced_weight(true), 1.0);
    }
}
