//! Ensemble Model - weighted vote over independently trained members
//!
//! `score = sum(weight_i * contribution_i)` with no renormalisation, and
//! `is_fraud = score > threshold`.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use chrono::{DateTime, Utc};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MEMBER_WEIGHT, DEFAULT_SEED, DEFAULT_THRESHOLD};
use crate::logic::features::LatentVector;
use crate::logic::monitor::MetricsSnapshot;

use super::boosting::BoostingParams;
use super::forest::ForestParams;
use super::member::{ClassBalance, FamilyConfig, MemberSpec, ScoreOutput, Scoreable, SubModel, TrainingSet};
use super::mlp::MlpParams;
use super::record::PredictionRecord;
use super::threshold::classify;
use super::ScorerError;

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    pub members: Vec<MemberSpec>,
    /// Base seed; member `i` trains with `seed + i`
    pub seed: u64,
    /// Threshold used for the post-training validation report
    pub eval_threshold: f64,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            members: vec![
                MemberSpec::new("mlp", DEFAULT_MEMBER_WEIGHT, FamilyConfig::Mlp(MlpParams::default())),
                MemberSpec::new("rf", DEFAULT_MEMBER_WEIGHT, FamilyConfig::Forest(ForestParams::default())),
                MemberSpec::new("xgb", DEFAULT_MEMBER_WEIGHT, FamilyConfig::Boosting(BoostingParams::depth_wise())),
                MemberSpec::new("lgb", DEFAULT_MEMBER_WEIGHT, FamilyConfig::Boosting(BoostingParams::leaf_wise())),
            ],
            seed: DEFAULT_SEED,
            eval_threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl EnsembleConfig {
    pub fn validate(&self) -> Result<(), ScorerError> {
        if self.members.is_empty() {
            return Err(ScorerError::Training("ensemble has no members".to_string()));
        }
        let weights: Vec<(&str, f64)> = self.members.iter().map(|m| (m.name.as_str(), m.weight)).collect();
        validate_weights(&weights).map_err(ScorerError::Training)
    }
}

fn validate_weights(weights: &[(&str, f64)]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for (name, weight) in weights {
        if !seen.insert(*name) {
            return Err(format!("duplicate member name '{}'", name));
        }
        if !weight.is_finite() || *weight < 0.0 {
            return Err(format!("member '{}' has invalid weight {}", name, weight));
        }
    }
    Ok(())
}

// ============================================================================
// MODEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleMember {
    pub name: String,
    pub weight: f64,
    pub model: SubModel,
}

/// Per-member output for one vector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberScore {
    pub name: String,
    pub weight: f64,
    pub output: ScoreOutput,
}

/// Held-out evaluation recorded right after training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub threshold: f64,
    pub sample_count: usize,
    pub ensemble: MetricsSnapshot,
    pub members: BTreeMap<String, MetricsSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleModel {
    members: Vec<EnsembleMember>,
    input_width: usize,
    projection_id: String,
    trained_at: DateTime<Utc>,
    class_balance: ClassBalance,
    validation: Option<ValidationReport>,
}

impl EnsembleModel {
    /// Train every member independently on the same data
    pub fn train(
        config: &EnsembleConfig,
        x_train: &[LatentVector],
        y_train: &[bool],
        x_val: &[LatentVector],
        y_val: &[bool],
    ) -> Result<Self, ScorerError> {
        let start = Instant::now();
        config.validate()?;

        if x_train.is_empty() {
            return Err(ScorerError::Training("no training vectors".to_string()));
        }
        if x_train.len() != y_train.len() {
            return Err(ScorerError::Training(format!(
                "{} training vectors but {} labels",
                x_train.len(),
                y_train.len()
            )));
        }
        if x_val.len() != y_val.len() {
            return Err(ScorerError::Training(format!(
                "{} validation vectors but {} labels",
                x_val.len(),
                y_val.len()
            )));
        }

        let input_width = x_train[0].width();
        let projection_id = x_train[0].projection_id.clone();
        if input_width == 0 {
            return Err(ScorerError::Training("latent vectors are empty".to_string()));
        }
        for v in x_train.iter().chain(x_val) {
            if v.width() != input_width {
                return Err(ScorerError::Training(format!(
                    "inconsistent widths: {} and {}",
                    input_width,
                    v.width()
                )));
            }
            if !v.is_from(&projection_id) {
                return Err(ScorerError::Training(
                    "vectors come from more than one projector fit".to_string(),
                ));
            }
        }

        let class_balance = ClassBalance::from_labels(y_train);
        if class_balance.is_single_class() {
            warn!(
                "Training set has a single class ({} positives, {} negatives)",
                class_balance.positives, class_balance.negatives
            );
        }

        let data = TrainingSet {
            rows: x_train.iter().map(LatentVector::as_slice).collect(),
            labels: y_train,
            val_rows: x_val.iter().map(LatentVector::as_slice).collect(),
            val_labels: y_val,
        };

        let mut members = Vec::with_capacity(config.members.len());
        for (i, spec) in config.members.iter().enumerate() {
            let member_start = Instant::now();
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(i as u64));
            let model = spec.config.train(&data, &mut rng)?;
            info!("Member '{}' ({}) trained in {:?}", spec.name, model.family(), member_start.elapsed());
            members.push(EnsembleMember {
                name: spec.name.clone(),
                weight: spec.weight,
                model,
            });
        }

        let mut ensemble = Self {
            members,
            input_width,
            projection_id,
            trained_at: Utc::now(),
            class_balance,
            validation: None,
        };

        if !x_val.is_empty() {
            let report = ensemble.evaluate(x_val, y_val, config.eval_threshold)?;
            info!(
                "Validation ({} samples): precision {:.3}, recall {:.3}, f1 {:.3}",
                report.sample_count,
                report.ensemble.precision.unwrap_or(0.0),
                report.ensemble.recall.unwrap_or(0.0),
                report.ensemble.f1.unwrap_or(0.0)
            );
            ensemble.validation = Some(report);
        }

        info!(
            "Ensemble trained: {} members on {} x {} in {:?}",
            ensemble.members.len(),
            x_train.len(),
            input_width,
            start.elapsed()
        );
        Ok(ensemble)
    }

    /// Assemble from already trained members
    pub fn from_members(
        members: Vec<EnsembleMember>,
        input_width: usize,
        projection_id: impl Into<String>,
    ) -> Result<Self, ScorerError> {
        let weights: Vec<(&str, f64)> = members.iter().map(|m| (m.name.as_str(), m.weight)).collect();
        validate_weights(&weights).map_err(ScorerError::InvalidWeights)?;
        if let Some(m) = members.iter().find(|m| m.model.input_width() != input_width) {
            return Err(ScorerError::DimensionMismatch {
                expected: input_width,
                actual: m.model.input_width(),
            });
        }
        Ok(Self {
            members,
            input_width,
            projection_id: projection_id.into(),
            trained_at: Utc::now(),
            class_balance: ClassBalance { positives: 0, negatives: 0 },
            validation: None,
        })
    }

    // ------------------------------------------------------------------------
    // Scoring
    // ------------------------------------------------------------------------

    /// Classes and scores for a batch
    pub fn predict(&self, x: &[LatentVector], threshold: f64) -> Result<(Vec<bool>, Vec<f64>), ScorerError> {
        let scores = self.scores(x)?;
        let classes = scores.iter().map(|&s| classify(s, threshold)).collect();
        Ok((classes, scores))
    }

    pub fn predict_records(&self, x: &[LatentVector], threshold: f64) -> Result<Vec<PredictionRecord>, ScorerError> {
        Ok(self
            .scores(x)?
            .into_iter()
            .map(|s| PredictionRecord::from_score(s, threshold))
            .collect())
    }

    pub fn predict_one(&self, x: &LatentVector, threshold: f64) -> Result<PredictionRecord, ScorerError> {
        self.check_vector(x)?;
        Ok(PredictionRecord::from_score(self.score_vector(x.as_slice()), threshold))
    }

    /// Weighted scores without thresholding
    pub fn scores(&self, x: &[LatentVector]) -> Result<Vec<f64>, ScorerError> {
        for v in x {
            self.check_vector(v)?;
        }
        Ok(x.iter().map(|v| self.score_vector(v.as_slice())).collect())
    }

    pub fn member_scores(&self, x: &LatentVector) -> Result<Vec<MemberScore>, ScorerError> {
        self.check_vector(x)?;
        Ok(self
            .members
            .iter()
            .map(|m| MemberScore {
                name: m.name.clone(),
                weight: m.weight,
                output: m.model.score(x.as_slice()),
            })
            .collect())
    }

    fn score_vector(&self, x: &[f64]) -> f64 {
        let outputs: Vec<(f64, ScoreOutput)> =
            self.members.iter().map(|m| (m.weight, m.model.score(x))).collect();
        weighted_vote(&outputs)
    }

    fn check_vector(&self, v: &LatentVector) -> Result<(), ScorerError> {
        if self.members.is_empty() {
            return Err(ScorerError::NotFitted);
        }
        if v.width() != self.input_width {
            return Err(ScorerError::DimensionMismatch {
                expected: self.input_width,
                actual: v.width(),
            });
        }
        if !v.is_from(&self.projection_id) {
            return Err(ScorerError::ProjectionMismatch {
                expected: self.projection_id.clone(),
                actual: v.projection_id.clone(),
            });
        }
        Ok(())
    }

    /// Ensemble and per-member metrics on labelled vectors
    pub fn evaluate(&self, x: &[LatentVector], y: &[bool], threshold: f64) -> Result<ValidationReport, ScorerError> {
        let (predicted, _) = self.predict(x, threshold)?;
        let ensemble = MetricsSnapshot::compute(&predicted, y);

        let members = self
            .members
            .iter()
            .map(|m| {
                let member_pred: Vec<bool> = x
                    .iter()
                    .map(|v| classify(m.model.score(v.as_slice()).contribution(), threshold))
                    .collect();
                (m.name.clone(), MetricsSnapshot::compute(&member_pred, y))
            })
            .collect();

        Ok(ValidationReport {
            threshold,
            sample_count: x.len(),
            ensemble,
            members,
        })
    }

    // ------------------------------------------------------------------------
    // Weights / metadata
    // ------------------------------------------------------------------------

    /// Replace all weights; keys must match the member names exactly
    pub fn set_weights(&mut self, weights: &BTreeMap<String, f64>) -> Result<(), ScorerError> {
        let current: HashSet<&str> = self.members.iter().map(|m| m.name.as_str()).collect();
        let requested: HashSet<&str> = weights.keys().map(String::as_str).collect();
        if current != requested {
            return Err(ScorerError::InvalidWeights(format!(
                "weight keys {:?} do not match members {:?}",
                sorted(&requested),
                sorted(&current)
            )));
        }
        let pairs: Vec<(&str, f64)> = weights.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        validate_weights(&pairs).map_err(ScorerError::InvalidWeights)?;

        let total: f64 = weights.values().sum();
        if total > 1.0 + 1e-9 {
            warn!("Ensemble weights sum to {:.3}; scores may exceed 1.0", total);
        }

        for m in &mut self.members {
            if let Some(w) = weights.get(&m.name) {
                m.weight = *w;
            }
        }
        Ok(())
    }

    pub fn weights(&self) -> BTreeMap<String, f64> {
        self.members.iter().map(|m| (m.name.clone(), m.weight)).collect()
    }

    pub fn members(&self) -> &[EnsembleMember] {
        &self.members
    }

    pub fn input_width(&self) -> usize {
        self.input_width
    }

    pub fn projection_id(&self) -> &str {
        &self.projection_id
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn class_balance(&self) -> ClassBalance {
        self.class_balance
    }

    pub fn validation(&self) -> Option<&ValidationReport> {
        self.validation.as_ref()
    }
}

/// Sum of weight * contribution, in member order
pub fn weighted_vote(outputs: &[(f64, ScoreOutput)]) -> f64 {
    outputs
        .iter()
        .fold(0.0, |acc, (weight, output)| acc + weight * output.contribution())
}

fn sorted<'a>(set: &HashSet<&'a str>) -> Vec<&'a str> {
    let mut v: Vec<&str> = set.iter().copied().collect();
    v.sort_unstable();
    v
}
