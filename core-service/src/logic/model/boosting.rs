//! Gradient-boosted trees on the logistic loss
//!
//! Two presets share this implementation: depth-wise growth with
//! `scale_pos_weight` (`xgb`) and best-first growth with balanced class
//! weights (`lgb`). Raw score starts at the weighted prior log-odds.

use log::{debug, info};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::member::{ImbalanceStrategy, ScoreOutput, Scoreable, TrainingSet};
use super::tree::{GrowthPolicy, RegressionTree, TreeParams};
use super::ScorerError;

/// Probability clamp for log-odds and log-loss
const PROB_EPS: f64 = 1e-7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_rounds: usize,
    pub learning_rate: f64,
    pub tree: TreeParams,
    pub class_weight: ImbalanceStrategy,
    /// Stop after this many rounds without validation log-loss improvement
    pub early_stopping_rounds: Option<usize>,
}

impl BoostingParams {
    /// Depth-wise preset (max depth 5, lambda 1, positives weighted neg/pos)
    pub fn depth_wise() -> Self {
        Self {
            n_rounds: 100,
            learning_rate: 0.1,
            tree: TreeParams {
                growth: GrowthPolicy::DepthWise,
                max_depth: 5,
                max_leaves: usize::MAX,
                min_samples_leaf: 1,
                min_child_weight: 1.0,
                lambda: 1.0,
                max_features: None,
            },
            class_weight: ImbalanceStrategy::ScalePosWeight,
            early_stopping_rounds: None,
        }
    }

    /// Leaf-wise preset (31 leaves, balanced class weights)
    pub fn leaf_wise() -> Self {
        Self {
            n_rounds: 100,
            learning_rate: 0.1,
            tree: TreeParams {
                growth: GrowthPolicy::BestFirst,
                max_depth: usize::MAX,
                max_leaves: 31,
                min_samples_leaf: 20,
                min_child_weight: 1e-3,
                lambda: 0.0,
                max_features: None,
            },
            class_weight: ImbalanceStrategy::Balanced,
            early_stopping_rounds: None,
        }
    }

    fn validate(&self) -> Result<(), ScorerError> {
        if self.n_rounds == 0 {
            return Err(ScorerError::Training("boosting needs at least one round".to_string()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ScorerError::Training(format!(
                "invalid learning rate {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self::depth_wise()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
    input_width: usize,
}

impl GradientBoosting {
    pub fn fit(data: &TrainingSet<'_>, params: &BoostingParams, rng: &mut StdRng) -> Result<Self, ScorerError> {
        params.validate()?;

        let n = data.rows.len();
        let weights = params.class_weight.sample_weights(data.labels);
        let targets: Vec<f64> = data.labels.iter().map(|&y| if y { 1.0 } else { 0.0 }).collect();

        let weight_sum: f64 = weights.iter().sum();
        let prior = if weight_sum > 0.0 {
            weights.iter().zip(&targets).map(|(w, y)| w * y).sum::<f64>() / weight_sum
        } else {
            0.5
        };
        let base_score = logit(prior);

        let mut model = Self {
            base_score,
            learning_rate: params.learning_rate,
            trees: Vec::with_capacity(params.n_rounds),
            input_width: data.width(),
        };

        let mut raw = vec![base_score; n];
        let mut val_raw = vec![base_score; data.val_rows.len()];
        let early_stopping = params.early_stopping_rounds.filter(|_| data.has_validation());
        let mut best_loss = f64::INFINITY;
        let mut best_rounds = 0;

        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];

        for round in 0..params.n_rounds {
            for i in 0..n {
                let p = sigmoid(raw[i]);
                grad[i] = weights[i] * (p - targets[i]);
                hess[i] = (weights[i] * p * (1.0 - p)).max(1e-16);
            }

            let tree = RegressionTree::fit(&data.rows, &grad, &hess, (0..n).collect(), &params.tree, rng);
            for (r, row) in raw.iter_mut().zip(&data.rows) {
                *r += model.learning_rate * tree.predict(row);
            }
            for (r, row) in val_raw.iter_mut().zip(&data.val_rows) {
                *r += model.learning_rate * tree.predict(row);
            }
            model.trees.push(tree);

            if let Some(patience) = early_stopping {
                let loss = log_loss(&val_raw, data.val_labels);
                debug!("Boosting round {}: val logloss {:.5}", round + 1, loss);
                if loss < best_loss {
                    best_loss = loss;
                    best_rounds = model.trees.len();
                } else if model.trees.len() - best_rounds >= patience {
                    info!(
                        "Early stopping at round {} (best {} rounds, logloss {:.5})",
                        round + 1,
                        best_rounds,
                        best_loss
                    );
                    model.trees.truncate(best_rounds);
                    break;
                }
            }
        }

        Ok(model)
    }

    pub fn input_width(&self) -> usize {
        self.input_width
    }

    pub fn n_rounds(&self) -> usize {
        self.trees.len()
    }

    /// Log-odds before the sigmoid
    pub fn raw_score(&self, x: &[f64]) -> f64 {
        self.base_score
            + self.learning_rate * self.trees.iter().map(|t| t.predict(x)).sum::<f64>()
    }

    pub fn probability(&self, x: &[f64]) -> f64 {
        sigmoid(self.raw_score(x))
    }
}

impl Scoreable for GradientBoosting {
    fn score(&self, x: &[f64]) -> ScoreOutput {
        ScoreOutput::Probability(self.probability(x))
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn logit(p: f64) -> f64 {
    let p = p.clamp(PROB_EPS, 1.0 - PROB_EPS);
    (p / (1.0 - p)).ln()
}

fn log_loss(raw: &[f64], labels: &[bool]) -> f64 {
    if raw.is_empty() {
        return 0.0;
    }
    let total: f64 = raw
        .iter()
        .zip(labels)
        .map(|(&r, &y)| {
            let p = sigmoid(r).clamp(PROB_EPS, 1.0 - PROB_EPS);
            if y {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / raw.len() as f64
}
