//! Random forest member - bootstrap-aggregated weighted regression trees
//!
//! Each tree is fitted on a bootstrap sample with balanced class weights
//! and predicts the weighted fraud fraction of its leaf.

use log::debug;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::member::{ImbalanceStrategy, ScoreOutput, Scoreable, TrainingSet};
use super::tree::{GrowthPolicy, RegressionTree, TreeParams};
use super::ScorerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForestVote {
    /// Mean of tree probabilities
    Soft,
    /// Majority of per-tree decisions at 0.5, reported as a hard class
    Majority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Features per split; `None` means floor(sqrt(width))
    pub max_features: Option<usize>,
    pub class_weight: ImbalanceStrategy,
    pub vote: ForestVote,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 16,
            min_samples_leaf: 1,
            max_features: None,
            class_weight: ImbalanceStrategy::Balanced,
            vote: ForestVote::Soft,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    vote: ForestVote,
    input_width: usize,
}

impl RandomForest {
    pub fn fit(data: &TrainingSet<'_>, params: &ForestParams, rng: &mut StdRng) -> Result<Self, ScorerError> {
        if params.n_trees == 0 {
            return Err(ScorerError::Training("forest needs at least one tree".to_string()));
        }

        let n = data.rows.len();
        let width = data.width();
        let weights = params.class_weight.sample_weights(data.labels);
        let grad: Vec<f64> = data
            .labels
            .iter()
            .zip(&weights)
            .map(|(&y, w)| if y { -w } else { 0.0 })
            .collect();

        let tree_params = TreeParams {
            growth: GrowthPolicy::DepthWise,
            max_depth: params.max_depth,
            max_leaves: usize::MAX,
            min_samples_leaf: params.min_samples_leaf,
            min_child_weight: 0.0,
            lambda: 0.0,
            max_features: Some(
                params
                    .max_features
                    .unwrap_or_else(|| ((width as f64).sqrt().floor() as usize).max(1)),
            ),
        };

        let mut trees = Vec::with_capacity(params.n_trees);
        for _ in 0..params.n_trees {
            let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            trees.push(RegressionTree::fit(&data.rows, &grad, &weights, bootstrap, &tree_params, rng));
        }

        debug!(
            "Forest trained: {} trees, mean leaves {:.1}",
            trees.len(),
            trees.iter().map(|t| t.leaf_count()).sum::<usize>() as f64 / trees.len() as f64
        );

        Ok(Self {
            trees,
            vote: params.vote,
            input_width: width,
        })
    }

    pub fn input_width(&self) -> usize {
        self.input_width
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn probability(&self, x: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict(x)).sum::<f64>() / self.trees.len() as f64
    }
}

impl Scoreable for RandomForest {
    fn score(&self, x: &[f64]) -> ScoreOutput {
        match self.vote {
            ForestVote::Soft => ScoreOutput::Probability(self.probability(x)),
            ForestVote::Majority => {
                let votes = self.trees.iter().filter(|t| t.predict(x) > 0.5).count();
                ScoreOutput::HardClass(votes * 2 > self.trees.len())
            }
        }
    }
}
