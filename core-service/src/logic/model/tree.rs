//! Second-order regression tree shared by the forest and boosting members
//!
//! Every sample carries a gradient `g` and hessian `h`. A leaf predicts
//! `-G / (H + lambda)` and a split scores
//! `GL^2/(HL+lambda) + GR^2/(HR+lambda) - G^2/(H+lambda)`.
//! With `g = -w*y`, `h = w`, `lambda = 0` this is a weighted-mean
//! regression tree, which is what the forest uses.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Gains at or below this are treated as no improvement
const MIN_SPLIT_GAIN: f64 = 1e-12;

// ============================================================================
// PARAMETERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthPolicy {
    /// Split level by level up to `max_depth`
    DepthWise,
    /// Always split the leaf with the largest gain, up to `max_leaves`
    BestFirst,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub growth: GrowthPolicy,
    pub max_depth: usize,
    pub max_leaves: usize,
    pub min_samples_leaf: usize,
    pub min_child_weight: f64,
    pub lambda: f64,
    /// Features considered per split (`None` = all)
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            growth: GrowthPolicy::DepthWise,
            max_depth: 6,
            max_leaves: usize::MAX,
            min_samples_leaf: 1,
            min_child_weight: 0.0,
            lambda: 1.0,
            max_features: None,
        }
    }
}

// ============================================================================
// TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split { feature, threshold, left, right }) => {
                    let v = x.get(*feature).copied().unwrap_or(0.0);
                    idx = if v <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(Node::Split { left, right, .. }) => 1 + walk(nodes, *left).max(walk(nodes, *right)),
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }

    /// Grow a tree over `samples` (indices into `rows`, repeats allowed)
    pub fn fit(
        rows: &[&[f64]],
        grad: &[f64],
        hess: &[f64],
        samples: Vec<usize>,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        let builder = Builder { rows, grad, hess, params, width };

        let mut nodes = vec![Node::Leaf { value: builder.leaf_value(&samples) }];
        let mut pending = VecDeque::new();
        pending.push_back(Pending {
            node: 0,
            depth: 0,
            split: builder.best_split(&samples, 0, rng),
            samples,
        });
        let mut leaves = 1;

        while leaves < params.max_leaves {
            let next = match params.growth {
                GrowthPolicy::DepthWise => pending.pop_front(),
                GrowthPolicy::BestFirst => take_best(&mut pending),
            };
            let Some(item) = next else { break };
            let Some(split) = item.split else { continue };

            let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = item
                .samples
                .iter()
                .partition(|&&i| rows[i][split.feature] <= split.threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf { value: builder.leaf_value(&left_samples) });
            nodes.push(Node::Leaf { value: builder.leaf_value(&right_samples) });
            nodes[item.node] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            leaves += 1;

            let depth = item.depth + 1;
            for (node, child) in [(left, left_samples), (right, right_samples)] {
                pending.push_back(Pending {
                    node,
                    depth,
                    split: builder.best_split(&child, depth, rng),
                    samples: child,
                });
            }
        }

        Self { nodes }
    }
}

// ============================================================================
// BUILDER
// ============================================================================

struct Pending {
    node: usize,
    depth: usize,
    samples: Vec<usize>,
    split: Option<Split>,
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

fn take_best(pending: &mut VecDeque<Pending>) -> Option<Pending> {
    let best = pending
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.split.map(|s| (i, s.gain)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)?;
    pending.remove(best)
}

struct Builder<'a> {
    rows: &'a [&'a [f64]],
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a TreeParams,
    width: usize,
}

impl Builder<'_> {
    fn leaf_value(&self, samples: &[usize]) -> f64 {
        let g: f64 = samples.iter().map(|&i| self.grad[i]).sum();
        let h: f64 = samples.iter().map(|&i| self.hess[i]).sum();
        let denom = h + self.params.lambda;
        if denom <= 0.0 {
            0.0
        } else {
            -g / denom
        }
    }

    fn candidate_features(&self, rng: &mut StdRng) -> Vec<usize> {
        match self.params.max_features {
            Some(k) if k < self.width => {
                let mut picked = rand::seq::index::sample(rng, self.width, k.max(1)).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..self.width).collect(),
        }
    }

    fn best_split(&self, samples: &[usize], depth: usize, rng: &mut StdRng) -> Option<Split> {
        let params = self.params;
        if params.growth == GrowthPolicy::DepthWise && depth >= params.max_depth {
            return None;
        }
        if samples.len() < 2 * params.min_samples_leaf.max(1) {
            return None;
        }

        let lambda = params.lambda;
        let g_total: f64 = samples.iter().map(|&i| self.grad[i]).sum();
        let h_total: f64 = samples.iter().map(|&i| self.hess[i]).sum();
        let parent = score(g_total, h_total, lambda);

        let mut best: Option<Split> = None;
        let mut order = samples.to_vec();

        for feature in self.candidate_features(rng) {
            order.sort_by(|&a, &b| {
                self.rows[a][feature]
                    .partial_cmp(&self.rows[b][feature])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut gl = 0.0;
            let mut hl = 0.0;
            for pos in 0..order.len() - 1 {
                let i = order[pos];
                gl += self.grad[i];
                hl += self.hess[i];

                let here = self.rows[i][feature];
                let next = self.rows[order[pos + 1]][feature];
                if here >= next {
                    continue;
                }

                let n_left = pos + 1;
                let n_right = order.len() - n_left;
                if n_left < params.min_samples_leaf || n_right < params.min_samples_leaf {
                    continue;
                }
                let gr = g_total - gl;
                let hr = h_total - hl;
                if hl < params.min_child_weight || hr < params.min_child_weight {
                    continue;
                }

                let gain = score(gl, hl, lambda) + score(gr, hr, lambda) - parent;
                if gain > MIN_SPLIT_GAIN && best.map_or(true, |b| gain > b.gain) {
                    best = Some(Split {
                        feature,
                        threshold: midpoint(here, next),
                        gain,
                    });
                }
            }
        }
        best
    }
}

fn score(g: f64, h: f64, lambda: f64) -> f64 {
    let denom = h + lambda;
    if denom <= 0.0 {
        0.0
    } else {
        g * g / denom
    }
}

/// Midpoint that still sends `lo` left and `hi` right
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid >= hi {
        lo
    } else {
        mid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn squared_error_targets(ys: &[f64]) -> (Vec<f64>, Vec<f64>) {
        (ys.iter().map(|y| -y).collect(), vec![1.0; ys.len()])
    }

    #[test]
    fn test_single_split_recovers_step() {
        let xs: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let rows: Vec<&[f64]> = xs.iter().map(Vec::as_slice).collect();
        let ys: Vec<f64> = (0..10).map(|i| if i < 5 { 0.0 } else { 1.0 }).collect();
        let (g, h) = squared_error_targets(&ys);

        let params = TreeParams { max_depth: 1, lambda: 0.0, ..Default::default() };
        let mut rng = StdRng::seed_from_u64(1);
        let tree = RegressionTree::fit(&rows, &g, &h, (0..10).collect(), &params, &mut rng);

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict(&[2.0]), 0.0);
        // boundary value goes left
        assert_eq!(tree.predict(&[4.5]), 0.0);
        assert_eq!(tree.predict(&[4.6]), 1.0);
        assert_eq!(tree.predict(&[9.0]), 1.0);
    }

    #[test]
    fn test_pure_node_is_not_split() {
        let xs: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64]).collect();
        let rows: Vec<&[f64]> = xs.iter().map(Vec::as_slice).collect();
        let (g, h) = squared_error_targets(&[1.0; 6]);

        let params = TreeParams { lambda: 0.0, ..Default::default() };
        let mut rng = StdRng::seed_from_u64(1);
        let tree = RegressionTree::fit(&rows, &g, &h, (0..6).collect(), &params, &mut rng);
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.predict(&[3.0]), 1.0);
    }

    #[test]
    fn test_best_first_respects_leaf_budget() {
        let xs: Vec<Vec<f64>> = (0..64).map(|i| vec![i as f64, (i % 7) as f64]).collect();
        let rows: Vec<&[f64]> = xs.iter().map(Vec::as_slice).collect();
        let ys: Vec<f64> = (0..64).map(|i| ((i * 37) % 11) as f64).collect();
        let (g, h) = squared_error_targets(&ys);

        let params = TreeParams {
            growth: GrowthPolicy::BestFirst,
            max_leaves: 5,
            lambda: 0.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let tree = RegressionTree::fit(&rows, &g, &h, (0..64).collect(), &params, &mut rng);
        assert_eq!(tree.leaf_count(), 5);
    }

    #[test]
    fn test_midpoint_guard() {
        assert_eq!(midpoint(1.0, 3.0), 2.0);
        let lo: f64 = 1.0;
        let hi = f64::from_bits(lo.to_bits() + 1);
        assert_eq!(midpoint(lo, hi), lo);
    }
}
