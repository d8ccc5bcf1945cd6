//! Feed-forward neural classifier
//!
//! Dense ReLU hidden layers, sigmoid output, binary cross-entropy with a
//! small L2 penalty, Adam updates over shuffled mini-batches.

use log::{debug, info};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::boosting::sigmoid;
use super::member::{ScoreOutput, Scoreable, TrainingSet};
use super::ScorerError;

const PROB_EPS: f64 = 1e-7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpParams {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub epochs: usize,
    /// L2 penalty
    pub alpha: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    /// Stop when validation loss has not improved for this many epochs
    pub early_stopping_patience: Option<usize>,
}

impl Default for MlpParams {
    fn default() -> Self {
        Self {
            hidden_layers: vec![128, 64],
            learning_rate: 0.001,
            batch_size: 256,
            epochs: 50,
            alpha: 1e-4,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            early_stopping_patience: None,
        }
    }
}

impl MlpParams {
    fn validate(&self) -> Result<(), ScorerError> {
        if self.hidden_layers.iter().any(|&h| h == 0) {
            return Err(ScorerError::Training("hidden layer of width 0".to_string()));
        }
        if self.batch_size == 0 || self.epochs == 0 {
            return Err(ScorerError::Training("batch size and epochs must be positive".to_string()));
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

// ============================================================================
// NETWORK
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Dense {
    /// inputs x outputs
    weights: Array2<f64>,
    bias: Array1<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralNet {
    layers: Vec<Dense>,
}

/// Adam moments for one layer
struct Moments {
    mw: Array2<f64>,
    vw: Array2<f64>,
    mb: Array1<f64>,
    vb: Array1<f64>,
}

impl NeuralNet {
    pub fn fit(data: &TrainingSet<'_>, params: &MlpParams, rng: &mut StdRng) -> Result<Self, ScorerError> {
        params.validate()?;

        let width = data.width();
        let x = to_matrix(&data.rows, width);
        let y = to_targets(data.labels);
        let val = if data.has_validation() {
            Some((to_matrix(&data.val_rows, width), to_targets(data.val_labels)))
        } else {
            None
        };

        let mut net = Self::init(width, &params.hidden_layers, rng);
        let mut moments: Vec<Moments> = net
            .layers
            .iter()
            .map(|l| Moments {
                mw: Array2::zeros(l.weights.raw_dim()),
                vw: Array2::zeros(l.weights.raw_dim()),
                mb: Array1::zeros(l.bias.raw_dim()),
                vb: Array1::zeros(l.bias.raw_dim()),
            })
            .collect();

        let n = x.nrows();
        let mut order: Vec<usize> = (0..n).collect();
        let mut step = 0i32;
        let mut best: Option<(f64, NeuralNet)> = None;
        let mut stale = 0;

        for epoch in 0..params.epochs {
            order.shuffle(rng);
            let mut epoch_loss = 0.0;

            for batch in order.chunks(params.batch_size) {
                let xb = x.select(Axis(0), batch);
                let yb = y.select(Axis(0), batch);
                step += 1;
                epoch_loss += net.train_step(&xb, &yb, params, &mut moments, step) * batch.len() as f64;
            }
            epoch_loss /= n as f64;

            let Some((vx, vy)) = &val else {
                debug!("MLP epoch {}: loss {:.5}", epoch + 1, epoch_loss);
                continue;
            };
            let val_loss = bce(&net.forward(vx), vy);
            debug!("MLP epoch {}: loss {:.5}, val loss {:.5}", epoch + 1, epoch_loss, val_loss);

            let Some(patience) = params.early_stopping_patience else {
                continue;
            };
            if best.as_ref().map_or(true, |(b, _)| val_loss < *b) {
                best = Some((val_loss, net.clone()));
                stale = 0;
            } else {
                stale += 1;
                if stale >= patience {
                    info!("MLP early stopping at epoch {}", epoch + 1);
                    break;
                }
            }
        }

        Ok(match best {
            Some((_, restored)) => restored,
            None => net,
        })
    }

    fn init(input: usize, hidden: &[usize], rng: &mut StdRng) -> Self {
        let mut sizes = Vec::with_capacity(hidden.len() + 2);
        sizes.push(input);
        sizes.extend_from_slice(hidden);
        sizes.push(1);

        let layers = sizes
            .windows(2)
            .map(|w| {
                let (fan_in, fan_out) = (w[0], w[1]);
                let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
                Dense {
                    weights: Array2::from_shape_simple_fn((fan_in, fan_out), || rng.gen_range(-limit..=limit)),
                    bias: Array1::zeros(fan_out),
                }
            })
            .collect();
        Self { layers }
    }

    pub fn input_width(&self) -> usize {
        self.layers.first().map(|l| l.weights.nrows()).unwrap_or(0)
    }

    /// Batch forward pass, returns output probabilities
    fn forward(&self, x: &Array2<f64>) -> Array1<f64> {
        let mut a = x.clone();
        let last = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter().enumerate() {
            let z = a.dot(&layer.weights) + &layer.bias;
            a = if i == last { z.mapv(sigmoid) } else { z.mapv(relu) };
        }
        a.column(0).to_owned()
    }

    /// One Adam step on a mini-batch, returns the batch loss
    fn train_step(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        params: &MlpParams,
        moments: &mut [Moments],
        step: i32,
    ) -> f64 {
        let batch = x.nrows() as f64;
        let last = self.layers.len() - 1;

        // forward, keeping activations
        let mut activations = vec![x.clone()];
        for (i, layer) in self.layers.iter().enumerate() {
            let z = activations[i].dot(&layer.weights) + &layer.bias;
            activations.push(if i == last { z.mapv(sigmoid) } else { z.mapv(relu) });
        }

        let probs = activations[last + 1].column(0).to_owned();
        let loss = bce(&probs, y);

        // sigmoid + BCE gradient
        let mut delta = (&probs - y).insert_axis(Axis(1)) / batch;

        let bias1 = 1.0 - params.beta1.powi(step);
        let bias2 = 1.0 - params.beta2.powi(step);
        let lr_t = params.learning_rate * bias2.sqrt() / bias1;

        for i in (0..self.layers.len()).rev() {
            let a_prev = &activations[i];
            let grad_w = a_prev.t().dot(&delta) + &(&self.layers[i].weights * (params.alpha / batch));
            let grad_b = delta.sum_axis(Axis(0));

            if i > 0 {
                let back = delta.dot(&self.layers[i].weights.t());
                delta = back * activations[i].mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
            }

            let m = &mut moments[i];
            m.mw = &m.mw * params.beta1 + &grad_w * (1.0 - params.beta1);
            m.vw = &m.vw * params.beta2 + &grad_w.mapv(|g| g * g) * (1.0 - params.beta2);
            m.mb = &m.mb * params.beta1 + &grad_b * (1.0 - params.beta1);
            m.vb = &m.vb * params.beta2 + &grad_b.mapv(|g| g * g) * (1.0 - params.beta2);

            let layer = &mut self.layers[i];
            layer.weights -= &(&m.mw / &m.vw.mapv(|v| v.sqrt() + params.epsilon) * lr_t);
            layer.bias -= &(&m.mb / &m.vb.mapv(|v| v.sqrt() + params.epsilon) * lr_t);
        }

        loss
    }

    pub fn probability(&self, x: &[f64]) -> f64 {
        let mut a = Array1::from_vec(x.to_vec());
        let last = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter().enumerate() {
            let z = a.dot(&layer.weights) + &layer.bias;
            a = if i == last { z.mapv(sigmoid) } else { z.mapv(relu) };
        }
        a.get(0).copied().unwrap_or(0.0)
    }
}

impl Scoreable for NeuralNet {
    fn score(&self, x: &[f64]) -> ScoreOutput {
        ScoreOutput::Probability(self.probability(x))
    }
}

fn relu(v: f64) -> f64 {
    v.max(0.0)
}

fn bce(probs: &Array1<f64>, targets: &Array1<f64>) -> f64 {
    if probs.is_empty() {
        return 0.0;
    }
    let total: f64 = probs
        .iter()
        .zip(targets.iter())
        .map(|(&p, &y)| {
            let p = p.clamp(PROB_EPS, 1.0 - PROB_EPS);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    total / probs.len() as f64
}

fn to_matrix(rows: &[&[f64]], width: usize) -> Array2<f64> {
    let mut m = Array2::zeros((rows.len(), width));
    for (i, row) in rows.iter().enumerate() {
        for (j, v) in row.iter().take(width).enumerate() {
            m[[i, j]] = *v;
        }
    }
    m
}

fn to_targets(labels: &[bool]) -> Array1<f64> {
    labels.iter().map(|&y| if y { 1.0 } else { 0.0 }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::testutil;
    use rand::SeedableRng;

    fn small_params() -> MlpParams {
        MlpParams {
            hidden_layers: vec![8],
            learning_rate: 0.01,
            batch_size: 16,
            epochs: 40,
            ..Default::default()
        }
    }

    fn data(seed: u64) -> (Vec<Vec<f64>>, Vec<bool>) {
        let (xs, ys) = testutil::latent_dataset(120, 3, seed, "fit");
        (xs.into_iter().map(|v| v.values).collect(), ys)
    }

    #[test]
    fn test_learns_separable_data() {
        let (xs, ys) = data(1);
        let set = TrainingSet {
            rows: xs.iter().map(Vec::as_slice).collect(),
            labels: &ys,
            val_rows: Vec::new(),
            val_labels: &[],
        };
        let net = NeuralNet::fit(&set, &small_params(), &mut StdRng::seed_from_u64(4)).unwrap();

        assert_eq!(net.input_width(), 3);
        assert!(net.probability(&[2.0, 2.0, 2.0]) > 0.8);
        assert!(net.probability(&[-2.0, -2.0, -2.0]) < 0.2);
    }

    #[test]
    fn test_batch_and_single_forward_agree() {
        let (xs, ys) = data(2);
        let set = TrainingSet {
            rows: xs.iter().map(Vec::as_slice).collect(),
            labels: &ys,
            val_rows: Vec::new(),
            val_labels: &[],
        };
        let params = MlpParams { epochs: 2, ..small_params() };
        let net = NeuralNet::fit(&set, &params, &mut StdRng::seed_from_u64(4)).unwrap();

        let batch = net.forward(&to_matrix(&set.rows[..5], 3));
        for (i, row) in set.rows[..5].iter().enumerate() {
            assert!((batch[i] - net.probability(row)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_early_stopping_with_validation() {
        let (xs, ys) = data(3);
        let (vx, vy) = data(4);
        let set = TrainingSet {
            rows: xs.iter().map(Vec::as_slice).collect(),
            labels: &ys,
            val_rows: vx.iter().map(Vec::as_slice).collect(),
            val_labels: &vy,
        };
        let params = MlpParams { early_stopping_patience: Some(2), ..small_params() };
        let net = NeuralNet::fit(&set, &params, &mut StdRng::seed_from_u64(4)).unwrap();
        assert!(net.probability(&[2.0, 2.0, 2.0]) > 0.5);
    }

    #[test]
    fn test_rejects_zero_width_layer() {
        let (xs, ys) = data(1);
        let set = TrainingSet {
            rows: xs.iter().map(Vec::as_slice).collect(),
            labels: &ys,
            val_rows: Vec::new(),
            val_labels: &[],
        };
        let params = MlpParams { hidden_layers: vec![0], ..small_params() };
        assert!(NeuralNet::fit(&set, &params, &mut StdRng::seed_from_u64(1)).is_err());
    }
}
