//! Classification metrics over paired predictions and labels
//!
//! Zero-division resolves to 0.0 rather than an error.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
    pub sample_count: usize,
}

impl MetricsSnapshot {
    /// No labelled samples yet
    pub fn empty() -> Self {
        Self {
            precision: None,
            recall: None,
            f1: None,
            sample_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    /// Pair `predicted[i]` with `actual[i]`; extra entries on either side are ignored
    pub fn compute(predicted: &[bool], actual: &[bool]) -> Self {
        let n = predicted.len().min(actual.len());
        if n == 0 {
            return Self::empty();
        }

        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        for (&p, &a) in predicted.iter().zip(actual) {
            match (p, a) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
                (false, false) => {}
            }
        }

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            precision: Some(precision),
            recall: Some(recall),
            f1: Some(f1),
            sample_count: n,
        }
    }

    /// Named metrics present in this snapshot, in fixed order
    pub fn named(&self) -> Vec<(&'static str, f64)> {
        [("precision", self.precision), ("recall", self.recall), ("f1", self.f1)]
            .into_iter()
            .filter_map(|(name, v)| v.map(|v| (name, v)))
            .collect()
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        match metric {
            "precision" => self.precision,
            "recall" => self.recall,
            "f1" => self.f1,
            _ => None,
        }
    }
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
