//! Numeric pipeline - median imputation followed by robust scaling
//!
//! Transaction amounts are heavy-tailed, so scaling uses median / IQR
//! rather than mean / std. Quantiles use linear interpolation.

use serde::{Deserialize, Serialize};

/// Fitted statistics for one numeric feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    /// Imputation value (median of observed values)
    pub fill: f64,
    /// Centre used for scaling (median of the imputed column)
    pub center: f64,
    /// Interquartile range of the imputed column (1.0 when degenerate)
    pub scale: f64,
    /// Number of observed (non-missing) values at fit time
    pub observed: usize,
}

impl NumericStats {
    /// Fit from a column where `None` marks a missing value
    pub fn fit(column: &[Option<f64>]) -> Self {
        let mut observed: Vec<f64> = column.iter().flatten().copied().collect();
        let observed_count = observed.len();

        let fill = if observed.is_empty() {
            0.0
        } else {
            sort_floats(&mut observed);
            quantile_sorted(&observed, 0.5)
        };

        let mut imputed: Vec<f64> = column.iter().map(|v| v.unwrap_or(fill)).collect();
        sort_floats(&mut imputed);

        let center = quantile_sorted(&imputed, 0.5);
        let iqr = quantile_sorted(&imputed, 0.75) - quantile_sorted(&imputed, 0.25);
        let scale = if iqr.abs() < f64::EPSILON * 10.0 { 1.0 } else { iqr };

        Self {
            fill,
            center,
            scale,
            observed: observed_count,
        }
    }

    /// Impute then scale one value
    pub fn apply(&self, value: Option<f64>) -> f64 {
        (value.unwrap_or(self.fill) - self.center) / self.scale
    }
}

/// Sort ascending (values are finite by construction)
pub fn sort_floats(values: &mut [f64]) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
}

/// Quantile with linear interpolation between closest ranks
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
