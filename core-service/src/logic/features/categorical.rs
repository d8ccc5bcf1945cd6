//! Categorical pipeline - constant imputation followed by one-hot encoding
//!
//! Each observed category owns one indicator column. Unseen categories at
//! transform time encode to an all-zero slice instead of failing.

use serde::{Deserialize, Serialize};

/// Fitted vocabulary for one categorical feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoding {
    /// Sorted, unique category labels
    categories: Vec<String>,
}

impl CategoryEncoding {
    pub fn fit<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut categories: Vec<String> = values.into_iter().map(str::to_string).collect();
        categories.sort();
        categories.dedup();
        Self { categories }
    }

    pub fn width(&self) -> usize {
        self.categories.len()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Indicator position for a label, `None` when unseen
    pub fn position(&self, label: &str) -> Option<usize> {
        self.categories.binary_search_by(|c| c.as_str().cmp(label)).ok()
    }

    /// Write the indicator slice for `label` into `out` (length == width)
    pub fn encode_into(&self, label: &str, out: &mut [f64]) {
        out.iter_mut().for_each(|v| *v = 0.0);
        if let Some(pos) = self.position(label) {
            out[pos] = 1.0;
        }
    }

    /// Encoded column names, `feature_category`
    pub fn column_names(&self, feature: &str) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", feature, c))
            .collect()
    }
}
