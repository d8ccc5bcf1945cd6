//! Latent Vector - Projector output / scorer input
//!
//! **Fixed-width vector tagged with the fit that produced it**
//!
//! Vectors from different projector fits live in different coordinate
//! systems even when their widths agree. The `projection_id` lets the scorer
//! and the bundle loader refuse to mix them.

use serde::{Deserialize, Serialize};

// ============================================================================
// LATENT VECTOR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentVector {
    /// Id of the projector fit that produced this vector
    pub projection_id: String,
    /// Component values in order V1..VN
    pub values: Vec<f64>,
}

impl LatentVector {
    pub fn new(projection_id: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            projection_id: projection_id.into(),
            values,
        }
    }

    pub fn width(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Get component by index
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Get component by name (`V1`-based)
    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        component_index(name).and_then(|i| self.get(i))
    }

    /// True when produced by the given projector fit
    pub fn is_from(&self, projection_id: &str) -> bool {
        self.projection_id == projection_id
    }

    /// Convert to JSON-serializable format for logging
    pub fn to_log_entry(&self) -> serde_json::Value {
        let named: serde_json::Map<String, serde_json::Value> = component_names(self.width())
            .into_iter()
            .zip(self.values.iter())
            .map(|(name, v)| (name, serde_json::json!(v)))
            .collect();

        serde_json::json!({
            "projection_id": self.projection_id,
            "width": self.width(),
            "components": named,
        })
    }
}

// ============================================================================
// COMPONENT NAMES
// ============================================================================

/// `V1`..`Vn`
pub fn component_names(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("V{}", i)).collect()
}

/// Index for a component name, `V1` -> 0
pub fn component_index(name: &str) -> Option<usize> {
    name.strip_prefix('V')
        .and_then(|rest| rest.parse::<usize>().ok())
        .filter(|i| *i >= 1)
        .map(|i| i - 1)
}
