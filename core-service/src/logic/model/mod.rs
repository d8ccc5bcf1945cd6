//! Model Module - Ensemble Scorer
//!
//! Independent sub-models combined by a fixed weighted vote.
//! Members are swappable behind the `Scoreable` capability.

pub mod threshold;
pub mod record;
pub mod tree;
pub mod forest;
pub mod boosting;
pub mod mlp;
pub mod member;
pub mod ensemble;


// Re-export common types
pub use threshold::{classify, ThresholdConfig};
pub use record::PredictionRecord;
pub use member::{ClassBalance, FamilyConfig, ImbalanceStrategy, MemberSpec, ScoreOutput, Scoreable, SubModel};
pub use ensemble::{EnsembleConfig, EnsembleMember, EnsembleModel, MemberScore, ValidationReport};

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ScorerError {
    /// Scoring requested from an ensemble with no trained members
    NotFitted,
    /// Latent vector width differs from the trained width
    DimensionMismatch { expected: usize, actual: usize },
    /// Latent vector produced by a different projector fit
    ProjectionMismatch { expected: String, actual: String },
    /// Training input or configuration unusable
    Training(String),
    /// Weight update rejected
    InvalidWeights(String),
}

impl std::fmt::Display for ScorerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScorerError::NotFitted => write!(f, "Ensemble is not trained"),
            ScorerError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected width {}, got {}", expected, actual)
            }
            ScorerError::ProjectionMismatch { expected, actual } => write!(
                f,
                "Projection mismatch: ensemble trained on {}, vector from {}",
                expected, actual
            ),
            ScorerError::Training(msg) => write!(f, "Training error: {}", msg),
            ScorerError::InvalidWeights(msg) => write!(f, "Invalid weights: {}", msg),
        }
    }
}

impl std::error::Error for ScorerError {}
