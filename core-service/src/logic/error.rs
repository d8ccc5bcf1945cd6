//! Crate-level error, wrapping each component's own error type

use super::bundle::BundleError;
use super::features::ProjectorError;
use super::model::ScorerError;
use super::monitor::MonitorError;

#[derive(Debug)]
pub enum FraudError {
    Projector(ProjectorError),
    Scorer(ScorerError),
    Bundle(BundleError),
    Monitor(MonitorError),
    /// No bundle has been published yet
    NotReady,
    Config(String),
}

impl FraudError {
    /// Errors caused by the serving side rather than by the request
    pub fn is_serving_fault(&self) -> bool {
        match self {
            FraudError::NotReady | FraudError::Bundle(_) | FraudError::Config(_) => true,
            FraudError::Projector(ProjectorError::NotFitted) => true,
            FraudError::Scorer(ScorerError::NotFitted) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for FraudError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FraudError::Projector(e) => write!(f, "Projector: {}", e),
            FraudError::Scorer(e) => write!(f, "Scorer: {}", e),
            FraudError::Bundle(e) => write!(f, "Bundle: {}", e),
            FraudError::Monitor(e) => write!(f, "Monitor: {}", e),
            FraudError::NotReady => write!(f, "No model bundle is loaded"),
            FraudError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for FraudError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FraudError::Projector(e) => Some(e),
            FraudError::Scorer(e) => Some(e),
            FraudError::Bundle(e) => Some(e),
            FraudError::Monitor(e) => Some(e),
            FraudError::NotReady | FraudError::Config(_) => None,
        }
    }
}

impl From<ProjectorError> for FraudError {
    fn from(err: ProjectorError) -> Self {
        FraudError::Projector(err)
    }
}

impl From<ScorerError> for FraudError {
    fn from(err: ScorerError) -> Self {
        FraudError::Scorer(err)
    }
}

impl From<BundleError> for FraudError {
    fn from(err: BundleError) -> Self {
        FraudError::Bundle(err)
    }
}

impl From<MonitorError> for FraudError {
    fn from(err: MonitorError) -> Self {
        FraudError::Monitor(err)
    }
}
