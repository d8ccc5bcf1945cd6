//! Features Module - Feature Projector
//!
//! Turns heterogeneous raw transactions into fixed-width latent vectors.
//! Numeric and categorical pipelines live in their own files so the
//! projector only orchestrates them.

pub mod raw;
pub mod schema;
pub mod numeric;
pub mod categorical;
pub mod pca;
pub mod latent;
pub mod projector;

#[cfg(test)]
mod tests;

// Re-export common types
pub use raw::{LabeledTransaction, RawTransaction, RawValue};
pub use schema::{FeatureKind, FeatureSchema, FeatureSpec, SchemaInfo};
pub use latent::LatentVector;
pub use projector::{ComponentLoadings, EncodedColumn, FeatureProjector, ProjectorConfig, ProjectorError};
