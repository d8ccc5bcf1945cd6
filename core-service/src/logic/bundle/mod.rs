//! Bundle Module - Model Bundle Store and serving registry
//!
//! A bundle is schema + fitted projector + trained ensemble, persisted as
//! one checksummed file and published behind an `Arc` swap.

pub mod types;
pub mod validate;
pub mod store;
pub mod registry;

#[cfg(test)]
mod tests;

// Re-export common types
pub use types::{ModelBundle, BUNDLE_FORMAT_VERSION};
pub use validate::{validate_bundle, BundleError};
pub use store::{BundleHandle, BundleStore};
pub use registry::{ModelRegistry, ServingStatus};
