//! Logic Module - Scoring Engines
//!
//! - `features/` - Feature Projector (raw transaction -> latent vector)
//! - `model/` - Ensemble Scorer (latent vector -> fraud score)
//! - `bundle/` - Persistence + active bundle registry
//! - `monitor/` - Sliding-window performance and drift monitor

pub mod config;
pub mod error;

pub mod features;
pub mod model;
pub mod bundle;
pub mod monitor;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod testutil;
