use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::error::FraudError;
use crate::logic::features::{FeatureProjector, FeatureSchema, RawTransaction};
use crate::logic::model::{EnsembleModel, PredictionRecord};
use crate::logic::monitor::MetricsSnapshot;

use super::validate::{validate_bundle, BundleError};

/// Bump when the serialized layout of `ModelBundle` changes
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Everything needed to score a raw transaction. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    id: String,
    format_version: u32,
    created_at: DateTime<Utc>,
    schema: FeatureSchema,
    projector: FeatureProjector,
    ensemble: EnsembleModel,
}

impl ModelBundle {
    pub fn new(schema: FeatureSchema, projector: FeatureProjector, ensemble: EnsembleModel) -> Result<Self, BundleError> {
        let bundle = Self {
            id: uuid::Uuid::new_v4().to_string(),
            format_version: BUNDLE_FORMAT_VERSION,
            created_at: Utc::now(),
            schema,
            projector,
            ensemble,
        };
        validate_bundle(&bundle)?;
        Ok(bundle)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn projector(&self) -> &FeatureProjector {
        &self.projector
    }

    pub fn ensemble(&self) -> &EnsembleModel {
        &self.ensemble
    }

    pub fn latent_width(&self) -> usize {
        self.ensemble.input_width()
    }

    /// Validation metrics recorded at training time, usable as drift reference
    pub fn reference_metrics(&self) -> Option<MetricsSnapshot> {
        self.ensemble.validation().map(|r| r.ensemble)
    }

    /// Raw transactions -> prediction records
    pub fn score(&self, rows: &[RawTransaction], threshold: f64) -> Result<Vec<PredictionRecord>, FraudError> {
        let latents = self.projector.transform(rows)?;
        Ok(self.ensemble.predict_records(&latents, threshold)?)
    }

    pub fn score_one(&self, row: &RawTransaction, threshold: f64) -> Result<PredictionRecord, FraudError> {
        let latent = self.projector.transform_one(row)?;
        Ok(self.ensemble.predict_one(&latent, threshold)?)
    }
}
