//! Training Pipeline - labelled transactions to a ready-to-serve bundle
//!
//! split -> fit projector on training rows -> project both halves ->
//! train ensemble -> assemble bundle

pub mod split;


pub use split::stratified_split;

use std::time::Instant;

use log::info;

use crate::logic::bundle::ModelBundle;
use crate::logic::config::ScoringConfig;
use crate::logic::error::FraudError;
use crate::logic::features::{FeatureProjector, FeatureSchema, LabeledTransaction, ProjectorError, RawTransaction};
use crate::logic::model::EnsembleModel;

pub struct FraudDetector;

impl FraudDetector {
    /// Train projector and ensemble together. Nothing is persisted.
    pub fn train(
        schema: &FeatureSchema,
        data: &[LabeledTransaction],
        config: &ScoringConfig,
    ) -> Result<ModelBundle, FraudError> {
        let start = Instant::now();
        config.validate()?;
        if data.is_empty() {
            return Err(ProjectorError::Schema("no training rows".to_string()).into());
        }

        let labels: Vec<bool> = data.iter().map(|t| t.is_fraud).collect();
        let (train_idx, val_idx) =
            stratified_split(&labels, config.training.validation_fraction, config.training.seed);
        info!(
            "Training on {} transactions ({} fraud): {} train / {} validation",
            data.len(),
            labels.iter().filter(|&&y| y).count(),
            train_idx.len(),
            val_idx.len()
        );

        let (train_rows, y_train) = gather(data, &train_idx);
        let (val_rows, y_val) = gather(data, &val_idx);

        let mut projector = FeatureProjector::new(config.projector.clone());
        projector.fit(schema, &train_rows)?;
        let x_train = projector.transform(&train_rows)?;
        let x_val = projector.transform(&val_rows)?;

        let ensemble = EnsembleModel::train(&config.ensemble, &x_train, &y_train, &x_val, &y_val)?;
        let bundle = ModelBundle::new(schema.clone(), projector, ensemble)?;

        info!("Bundle {} trained in {:?}", bundle.id(), start.elapsed());
        Ok(bundle)
    }
}

fn gather(data: &[LabeledTransaction], idx: &[usize]) -> (Vec<RawTransaction>, Vec<bool>) {
    idx.iter()
        .map(|&i| (data[i].features.clone(), data[i].is_fraud))
        .unzip()
}
