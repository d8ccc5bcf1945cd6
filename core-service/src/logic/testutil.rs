//! Seeded synthetic data shared by unit tests

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::logic::config::ScoringConfig;
use crate::logic::features::{FeatureSchema, LabeledTransaction, LatentVector, ProjectorConfig, RawTransaction};
use crate::logic::model::boosting::BoostingParams;
use crate::logic::model::forest::ForestParams;
use crate::logic::model::mlp::MlpParams;
use crate::logic::model::{EnsembleConfig, FamilyConfig, MemberSpec};

pub const CARD_BRANDS: &[&str] = &["visa", "mastercard", "amex"];
pub const DEVICES: &[&str] = &["mobile", "desktop", "tablet"];

/// Four numeric + two categorical features
pub fn small_schema() -> FeatureSchema {
    FeatureSchema::from_names(
        &["amount", "transaction_hour", "ip_distance_km", "transactions_last_1h"],
        &["card_brand", "device_type"],
    )
}

/// Labelled transactions where fraud skews to large, distant, late, bursty
/// activity. Roughly `fraud_rate` of rows are fraud; a few values are left
/// missing on purpose.
pub fn transactions(n: usize, fraud_rate: f64, seed: u64) -> Vec<LabeledTransaction> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let is_fraud = rng.gen_bool(fraud_rate);
            let (amount, hour, distance, burst) = if is_fraud {
                (
                    rng.gen_range(400.0..2000.0),
                    rng.gen_range(0..5) as i64,
                    rng.gen_range(300.0..5000.0),
                    rng.gen_range(4..12) as i64,
                )
            } else {
                (
                    rng.gen_range(5.0..300.0),
                    rng.gen_range(8..22) as i64,
                    rng.gen_range(0.0..50.0),
                    rng.gen_range(0..3) as i64,
                )
            };

            let mut tx = RawTransaction::new()
                .with("amount", amount)
                .with("transaction_hour", hour)
                .with("transactions_last_1h", burst)
                .with("card_brand", CARD_BRANDS[rng.gen_range(0..CARD_BRANDS.len())]);

            // sparse gaps exercise imputation
            if rng.gen_bool(0.95) {
                tx.insert("ip_distance_km", distance);
            }
            if rng.gen_bool(0.9) {
                let device = if is_fraud && rng.gen_bool(0.6) {
                    "emulator"
                } else {
                    DEVICES[rng.gen_range(0..DEVICES.len())]
                };
                tx.insert("device_type", device);
            }

            LabeledTransaction::new(tx, is_fraud)
        })
        .collect()
}

/// Linearly separable latent data: label is `sum(x) > 0` with a margin
pub fn latent_dataset(n: usize, width: usize, seed: u64, projection_id: &str) -> (Vec<LatentVector>, Vec<bool>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut xs = Vec::with_capacity(n);
    let mut ys = Vec::with_capacity(n);
    for i in 0..n {
        let label = i % 3 == 0;
        let shift = if label { 1.5 } else { -1.5 };
        let values = (0..width).map(|_| shift + rng.gen_range(-1.0..1.0)).collect();
        xs.push(LatentVector::new(projection_id, values));
        ys.push(label);
    }
    (xs, ys)
}

/// Default member line-up, shrunk so tests train in milliseconds
pub fn fast_ensemble_config() -> EnsembleConfig {
    EnsembleConfig {
        members: vec![
            MemberSpec::new(
                "mlp",
                0.25,
                FamilyConfig::Mlp(MlpParams {
                    hidden_layers: vec![8],
                    learning_rate: 0.01,
                    batch_size: 32,
                    epochs: 30,
                    ..Default::default()
                }),
            ),
            MemberSpec::new(
                "rf",
                0.25,
                FamilyConfig::Forest(ForestParams { n_trees: 10, ..Default::default() }),
            ),
            MemberSpec::new(
                "xgb",
                0.25,
                FamilyConfig::Boosting(BoostingParams { n_rounds: 20, ..BoostingParams::depth_wise() }),
            ),
            MemberSpec::new(
                "lgb",
                0.25,
                FamilyConfig::Boosting(BoostingParams { n_rounds: 20, ..BoostingParams::leaf_wise() }),
            ),
        ],
        ..Default::default()
    }
}

/// Full pipeline config for `small_schema` data
pub fn fast_scoring_config(n_components: usize) -> ScoringConfig {
    ScoringConfig {
        projector: ProjectorConfig { n_components },
        ensemble: fast_ensemble_config(),
        ..Default::default()
    }
}
