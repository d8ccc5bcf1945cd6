//! Fraud Scoring - JSON-lines scoring loop
//!
//! Publishes the newest bundle from `FRAUD_MODEL_DIR` (or the platform data
//! dir), then reads one `RawTransaction` JSON object per stdin line and
//! writes one `PredictionRecord` JSON object per stdout line.

use std::io::{self, BufRead, Write};

use fraud_scoring_core::constants::APP_VERSION;
use fraud_scoring_core::logic::bundle::registry;
use fraud_scoring_core::{init_logging, BundleStore, RawTransaction, ScoringConfig};

fn main() {
    init_logging();
    log::info!("Starting Fraud Scoring v{}...", APP_VERSION);

    let config = ScoringConfig::from_env();
    if let Err(e) = registry::set_threshold(config.threshold) {
        log::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let store = BundleStore::default_location();
    match store.latest() {
        Ok(Some(handle)) => {
            if let Err(e) = registry::registry().load_and_publish(&store, &handle) {
                log::error!("Failed to load bundle {}: {}", handle, e);
                std::process::exit(1);
            }
        }
        Ok(None) => {
            log::error!("No model bundle found in {}", store.dir().display());
            std::process::exit(1);
        }
        Err(e) => {
            log::error!("Cannot list bundles in {}: {}", store.dir().display(), e);
            std::process::exit(1);
        }
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::error!("stdin: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RawTransaction>(&line) {
            Ok(tx) => match registry::score(&tx, None) {
                Ok(record) => serde_json::json!(record),
                Err(e) => serde_json::json!({ "error": e.to_string() }),
            },
            Err(e) => serde_json::json!({ "error": format!("bad request: {}", e) }),
        };

        let written = writeln!(out, "{}", response);
        if written.is_err() {
            break;
        }
    }

    let status = registry::get_status();
    log::info!(
        "Scored {} transactions ({} errors, avg {:.3} ms)",
        status.score_count,
        status.error_count,
        status.avg_latency_ms
    );
}
