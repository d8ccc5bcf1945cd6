//! Drift Detection - relative change of live metrics against a reference
//!
//! For each metric present in both snapshots:
//! 1. change = |current - reference| / reference
//! 2. flagged when change is strictly greater than the threshold
//!
//! A zero reference makes the relative change undefined; the policy decides
//! what happens then.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::metrics::MetricsSnapshot;
use super::MonitorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroReferencePolicy {
    /// Surface `MonitorError::MetricUndefined`
    #[default]
    Reject,
    /// Leave the metric out of the report
    Skip,
    /// Flag iff the current value differs from zero
    FlagIfChanged,
}

/// Per-metric drift outcome
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DriftReport {
    /// metric -> drifted
    pub flags: BTreeMap<String, bool>,
    /// metric -> relative change (absent when the reference was zero)
    pub changes: BTreeMap<String, f64>,
    pub threshold: f64,
}

impl DriftReport {
    pub fn any_drift(&self) -> bool {
        self.flags.values().any(|&f| f)
    }

    pub fn drifted(&self) -> Vec<&str> {
        self.flags
            .iter()
            .filter(|(_, &f)| f)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn is_flagged(&self, metric: &str) -> Option<bool> {
        self.flags.get(metric).copied()
    }
}

pub fn validate_threshold(threshold: f64) -> Result<(), MonitorError> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(MonitorError::InvalidThreshold(threshold));
    }
    Ok(())
}

/// Compare two snapshots metric by metric
pub fn detect_drift(
    reference: &MetricsSnapshot,
    current: &MetricsSnapshot,
    threshold: f64,
    policy: ZeroReferencePolicy,
) -> Result<DriftReport, MonitorError> {
    validate_threshold(threshold)?;

    let mut report = DriftReport {
        threshold,
        ..Default::default()
    };

    for (metric, ref_value) in reference.named() {
        let Some(cur_value) = current.get(metric) else {
            continue;
        };

        if ref_value == 0.0 {
            match policy {
                ZeroReferencePolicy::Reject => {
                    return Err(MonitorError::MetricUndefined {
                        metric: metric.to_string(),
                    })
                }
                ZeroReferencePolicy::Skip => {
                    debug!("Skipping drift for '{}': zero reference", metric);
                }
                ZeroReferencePolicy::FlagIfChanged => {
                    report.flags.insert(metric.to_string(), cur_value != 0.0);
                }
            }
            continue;
        }

        let change = ((cur_value - ref_value) / ref_value).abs();
        let flagged = change > threshold;
        if flagged {
            warn!(
                "Drift on '{}': {:.3} -> {:.3} ({:.1}% > {:.1}%)",
                metric,
                ref_value,
                cur_value,
                change * 100.0,
                threshold * 100.0
            );
        }
        report.changes.insert(metric.to_string(), change);
        report.flags.insert(metric.to_string(), flagged);
    }

    Ok(report)
}
