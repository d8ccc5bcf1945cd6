//! Feature Schema - Centralized Feature Definition
//!
//! **This type controls which raw attributes reach the projector**
//!
//! ## Rules:
//! 1. The schema captured at fit time is immutable
//! 2. Order matters: encoded columns follow schema order
//! 3. Any change in names, order or kinds changes the fingerprint
//!
//! The fingerprint is what bundle loading compares to detect a projector
//! that was fitted against a different schema than the one it ships with.

use std::collections::HashSet;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use super::raw::RawTransaction;

// ============================================================================
// SCHEMA VERSION
// ============================================================================

/// Current schema format version
/// MUST be incremented when the fingerprint encoding changes
pub const SCHEMA_VERSION: u8 = 1;

// ============================================================================
// DEFAULT TRANSACTION LAYOUT
// ============================================================================

/// Numeric attributes of the reference transaction model
pub const DEFAULT_NUMERIC_FEATURES: &[&str] = &[
    // === Amount ===
    "amount",

    // === Geography ===
    "merchant_latitude",
    "merchant_longitude",
    "user_home_latitude",
    "user_home_longitude",
    "user_ip_latitude",
    "user_ip_longitude",

    // === Device / timing ===
    "device_age_days",
    "transaction_hour",

    // === Merchant ===
    "merchant_risk_score",
    "merchant_avg_transaction",
    "merchant_chargeback_rate",
    "merchant_age_days",

    // === User ===
    "user_age",
    "user_credit_score",
    "user_account_age_days",
    "user_avg_transaction",
    "user_session_duration_avg",

    // === Behaviour / derived ===
    "ip_distance_km",
    "transaction_duration_sec",
    "transactions_last_1h",
    "transactions_last_24h",
    "amount_to_avg_balance_ratio",
    "location_velocity_kmh",
    "composite_risk_score",
];

/// Categorical attributes of the reference transaction model
pub const DEFAULT_CATEGORICAL_FEATURES: &[&str] = &[
    "merchant_category",
    "merchant_country",
    "device_type",
    "payment_type",
    "card_brand",
    "card_type",
    "user_ip_country",
    "shipping_country",
    "merchant_industry",
    "device_os",
];

// ============================================================================
// SCHEMA
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

impl FeatureKind {
    fn tag(self) -> u8 {
        match self {
            FeatureKind::Numeric => b'n',
            FeatureKind::Categorical => b'c',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub kind: FeatureKind,
}

/// Ordered list of named, typed features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    version: u8,
    features: Vec<FeatureSpec>,
}

impl FeatureSchema {
    pub fn new(features: Vec<FeatureSpec>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            features,
        }
    }

    /// Build from separate numeric and categorical name lists
    /// (numeric features first, like the column transformer layout)
    pub fn from_names(numeric: &[&str], categorical: &[&str]) -> Self {
        let features = numeric
            .iter()
            .map(|n| FeatureSpec { name: n.to_string(), kind: FeatureKind::Numeric })
            .chain(categorical.iter().map(|n| FeatureSpec {
                name: n.to_string(),
                kind: FeatureKind::Categorical,
            }))
            .collect();
        Self::new(features)
    }

    /// Reference transaction schema (25 numeric + 10 categorical)
    pub fn transaction_default() -> Self {
        Self::from_names(DEFAULT_NUMERIC_FEATURES, DEFAULT_CATEGORICAL_FEATURES)
    }

    /// Infer kinds from data: numeric iff every present value is a number
    /// literal. Names are taken in sorted order across all rows.
    pub fn infer(rows: &[RawTransaction]) -> Self {
        let mut names: Vec<String> = rows
            .iter()
            .flat_map(|r| r.names().map(str::to_string))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        names.sort();

        let features = names
            .into_iter()
            .map(|name| {
                let all_numeric = rows
                    .iter()
                    .map(|r| r.get(&name))
                    .filter(|v| !v.is_missing())
                    .all(|v| v.is_numeric_literal());
                let kind = if all_numeric {
                    FeatureKind::Numeric
                } else {
                    FeatureKind::Categorical
                };
                FeatureSpec { name, kind }
            })
            .collect();
        Self::new(features)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.name.as_str())
    }

    pub fn numeric(&self) -> impl Iterator<Item = &str> {
        self.of_kind(FeatureKind::Numeric)
    }

    pub fn categorical(&self) -> impl Iterator<Item = &str> {
        self.of_kind(FeatureKind::Categorical)
    }

    fn of_kind(&self, kind: FeatureKind) -> impl Iterator<Item = &str> {
        self.features
            .iter()
            .filter(move |f| f.kind == kind)
            .map(|f| f.name.as_str())
    }

    /// Get feature index by name (O(n) but schemas are small)
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name == name)
    }

    pub fn kind_of(&self, name: &str) -> Option<FeatureKind> {
        self.features.iter().find(|f| f.name == name).map(|f| f.kind)
    }

    /// Names that appear more than once
    pub fn duplicate_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut dups = Vec::new();
        for f in &self.features {
            if !seen.insert(f.name.as_str()) && !dups.contains(&f.name) {
                dups.push(f.name.clone());
            }
        }
        dups
    }

    /// CRC32 over version, names and kinds
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = Hasher::new();
        hasher.update(&[self.version]);
        for f in &self.features {
            hasher.update(f.name.as_bytes());
            hasher.update(&[0, f.kind.tag(), 0]);
        }
        hasher.finalize()
    }

    pub fn info(&self) -> SchemaInfo {
        SchemaInfo {
            version: self.version,
            fingerprint: self.fingerprint(),
            numeric_count: self.numeric().count(),
            categorical_count: self.categorical().count(),
        }
    }
}

// ============================================================================
// SCHEMA INFO / VALIDATION
// ============================================================================

/// Compact schema summary for logs and status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub version: u8,
    pub fingerprint: u32,
    pub numeric_count: usize,
    pub categorical_count: usize,
}

/// Two schemas disagree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMismatch {
    pub expected: u32,
    pub actual: u32,
}

impl std::fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Feature schema mismatch: expected fingerprint {:08x}, got {:08x}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for SchemaMismatch {}

/// Validate that `actual` is the same schema as `expected`
pub fn validate_schema(expected: &FeatureSchema, actual: &FeatureSchema) -> Result<(), SchemaMismatch> {
    if expected != actual {
        return Err(SchemaMismatch {
            expected: expected.fingerprint(),
            actual: actual.fingerprint(),
        });
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
