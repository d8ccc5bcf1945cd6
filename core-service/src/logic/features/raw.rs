//! Raw Transaction - heterogeneous input record
//!
//! A transaction is a name -> scalar mapping. Values may be numeric,
//! integer-coded, free text or absent. Coercion to the fitted feature kind
//! happens here so the projector only ever sees `f64` or category strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::MISSING_CATEGORY;

// ============================================================================
// RAW VALUE
// ============================================================================

/// One scalar attribute of a raw transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Integer(i64),
    Number(f64),
    Text(String),
    Missing,
}

/// Outcome of coercing a value to a number
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericCoercion {
    Value(f64),
    Missing,
    Invalid,
}

impl RawValue {
    pub fn is_missing(&self) -> bool {
        match self {
            RawValue::Missing => true,
            RawValue::Number(v) => v.is_nan(),
            RawValue::Text(s) => s.trim().is_empty(),
            RawValue::Integer(_) => false,
        }
    }

    /// True for values that are numbers on the wire (not text)
    pub fn is_numeric_literal(&self) -> bool {
        matches!(self, RawValue::Integer(_) | RawValue::Number(_))
    }

    /// Coerce to a finite number. Text is parsed after trimming.
    pub fn coerce_numeric(&self) -> NumericCoercion {
        match self {
            RawValue::Missing => NumericCoercion::Missing,
            RawValue::Integer(i) => NumericCoercion::Value(*i as f64),
            RawValue::Number(v) if v.is_nan() => NumericCoercion::Missing,
            RawValue::Number(v) if v.is_finite() => NumericCoercion::Value(*v),
            RawValue::Number(_) => NumericCoercion::Invalid,
            RawValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return NumericCoercion::Missing;
                }
                match trimmed.parse::<f64>() {
                    Ok(v) if v.is_finite() => NumericCoercion::Value(v),
                    _ => NumericCoercion::Invalid,
                }
            }
        }
    }

    /// Coerce to a category label. Absent values map to the missing sentinel.
    pub fn coerce_category(&self) -> String {
        match self {
            RawValue::Missing => MISSING_CATEGORY.to_string(),
            RawValue::Integer(i) => i.to_string(),
            RawValue::Number(v) if v.is_nan() => MISSING_CATEGORY.to_string(),
            RawValue::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => {
                format!("{}", *v as i64)
            }
            RawValue::Number(v) => v.to_string(),
            RawValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    MISSING_CATEGORY.to_string()
                } else {
                    trimmed.to_string()
                }
            }
        }
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Integer(v)
    }
}

impl From<i32> for RawValue {
    fn from(v: i32) -> Self {
        RawValue::Integer(v as i64)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(RawValue::Missing)
    }
}

// ============================================================================
// RAW TRANSACTION
// ============================================================================

/// Name -> value mapping for one transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTransaction {
    fields: BTreeMap<String, RawValue>,
}

impl RawTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, name: &str, value: impl Into<RawValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<RawValue>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<RawValue> {
        self.fields.remove(name)
    }

    /// Lookup; absent names read as `Missing`
    pub fn get(&self, name: &str) -> &RawValue {
        self.fields.get(name).unwrap_or(&RawValue::Missing)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawTransaction {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// One training example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledTransaction {
    pub features: RawTransaction,
    pub is_fraud: bool,
}

impl LabeledTransaction {
    pub fn new(features: RawTransaction, is_fraud: bool) -> Self {
        Self { features, is_fraud }
    }
}
