//! Feature Projector - raw transaction -> latent vector
//!
//! Fixed order of operations: impute, then scale / encode, then project.
//! The fitted state is immutable after `fit` and travels inside the model
//! bundle, so everything here is serde-serialisable.

use std::time::Instant;

use log::{debug, info, warn};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_N_COMPONENTS;

use super::categorical::CategoryEncoding;
use super::latent::{component_names, LatentVector};
use super::numeric::NumericStats;
use super::pca::Pca;
use super::raw::{NumericCoercion, RawTransaction};
use super::schema::{FeatureKind, FeatureSchema};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectorError {
    /// Input rows or schema unusable for fitting
    Schema(String),
    /// `transform` called before `fit`
    NotFitted,
}

impl std::fmt::Display for ProjectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectorError::Schema(msg) => write!(f, "Schema error: {}", msg),
            ProjectorError::NotFitted => write!(f, "Feature projector is not fitted"),
        }
    }
}

impl std::error::Error for ProjectorError {}

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectorConfig {
    /// Latent width N
    pub n_components: usize,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            n_components: DEFAULT_N_COMPONENTS,
        }
    }
}

impl ProjectorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.n_components == 0 {
            return Err("n_components must be at least 1".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// FITTED STATE
// ============================================================================

/// Per-feature fitted transform, in schema order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum FeatureTransform {
    Numeric { name: String, stats: NumericStats },
    Categorical { name: String, encoding: CategoryEncoding },
}

impl FeatureTransform {
    fn width(&self) -> usize {
        match self {
            FeatureTransform::Numeric { .. } => 1,
            FeatureTransform::Categorical { encoding, .. } => encoding.width(),
        }
    }
}

/// One column of the encoded matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedColumn {
    /// Encoded name (`amount`, `card_brand_visa`, ...)
    pub name: String,
    /// Raw feature the column came from
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedState {
    projection_id: String,
    schema: FeatureSchema,
    transforms: Vec<FeatureTransform>,
    columns: Vec<EncodedColumn>,
    pca: Pca,
}

/// Loadings of every retained component over the encoded columns
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentLoadings {
    /// `V1`..`VN`
    pub components: Vec<String>,
    pub columns: Vec<EncodedColumn>,
    /// components x columns
    pub matrix: Array2<f64>,
}

impl ComponentLoadings {
    pub fn loading(&self, component: &str, column: &str) -> Option<f64> {
        let row = self.components.iter().position(|c| c == component)?;
        let col = self.columns.iter().position(|c| c.name == column)?;
        Some(self.matrix[[row, col]])
    }

    /// Encoded columns of one component ranked by absolute loading
    pub fn top_columns(&self, component: &str, k: usize) -> Vec<(&EncodedColumn, f64)> {
        let Some(row) = self.components.iter().position(|c| c == component) else {
            return Vec::new();
        };
        let mut ranked: Vec<(&EncodedColumn, f64)> = self
            .columns
            .iter()
            .zip(self.matrix.row(row).iter().copied())
            .collect();
        ranked.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(k);
        ranked
    }
}

// ============================================================================
// PROJECTOR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProjector {
    config: ProjectorConfig,
    fitted: Option<FittedState>,
}

impl FeatureProjector {
    pub fn new(config: ProjectorConfig) -> Self {
        Self { config, fitted: None }
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Learn imputation, scaling, encoding and PCA parameters.
    /// A failed fit leaves any previous fitted state untouched.
    pub fn fit(&mut self, schema: &FeatureSchema, rows: &[RawTransaction]) -> Result<(), ProjectorError> {
        let start = Instant::now();

        self.config.validate().map_err(ProjectorError::Schema)?;
        if rows.is_empty() {
            return Err(ProjectorError::Schema("no training rows".to_string()));
        }
        if schema.is_empty() {
            return Err(ProjectorError::Schema("schema has no features".to_string()));
        }
        let dups = schema.duplicate_names();
        if !dups.is_empty() {
            return Err(ProjectorError::Schema(format!(
                "duplicate feature names: {}",
                dups.join(", ")
            )));
        }

        let mut transforms = Vec::with_capacity(schema.len());
        for spec in schema.features() {
            let transform = match spec.kind {
                FeatureKind::Numeric => {
                    let column = numeric_column(&spec.name, rows)?;
                    let stats = NumericStats::fit(&column);
                    if stats.observed == 0 {
                        warn!("Feature '{}' has no observed values, imputing 0.0", spec.name);
                    }
                    FeatureTransform::Numeric { name: spec.name.clone(), stats }
                }
                FeatureKind::Categorical => {
                    let labels: Vec<String> =
                        rows.iter().map(|r| r.get(&spec.name).coerce_category()).collect();
                    let encoding = CategoryEncoding::fit(labels.iter().map(String::as_str));
                    FeatureTransform::Categorical { name: spec.name.clone(), encoding }
                }
            };
            transforms.push(transform);
        }

        let columns = encoded_columns(&transforms);
        let width = columns.len();
        if width < self.config.n_components {
            return Err(ProjectorError::Schema(format!(
                "encoded width {} is smaller than n_components {}",
                width, self.config.n_components
            )));
        }

        let mut encoded = Array2::<f64>::zeros((rows.len(), width));
        let mut buffer = vec![0.0; width];
        for (i, row) in rows.iter().enumerate() {
            encode_into(&transforms, row, &mut buffer);
            encoded.row_mut(i).assign(&ArrayView1::from(&buffer[..]));
        }

        let pca = Pca::fit(encoded.view(), self.config.n_components);
        let projection_id = uuid::Uuid::new_v4().to_string();

        info!(
            "Projector fitted: {} rows, {} features -> {} encoded -> {} components ({:.1}% variance) in {:?}",
            rows.len(),
            schema.len(),
            width,
            self.config.n_components,
            pca.explained_variance_ratio().sum() * 100.0,
            start.elapsed()
        );

        self.fitted = Some(FittedState {
            projection_id,
            schema: schema.clone(),
            transforms,
            columns,
            pca,
        });
        Ok(())
    }

    pub fn transform(&self, rows: &[RawTransaction]) -> Result<Vec<LatentVector>, ProjectorError> {
        let state = self.state()?;
        let mut buffer = vec![0.0; state.columns.len()];
        Ok(rows
            .iter()
            .map(|row| project_row(state, row, &mut buffer))
            .collect())
    }

    pub fn transform_one(&self, row: &RawTransaction) -> Result<LatentVector, ProjectorError> {
        let state = self.state()?;
        let mut buffer = vec![0.0; state.columns.len()];
        Ok(project_row(state, row, &mut buffer))
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    pub fn projection_id(&self) -> Option<&str> {
        self.fitted.as_ref().map(|s| s.projection_id.as_str())
    }

    pub fn schema(&self) -> Option<&FeatureSchema> {
        self.fitted.as_ref().map(|s| &s.schema)
    }

    /// Latent width N (configured width before fit)
    pub fn latent_width(&self) -> usize {
        self.fitted
            .as_ref()
            .map(|s| s.pca.n_components())
            .unwrap_or(self.config.n_components)
    }

    pub fn encoded_width(&self) -> Option<usize> {
        self.fitted.as_ref().map(|s| s.columns.len())
    }

    pub fn encoded_columns(&self) -> Option<&[EncodedColumn]> {
        self.fitted.as_ref().map(|s| s.columns.as_slice())
    }

    pub fn component_loadings(&self) -> Result<ComponentLoadings, ProjectorError> {
        let state = self.state()?;
        Ok(ComponentLoadings {
            components: component_names(state.pca.n_components()),
            columns: state.columns.clone(),
            matrix: state.pca.components().to_owned(),
        })
    }

    /// Explained variance ratio per component, largest first
    pub fn explained_variance(&self) -> Result<Vec<(String, f64)>, ProjectorError> {
        let state = self.state()?;
        let mut ratios: Vec<(String, f64)> = component_names(state.pca.n_components())
            .into_iter()
            .zip(state.pca.explained_variance_ratio().iter().copied())
            .collect();
        ratios.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(ratios)
    }

    /// Internal consistency of a deserialised projector
    pub fn check_consistency(&self) -> Result<(), String> {
        let Some(state) = &self.fitted else {
            return Ok(());
        };
        let width: usize = state.transforms.iter().map(FeatureTransform::width).sum();
        if width != state.columns.len() || width != state.pca.input_width() {
            return Err(format!(
                "encoded width disagreement: transforms {}, columns {}, pca {}",
                width,
                state.columns.len(),
                state.pca.input_width()
            ));
        }
        if state.transforms.len() != state.schema.len() {
            return Err("transform count does not match schema".to_string());
        }
        Ok(())
    }

    fn state(&self) -> Result<&FittedState, ProjectorError> {
        self.fitted.as_ref().ok_or(ProjectorError::NotFitted)
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn numeric_column(name: &str, rows: &[RawTransaction]) -> Result<Vec<Option<f64>>, ProjectorError> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| match row.get(name).coerce_numeric() {
            NumericCoercion::Value(v) => Ok(Some(v)),
            NumericCoercion::Missing => Ok(None),
            NumericCoercion::Invalid => Err(ProjectorError::Schema(format!(
                "numeric feature '{}' has non-numeric value {:?} at row {}",
                name,
                row.get(name),
                i
            ))),
        })
        .collect()
}

fn encoded_columns(transforms: &[FeatureTransform]) -> Vec<EncodedColumn> {
    let mut columns = Vec::new();
    for t in transforms {
        match t {
            FeatureTransform::Numeric { name, .. } => columns.push(EncodedColumn {
                name: name.clone(),
                source: name.clone(),
            }),
            FeatureTransform::Categorical { name, encoding } => {
                columns.extend(encoding.column_names(name).into_iter().map(|col| EncodedColumn {
                    name: col,
                    source: name.clone(),
                }))
            }
        }
    }
    columns
}

fn encode_into(transforms: &[FeatureTransform], row: &RawTransaction, out: &mut [f64]) {
    let mut offset = 0;
    for t in transforms {
        match t {
            FeatureTransform::Numeric { name, stats } => {
                let value = match row.get(name).coerce_numeric() {
                    NumericCoercion::Value(v) => Some(v),
                    NumericCoercion::Missing => None,
                    NumericCoercion::Invalid => {
                        debug!("Unparsable value for '{}', imputing", name);
                        None
                    }
                };
                out[offset] = stats.apply(value);
                offset += 1;
            }
            FeatureTransform::Categorical { name, encoding } => {
                let width = encoding.width();
                let label = row.get(name).coerce_category();
                encoding.encode_into(&label, &mut out[offset..offset + width]);
                offset += width;
            }
        }
    }
}

fn project_row(state: &FittedState, row: &RawTransaction, buffer: &mut [f64]) -> LatentVector {
    encode_into(&state.transforms, row, buffer);
    let values = state.pca.project(ArrayView1::from(&buffer[..]));
    LatentVector::new(state.projection_id.clone(), values)
}
