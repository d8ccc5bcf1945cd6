use std::path::PathBuf;

use super::types::{ModelBundle, BUNDLE_FORMAT_VERSION};

#[derive(Debug)]
pub enum BundleError {
    NotFound(PathBuf),
    Corrupt(String),
    SchemaMismatch { expected: u32, actual: u32 },
    Io(std::io::Error),
}

impl std::fmt::Display for BundleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BundleError::NotFound(path) => write!(f, "Bundle not found: {}", path.display()),
            BundleError::Corrupt(msg) => write!(f, "Bundle corrupt: {}", msg),
            BundleError::SchemaMismatch { expected, actual } => {
                write!(f, "Bundle schema mismatch: expected {:08x}, got {:08x}", expected, actual)
            }
            BundleError::Io(e) => write!(f, "IO Error: {}", e),
        }
    }
}

impl std::error::Error for BundleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BundleError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BundleError {
    fn from(err: std::io::Error) -> Self {
        BundleError::Io(err)
    }
}

impl From<serde_json::Error> for BundleError {
    fn from(err: serde_json::Error) -> Self {
        BundleError::Corrupt(format!("serialization: {}", err))
    }
}

/// Internal consistency of a bundle: projector fitted against the bundle
/// schema, and ensemble trained on that projector's output
pub fn validate_bundle(bundle: &ModelBundle) -> Result<(), BundleError> {
    if bundle.format_version() != BUNDLE_FORMAT_VERSION {
        return Err(BundleError::Corrupt(format!(
            "unsupported format version {} (expected {})",
            bundle.format_version(),
            BUNDLE_FORMAT_VERSION
        )));
    }

    let projector = bundle.projector();
    let Some(fitted_schema) = projector.schema() else {
        return Err(BundleError::Corrupt("projector is not fitted".to_string()));
    };
    projector.check_consistency().map_err(BundleError::Corrupt)?;

    let expected = bundle.schema().fingerprint();
    let actual = fitted_schema.fingerprint();
    if bundle.schema() != fitted_schema {
        return Err(BundleError::SchemaMismatch { expected, actual });
    }

    let ensemble = bundle.ensemble();
    if ensemble.members().is_empty() {
        return Err(BundleError::Corrupt("ensemble has no members".to_string()));
    }
    if projector.latent_width() != ensemble.input_width() {
        return Err(BundleError::Corrupt(format!(
            "projector width {} does not match ensemble width {}",
            projector.latent_width(),
            ensemble.input_width()
        )));
    }
    if projector.projection_id() != Some(ensemble.projection_id()) {
        return Err(BundleError::Corrupt(
            "ensemble was trained on a different projector fit".to_string(),
        ));
    }
    Ok(())
}
