//! Bundle Store - atomic, checksummed persistence
//!
//! File layout (JSON envelope):
//! `{ format_version, bundle_id, schema_fingerprint, checksum, payload }`
//! where `payload` is the serialized bundle and `checksum` its SHA-256.
//! Writes go to a hidden temp file in the same directory and are renamed
//! into place, so readers never observe a partial bundle.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::get_model_dir;

use super::types::{ModelBundle, BUNDLE_FORMAT_VERSION};
use super::validate::{validate_bundle, BundleError};

const BUNDLE_EXTENSION: &str = "json";

// ============================================================================
// HANDLE / ENVELOPE
// ============================================================================

/// Opaque reference to a persisted bundle (its file path)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BundleHandle(PathBuf);

impl BundleHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl std::fmt::Display for BundleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct BundleEnvelope {
    format_version: u32,
    bundle_id: String,
    schema_fingerprint: u32,
    checksum: String,
    payload: String,
}

fn checksum(payload: &str) -> String {
    hex::encode(Sha256::digest(payload.as_bytes()))
}

// ============================================================================
// STORE
// ============================================================================

#[derive(Debug, Clone)]
pub struct BundleStore {
    dir: PathBuf,
}

impl BundleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `FRAUD_MODEL_DIR`, or `<data_local_dir>/fraud-scoring/models`
    pub fn default_location() -> Self {
        Self::new(get_model_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a bundle atomically
    pub fn save(&self, bundle: &ModelBundle) -> Result<BundleHandle, BundleError> {
        let start = Instant::now();
        validate_bundle(bundle)?;
        fs::create_dir_all(&self.dir)?;

        let payload = serde_json::to_string(bundle)?;
        let envelope = BundleEnvelope {
            format_version: BUNDLE_FORMAT_VERSION,
            bundle_id: bundle.id().to_string(),
            schema_fingerprint: bundle.schema().fingerprint(),
            checksum: checksum(&payload),
            payload,
        };
        let bytes = serde_json::to_vec(&envelope)?;

        let name = format!(
            "bundle_{}_{}.{}",
            bundle.created_at().format("%Y%m%dT%H%M%S%.3fZ"),
            bundle.id().chars().take(8).collect::<String>(),
            BUNDLE_EXTENSION
        );
        let final_path = self.dir.join(&name);
        let tmp_path = self.dir.join(format!(".{}.tmp", name));

        if let Err(e) = write_synced(&tmp_path, &bytes) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp_path, &final_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        info!(
            "Bundle {} saved to {} ({} bytes) in {:?}",
            bundle.id(),
            final_path.display(),
            bytes.len(),
            start.elapsed()
        );
        Ok(BundleHandle(final_path))
    }

    /// Restore a bundle, all or nothing
    pub fn load(&self, handle: &BundleHandle) -> Result<ModelBundle, BundleError> {
        load_bundle(handle.path())
    }

    /// Stored bundles, oldest first (file names are timestamped)
    pub fn list(&self) -> Result<Vec<BundleHandle>, BundleError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut handles: Vec<BundleHandle> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension().map_or(false, |ext| ext == BUNDLE_EXTENSION)
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .map_or(false, |n| !n.starts_with('.'))
            })
            .map(BundleHandle)
            .collect();
        handles.sort();
        Ok(handles)
    }

    pub fn latest(&self) -> Result<Option<BundleHandle>, BundleError> {
        Ok(self.list()?.pop())
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Read, verify and decode one bundle file
pub fn load_bundle(path: &Path) -> Result<ModelBundle, BundleError> {
    let start = Instant::now();
    let data = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => BundleError::NotFound(path.to_path_buf()),
        _ => BundleError::Io(e),
    })?;
    let envelope: BundleEnvelope = serde_json::from_slice(&data)
        .map_err(|e| BundleError::Corrupt(format!("unreadable envelope: {}", e)))?;

    if envelope.format_version != BUNDLE_FORMAT_VERSION {
        return Err(BundleError::Corrupt(format!(
            "unsupported format version {}",
            envelope.format_version
        )));
    }
    if checksum(&envelope.payload) != envelope.checksum {
        warn!("Checksum mismatch for {}", path.display());
        return Err(BundleError::Corrupt("checksum mismatch".to_string()));
    }

    let bundle: ModelBundle = serde_json::from_str(&envelope.payload)
        .map_err(|e| BundleError::Corrupt(format!("unreadable payload: {}", e)))?;

    if bundle.id() != envelope.bundle_id {
        return Err(BundleError::Corrupt("bundle id does not match envelope".to_string()));
    }
    let actual = bundle.schema().fingerprint();
    if envelope.schema_fingerprint != actual {
        return Err(BundleError::SchemaMismatch {
            expected: envelope.schema_fingerprint,
            actual,
        });
    }
    validate_bundle(&bundle)?;

    info!("Bundle {} loaded from {} in {:?}", bundle.id(), path.display(), start.elapsed());
    Ok(bundle)
}
