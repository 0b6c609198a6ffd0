//! Artifact loader: Reads the pre-trained model bundle from disk.
//!
//! A bundle is a directory holding three JSON exports produced by the
//! training pipeline:
//!
//! - `feature_columns.json`: ordered feature schema
//! - `heart_scaler.json`: fitted `StandardScaler`
//! - `heart_model.json`: fitted classifier (`"kind"`-tagged)
//!
//! # Integrity
//!
//! A bundle may carry `manifest.json` (SHA-256 of each artifact) and
//! `artifacts.sig` (Ed25519 signature over the manifest bytes). When present,
//! the signature and every hash are checked before anything is parsed. Unsigned
//! bundles load with a warning unless signatures are required.
//!
//! Loading happens once at startup. Any failure here is fatal for the session.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::adapters::sklearn::{ExportedClassifier, InvalidEstimator, StandardScaler};
use crate::domain::FeatureSchema;
use crate::ports::{Classifier, Scaler};

pub const FEATURE_COLUMNS_FILE: &str = "feature_columns.json";
pub const SCALER_FILE: &str = "heart_scaler.json";
pub const MODEL_FILE: &str = "heart_model.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "artifacts.sig";

/// Every file a signed manifest must bind.
pub const ARTIFACT_FILES: [&str; 3] = [FEATURE_COLUMNS_FILE, SCALER_FILE, MODEL_FILE];

pub const MANIFEST_VERSION: u32 = 1;

/// Error type for artifact loading.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact directory not found: {0:?}")]
    DirectoryNotFound(PathBuf),

    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {file}: {source}")]
    Parse {
        file: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid {file}: {source}")]
    Invalid {
        file: &'static str,
        #[source]
        source: InvalidEstimator,
    },

    #[error("Artifact dimensions disagree: {0}")]
    DimensionMismatch(String),

    #[error("Artifact signature check failed: {0}")]
    Signature(String),

    #[error("Unsigned artifacts rejected: {MANIFEST_FILE} and {SIGNATURE_FILE} are required")]
    UnsignedRejected,
}

/// Signed list of artifact digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    /// Unix timestamp (seconds) when the bundle was signed.
    pub created_at: i64,
    /// File name -> lowercase hex SHA-256.
    pub files: BTreeMap<String, String>,
}

/// How strictly to treat bundle signatures.
#[derive(Debug, Clone, Default)]
pub struct ArtifactPolicy {
    /// Refuse bundles without a manifest and signature.
    pub require_signature: bool,
    /// Key that signed the manifest. Needed whenever a manifest is present.
    pub verifying_key: Option<VerifyingKey>,
}

/// The loaded, validated model bundle. Immutable after load.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub schema: FeatureSchema,
    pub scaler: StandardScaler,
    pub classifier: ExportedClassifier,
    /// Whether the bundle was verified against a signed manifest.
    pub verified: bool,
}

impl ModelArtifacts {
    /// Load and cross-check the bundle in `dir`.
    ///
    /// # Errors
    /// Returns `ArtifactError` if any file is missing, unparsable, structurally
    /// invalid, inconsistent with the others, or fails signature checks.
    pub fn load(dir: &Path, policy: &ArtifactPolicy) -> Result<Self, ArtifactError> {
        if !dir.is_dir() {
            return Err(ArtifactError::DirectoryNotFound(dir.to_path_buf()));
        }

        let verified = match verify_bundle(dir, policy)? {
            Some(manifest) => {
                tracing::info!(
                    "Artifact manifest verified ({} files, signed at {})",
                    manifest.files.len(),
                    manifest.created_at
                );
                true
            }
            None => {
                tracing::warn!("Loading UNSIGNED model artifacts from {:?}", dir);
                false
            }
        };

        let columns: Vec<String> = read_json(dir, FEATURE_COLUMNS_FILE)?;
        let schema = FeatureSchema::new(columns);
        let scaler: StandardScaler = read_json(dir, SCALER_FILE)?;
        let classifier: ExportedClassifier = read_json(dir, MODEL_FILE)?;

        scaler.validate().map_err(|source| ArtifactError::Invalid {
            file: SCALER_FILE,
            source,
        })?;
        classifier.validate().map_err(|source| ArtifactError::Invalid {
            file: MODEL_FILE,
            source,
        })?;

        let artifacts = Self {
            schema,
            scaler,
            classifier,
            verified,
        };
        artifacts.check_dimensions()?;

        tracing::info!(
            "Loaded {} classifier with {} features from {:?}",
            artifacts.classifier.kind(),
            artifacts.schema.len(),
            dir
        );
        Ok(artifacts)
    }

    fn check_dimensions(&self) -> Result<(), ArtifactError> {
        let n = self.schema.len();
        if n == 0 {
            return Err(ArtifactError::DimensionMismatch(
                "feature schema is empty".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = self.schema.columns().iter().find(|c| !seen.insert(c.as_str())) {
            return Err(ArtifactError::DimensionMismatch(format!(
                "feature schema lists column '{dup}' twice"
            )));
        }
        if self.scaler.n_features() != n {
            return Err(ArtifactError::DimensionMismatch(format!(
                "schema has {n} columns but scaler was fitted on {}",
                self.scaler.n_features()
            )));
        }
        if self.classifier.n_features() != n {
            return Err(ArtifactError::DimensionMismatch(format!(
                "schema has {n} columns but classifier was trained on {}",
                self.classifier.n_features()
            )));
        }
        Ok(())
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(
    dir: &Path,
    file: &'static str,
) -> Result<T, ArtifactError> {
    let bytes = read_bytes(&dir.join(file))?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse { file, source })
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

// Constant-time compare for ASCII strings (used for SHA-256 hex digests).
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Decode a base64 Ed25519 public key.
///
/// # Errors
/// Returns `ArtifactError::Signature` for bad base64, wrong length or an
/// invalid curve point.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, ArtifactError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|_| ArtifactError::Signature("Invalid public key base64".into()))?;
    let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        ArtifactError::Signature("Invalid public key length (expected 32 bytes)".into())
    })?;
    VerifyingKey::from_bytes(&key)
        .map_err(|_| ArtifactError::Signature("Invalid verifying key".into()))
}

/// Read a base64 Ed25519 public key from a file.
///
/// # Errors
/// Returns `ArtifactError` if the file cannot be read or decoded.
pub fn load_verifying_key(path: &Path) -> Result<VerifyingKey, ArtifactError> {
    let bytes = read_bytes(path)?;
    verifying_key_from_b64(&String::from_utf8_lossy(&bytes))
}

/// Check the bundle's manifest and signature, if it has them.
///
/// Returns `Ok(None)` for an unsigned bundle that the policy allows.
fn verify_bundle(
    dir: &Path,
    policy: &ArtifactPolicy,
) -> Result<Option<ArtifactManifest>, ArtifactError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let sig_path = dir.join(SIGNATURE_FILE);

    match (manifest_path.exists(), sig_path.exists()) {
        (false, false) => {
            if policy.require_signature {
                return Err(ArtifactError::UnsignedRejected);
            }
            return Ok(None);
        }
        (true, false) => {
            return Err(ArtifactError::Signature(format!(
                "{MANIFEST_FILE} present without {SIGNATURE_FILE}"
            )))
        }
        (false, true) => {
            return Err(ArtifactError::Signature(format!(
                "{SIGNATURE_FILE} present without {MANIFEST_FILE}"
            )))
        }
        (true, true) => {}
    }

    let key = policy.verifying_key.as_ref().ok_or_else(|| {
        ArtifactError::Signature("bundle is signed but no verifying key is configured".into())
    })?;

    let sig_bytes = read_bytes(&sig_path)?;
    let sig_bytes: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| {
        ArtifactError::Signature("Invalid signature length (expected 64 bytes)".into())
    })?;
    let signature = Signature::from_bytes(&sig_bytes);

    let manifest_bytes = read_bytes(&manifest_path)?;
    key.verify(&manifest_bytes, &signature)
        .map_err(|_| ArtifactError::Signature("Invalid manifest signature".into()))?;

    let manifest: ArtifactManifest =
        serde_json::from_slice(&manifest_bytes).map_err(|source| ArtifactError::Parse {
            file: MANIFEST_FILE,
            source,
        })?;
    if manifest.version != MANIFEST_VERSION {
        return Err(ArtifactError::Signature(format!(
            "Unsupported manifest version: {}",
            manifest.version
        )));
    }

    // The signature is only meaningful if it binds every file we are about to parse.
    for file in ARTIFACT_FILES {
        let expected = manifest.files.get(file).ok_or_else(|| {
            ArtifactError::Signature(format!("manifest does not bind {file}"))
        })?;
        let actual = sha256_hex(&read_bytes(&dir.join(file))?);
        if !constant_time_eq_str(&actual, expected) {
            return Err(ArtifactError::Signature(format!("File hash mismatch for {file}")));
        }
    }

    Ok(Some(manifest))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::RngCore;
    use tempfile::tempdir;

    const COLUMNS: &str = r#"["age", "chol", "sex_Male"]"#;
    const SCALER: &str = r#"{"mean": [50.0, 200.0, 0.5], "scale": [10.0, 40.0, 0.5]}"#;
    const MODEL: &str = r#"{
        "kind": "logistic_regression",
        "classes": [0, 1],
        "coefficients": [0.8, 0.3, 0.4],
        "intercept": -0.2
    }"#;

    pub(crate) fn write_bundle(dir: &Path) {
        fs::write(dir.join(FEATURE_COLUMNS_FILE), COLUMNS).expect("write columns");
        fs::write(dir.join(SCALER_FILE), SCALER).expect("write scaler");
        fs::write(dir.join(MODEL_FILE), MODEL).expect("write model");
    }

    fn signing_key() -> SigningKey {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        SigningKey::from_bytes(&seed)
    }

    fn sign_bundle(dir: &Path, key: &SigningKey, files: &[&str]) {
        let files = files
            .iter()
            .map(|f| {
                let bytes = fs::read(dir.join(f)).expect("read artifact");
                ((*f).to_string(), sha256_hex(&bytes))
            })
            .collect();
        let manifest = ArtifactManifest {
            version: MANIFEST_VERSION,
            created_at: 1_700_000_000,
            files,
        };
        let bytes = serde_json::to_vec_pretty(&manifest).expect("serialize manifest");
        fs::write(dir.join(MANIFEST_FILE), &bytes).expect("write manifest");
        let signature: Signature = key.sign(&bytes);
        fs::write(dir.join(SIGNATURE_FILE), signature.to_bytes()).expect("write signature");
    }

    fn policy_for(key: &SigningKey) -> ArtifactPolicy {
        ArtifactPolicy {
            require_signature: true,
            verifying_key: Some(key.verifying_key()),
        }
    }

    #[test]
    fn test_load_unsigned_bundle() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());

        let artifacts =
            ModelArtifacts::load(temp.path(), &ArtifactPolicy::default()).expect("Should load");
        assert_eq!(artifacts.schema.len(), 3);
        assert!(!artifacts.verified);
        assert_eq!(artifacts.classifier.kind(), "logistic_regression");
    }

    #[test]
    fn test_load_shipped_models() {
        let artifacts = ModelArtifacts::load(Path::new("models"), &ArtifactPolicy::default())
            .expect("Shipped bundle should load");
        assert_eq!(artifacts.classifier.kind(), "random_forest");
        assert!(artifacts
            .schema
            .columns()
            .iter()
            .any(|c| c == "thal_reversable defect"));
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let err = ModelArtifacts::load(Path::new("does/not/exist"), &ArtifactPolicy::default())
            .expect_err("must fail");
        assert!(matches!(err, ArtifactError::DirectoryNotFound(_)));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());
        fs::remove_file(temp.path().join(SCALER_FILE)).expect("remove scaler");

        let err = ModelArtifacts::load(temp.path(), &ArtifactPolicy::default())
            .expect_err("must fail");
        assert!(matches!(err, ArtifactError::Read { .. }));
    }

    #[test]
    fn test_corrupt_file_is_fatal() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());
        fs::write(temp.path().join(MODEL_FILE), b"\x80\x04pickle").expect("corrupt model");

        let err = ModelArtifacts::load(temp.path(), &ArtifactPolicy::default())
            .expect_err("must fail");
        assert!(matches!(err, ArtifactError::Parse { file: MODEL_FILE, .. }));
    }

    #[test]
    fn test_dimension_mismatch_is_fatal() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());
        fs::write(temp.path().join(FEATURE_COLUMNS_FILE), r#"["age", "chol"]"#)
            .expect("write columns");

        let err = ModelArtifacts::load(temp.path(), &ArtifactPolicy::default())
            .expect_err("must fail");
        assert!(matches!(err, ArtifactError::DimensionMismatch(_)));
    }

    #[test]
    fn test_duplicate_schema_column_is_fatal() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());
        fs::write(temp.path().join(FEATURE_COLUMNS_FILE), r#"["age", "age", "chol"]"#)
            .expect("write columns");

        let err = ModelArtifacts::load(temp.path(), &ArtifactPolicy::default())
            .expect_err("must fail");
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn test_signed_bundle_verifies() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());
        let key = signing_key();
        sign_bundle(temp.path(), &key, &ARTIFACT_FILES);

        let artifacts = ModelArtifacts::load(temp.path(), &policy_for(&key)).expect("Should load");
        assert!(artifacts.verified);
    }

    #[test]
    fn test_tampered_artifact_is_rejected() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());
        let key = signing_key();
        sign_bundle(temp.path(), &key, &ARTIFACT_FILES);

        fs::write(
            temp.path().join(SCALER_FILE),
            r#"{"mean": [0.0, 0.0, 0.0], "scale": [1.0, 1.0, 1.0]}"#,
        )
        .expect("tamper scaler");

        let err = ModelArtifacts::load(temp.path(), &policy_for(&key)).expect_err("must fail");
        assert!(err.to_string().contains("hash mismatch"));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());
        sign_bundle(temp.path(), &signing_key(), &ARTIFACT_FILES);

        let err = ModelArtifacts::load(temp.path(), &policy_for(&signing_key()))
            .expect_err("must fail");
        assert!(err.to_string().contains("Invalid manifest signature"));
    }

    #[test]
    fn test_manifest_must_bind_every_artifact() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());
        let key = signing_key();
        sign_bundle(temp.path(), &key, &[FEATURE_COLUMNS_FILE, MODEL_FILE]);

        let err = ModelArtifacts::load(temp.path(), &policy_for(&key)).expect_err("must fail");
        assert!(err.to_string().contains("does not bind heart_scaler.json"));
    }

    #[test]
    fn test_unsigned_bundle_rejected_when_required() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());

        let policy = ArtifactPolicy {
            require_signature: true,
            verifying_key: None,
        };
        let err = ModelArtifacts::load(temp.path(), &policy).expect_err("must fail");
        assert!(matches!(err, ArtifactError::UnsignedRejected));
    }

    #[test]
    fn test_signed_bundle_without_key_is_rejected() {
        let temp = tempdir().expect("tempdir");
        write_bundle(temp.path());
        sign_bundle(temp.path(), &signing_key(), &ARTIFACT_FILES);

        let err = ModelArtifacts::load(temp.path(), &ArtifactPolicy::default())
            .expect_err("must fail");
        assert!(err.to_string().contains("no verifying key"));
    }

    #[test]
    fn test_verifying_key_from_b64() {
        let key = signing_key();
        let b64 = base64::engine::general_purpose::STANDARD.encode(key.verifying_key().to_bytes());
        let decoded = verifying_key_from_b64(&format!("{b64}\n")).expect("Should decode");
        assert_eq!(decoded, key.verifying_key());

        assert!(verifying_key_from_b64("not base64!").is_err());
        assert!(verifying_key_from_b64("AAAA").is_err());
    }
}
