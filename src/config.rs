//! Runtime configuration from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `HEARTVERSE_MODEL_PATH` | `models` |
//! | `HEARTVERSE_OUTPUT_DIR` | `.` |
//! | `HEARTVERSE_REQUIRE_SIGNED_ARTIFACTS` | `false` |
//! | `HEARTVERSE_ARTIFACT_PUBKEY_B64_FILE` | unset |
//! | `HEARTVERSE_LOG_MODE` | `stderr` (`file` to log to a file) |
//! | `HEARTVERSE_LOG_FILE` | `heartverse.log` |
//!
//! Logging variables are read by the binary before anything else runs; the
//! rest are collected here.

use std::path::PathBuf;

use crate::adapters::artifacts::load_verifying_key;
use crate::adapters::{ArtifactError, ArtifactPolicy};

pub const MODEL_PATH_ENV: &str = "HEARTVERSE_MODEL_PATH";
pub const OUTPUT_DIR_ENV: &str = "HEARTVERSE_OUTPUT_DIR";
pub const REQUIRE_SIGNED_ENV: &str = "HEARTVERSE_REQUIRE_SIGNED_ARTIFACTS";
pub const PUBKEY_FILE_ENV: &str = "HEARTVERSE_ARTIFACT_PUBKEY_B64_FILE";

const DEFAULT_MODEL_PATH: &str = "models";
const DEFAULT_OUTPUT_DIR: &str = ".";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Directory holding the model bundle.
    pub model_path: PathBuf,
    /// Directory reports are written into.
    pub output_dir: PathBuf,
    /// Refuse to load a bundle without a valid signature.
    pub require_signed_artifacts: bool,
    /// File holding the base64 Ed25519 verifying key.
    pub pubkey_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            require_signed_artifacts: false,
            pubkey_file: None,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        Self {
            model_path: get(MODEL_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            output_dir: get(OUTPUT_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            require_signed_artifacts: get(REQUIRE_SIGNED_ENV)
                .map(|v| parse_bool(&v))
                .unwrap_or(defaults.require_signed_artifacts),
            pubkey_file: get(PUBKEY_FILE_ENV).map(PathBuf::from),
        }
    }

    /// Signature policy for loading the model bundle.
    ///
    /// # Errors
    /// Returns `ArtifactError` if a configured key file cannot be read or decoded.
    pub fn artifact_policy(&self) -> Result<ArtifactPolicy, ArtifactError> {
        let verifying_key = match &self.pubkey_file {
            Some(path) => Some(load_verifying_key(path)?),
            None => None,
        };
        Ok(ArtifactPolicy {
            require_signature: self.require_signed_artifacts,
            verifying_key,
        })
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]), AppConfig::default());
        assert_eq!(AppConfig::default().model_path, PathBuf::from("models"));
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            (MODEL_PATH_ENV, "/opt/models"),
            (OUTPUT_DIR_ENV, "/tmp/reports"),
            (REQUIRE_SIGNED_ENV, "yes"),
            (PUBKEY_FILE_ENV, "/etc/heartverse/pub.b64"),
        ]);
        assert_eq!(cfg.model_path, PathBuf::from("/opt/models"));
        assert_eq!(cfg.output_dir, PathBuf::from("/tmp/reports"));
        assert!(cfg.require_signed_artifacts);
        assert_eq!(cfg.pubkey_file, Some(PathBuf::from("/etc/heartverse/pub.b64")));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let cfg = config(&[(MODEL_PATH_ENV, "  "), (REQUIRE_SIGNED_ENV, "")]);
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("on"));
    }

    #[test]
    fn test_policy_without_key() {
        let policy = config(&[(REQUIRE_SIGNED_ENV, "1")])
            .artifact_policy()
            .expect("Should build policy");
        assert!(policy.require_signature);
        assert!(policy.verifying_key.is_none());
    }

    #[test]
    fn test_policy_missing_key_file() {
        let cfg = config(&[(PUBKEY_FILE_ENV, "/nonexistent/heartverse.pub")]);
        assert!(matches!(cfg.artifact_policy(), Err(ArtifactError::Read { .. })));
    }
}
