//! Service configuration with TOML file support.

use haven_crypto::Quantizer;
use haven_proof::CircuitShape;
use haven_utils::{LogFormat, LoggingError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("circuit shape mismatch: configured {configured}, engine reports {engine}")]
    CircuitMismatch {
        configured: CircuitShape,
        engine: CircuitShape,
    },

    #[error("startup failed: {0}")]
    Startup(String),
}

/// What happens to a profile blob once suspect marking repoints its record
/// at a re-sealed copy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupersededBlobPolicy {
    /// Leave the old blob in place for audit.
    #[default]
    Retain,
    /// Journal the old blob as released so the reconciliation sweep may
    /// reclaim it once the grace period has passed.
    Release,
}

/// Configuration for a Haven registry service.
///
/// Can be loaded from a TOML file via [`HavenConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HavenConfig {
    #[serde(default)]
    pub superseded_blobs: SupersededBlobPolicy,

    /// Minimum age before an unreferenced blob may be reclaimed.
    #[serde(default = "default_reconcile_grace_secs")]
    pub reconcile_grace_secs: u64,

    /// JSON-lines saga journal. In-memory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal_path: Option<PathBuf>,

    /// Verification key for the proof engine. A development key is
    /// generated when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_key_path: Option<PathBuf>,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub quantizer: QuantizerConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantizerConfig {
    #[serde(default = "default_storage_scale")]
    pub storage_scale: f64,
    /// Circuit input count `k`.
    #[serde(default = "default_circuit_inputs")]
    pub circuit_inputs: usize,
    /// Circuit range upper bound `R`.
    #[serde(default = "default_circuit_range")]
    pub circuit_range: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_extraction_ms")]
    pub extraction_ms: u64,
    #[serde(default = "default_ledger_ms")]
    pub ledger_ms: u64,
    #[serde(default = "default_store_ms")]
    pub store_ms: u64,
    #[serde(default = "default_proof_ms")]
    pub proof_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_root")]
    pub root: PathBuf,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_storage_scale() -> f64 {
    haven_crypto::quantize::DEFAULT_STORAGE_SCALE
}

fn default_circuit_inputs() -> usize {
    haven_crypto::quantize::DEFAULT_CIRCUIT_INPUTS
}

fn default_circuit_range() -> u32 {
    haven_crypto::quantize::DEFAULT_CIRCUIT_RANGE
}

fn default_extraction_ms() -> u64 {
    10_000
}

fn default_ledger_ms() -> u64 {
    15_000
}

fn default_store_ms() -> u64 {
    15_000
}

fn default_proof_ms() -> u64 {
    60_000
}

fn default_store_root() -> PathBuf {
    PathBuf::from("./blockstore")
}

fn default_reconcile_grace_secs() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl Default for QuantizerConfig {
    fn default() -> Self {
        Self {
            storage_scale: default_storage_scale(),
            circuit_inputs: default_circuit_inputs(),
            circuit_range: default_circuit_range(),
        }
    }
}

impl QuantizerConfig {
    pub fn quantizer(&self) -> Quantizer {
        Quantizer::new(self.storage_scale, self.circuit_inputs, self.circuit_range)
    }

    pub fn circuit_shape(&self) -> CircuitShape {
        CircuitShape::new(self.circuit_inputs, i64::from(self.circuit_range))
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            extraction_ms: default_extraction_ms(),
            ledger_ms: default_ledger_ms(),
            store_ms: default_store_ms(),
            proof_ms: default_proof_ms(),
        }
    }
}

impl TimeoutConfig {
    pub fn extraction(&self) -> Duration {
        Duration::from_millis(self.extraction_ms)
    }

    pub fn ledger(&self) -> Duration {
        Duration::from_millis(self.ledger_ms)
    }

    pub fn store(&self) -> Duration {
        Duration::from_millis(self.store_ms)
    }

    pub fn proof(&self) -> Duration {
        Duration::from_millis(self.proof_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_store_root(),
        }
    }
}

impl HavenConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Install the global subscriber with the configured format and level.
    /// `RUST_LOG`, when set, overrides `log_level`.
    pub fn init_logging(&self) -> Result<(), LoggingError> {
        haven_utils::init_logging(self.log_format, &self.log_level)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let q = &self.quantizer;
        if !q.storage_scale.is_finite() || q.storage_scale <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "quantizer.storage_scale must be positive, got {}",
                q.storage_scale
            )));
        }
        if q.circuit_inputs == 0 {
            return Err(ConfigError::Invalid(
                "quantizer.circuit_inputs must be at least 1".into(),
            ));
        }
        if q.circuit_range == 0 {
            return Err(ConfigError::Invalid(
                "quantizer.circuit_range must be at least 1".into(),
            ));
        }
        let t = &self.timeouts;
        for (name, ms) in [
            ("extraction_ms", t.extraction_ms),
            ("ledger_ms", t.ledger_ms),
            ("store_ms", t.store_ms),
            ("proof_ms", t.proof_ms),
        ] {
            if ms == 0 {
                return Err(ConfigError::Invalid(format!("timeouts.{name} must be non-zero")));
            }
        }
        Ok(())
    }
}

impl Default for HavenConfig {
    fn default() -> Self {
        Self {
            quantizer: QuantizerConfig::default(),
            timeouts: TimeoutConfig::default(),
            store: StoreConfig::default(),
            superseded_blobs: SupersededBlobPolicy::default(),
            reconcile_grace_secs: default_reconcile_grace_secs(),
            journal_path: None,
            verification_key_path: None,
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = HavenConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = HavenConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = HavenConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.quantizer.circuit_inputs, 5);
        assert_eq!(config.quantizer.circuit_range, 1023);
        assert_eq!(config.quantizer.storage_scale, 1000.0);
        assert_eq!(config.timeouts.proof(), Duration::from_secs(60));
        assert_eq!(config.store.root, PathBuf::from("./blockstore"));
        assert_eq!(config.superseded_blobs, SupersededBlobPolicy::Retain);
        assert_eq!(config.reconcile_grace_secs, 3600);
        assert_eq!(config.log_format, LogFormat::Human);
        assert!(config.journal_path.is_none());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            superseded_blobs = "release"
            journal_path = "/var/lib/haven/journal.jsonl"
            log_format = "json"

            [quantizer]
            circuit_inputs = 8

            [timeouts]
            extraction_ms = 2500
        "#;
        let config = HavenConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.superseded_blobs, SupersededBlobPolicy::Release);
        assert_eq!(config.quantizer.circuit_inputs, 8);
        assert_eq!(config.quantizer.circuit_range, 1023); // default
        assert_eq!(config.timeouts.extraction(), Duration::from_millis(2500));
        assert_eq!(config.timeouts.ledger_ms, 15_000); // default
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.journal_path.as_deref(),
            Some(Path::new("/var/lib/haven/journal.jsonl"))
        );
        assert_eq!(config.quantizer.circuit_shape(), CircuitShape::new(8, 1023));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            HavenConfig::from_toml_str("[quantizer]\ncircuit_inputs = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            HavenConfig::from_toml_str("[quantizer]\nstorage_scale = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            HavenConfig::from_toml_str("[timeouts]\nproof_ms = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            HavenConfig::from_toml_str("superseded_blobs = \"shred\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_returns_io_error() {
        let result = HavenConfig::from_toml_file("/nonexistent/haven.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn logging_is_installed_from_config_once() {
        let config = HavenConfig::from_toml_str("log_format = \"json\"\nlog_level = \"debug\"\n")
            .unwrap();
        assert_eq!(config.log_format, LogFormat::Json);

        let first = config.init_logging();
        assert!(first.is_ok() || matches!(first, Err(LoggingError::AlreadyInitialized)));
        assert!(matches!(
            config.init_logging(),
            Err(LoggingError::AlreadyInitialized)
        ));
    }
}
