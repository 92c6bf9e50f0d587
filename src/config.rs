//! Engine configuration
//!
//! Loads and validates YAML configuration. Every key is optional:
//!
//! ```yaml
//! retain_snapshots: 32     # null keeps every snapshot
//! dispatch:
//!   compact_len: 3
//!   ellipsis: "..."
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Default number of snapshots kept before the oldest is evicted.
pub const DEFAULT_RETAIN_SNAPSHOTS: usize = 32;

/// Elements shown by the compact mode of a collection view.
pub const DEFAULT_COMPACT_LEN: usize = 3;

/// Knobs for default-view synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchOptions {
    /// Elements kept by the compact mode. Collections at or below this size get no compact mode.
    pub compact_len: usize,
    /// Marker appended by the compact mode.
    pub ellipsis: String,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            compact_len: DEFAULT_COMPACT_LEN,
            ellipsis: "...".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Most recent snapshots kept in full. `None` never evicts.
    pub retain_snapshots: Option<usize>,
    pub dispatch: DispatchOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retain_snapshots: Some(DEFAULT_RETAIN_SNAPSHOTS),
            dispatch: DispatchOptions::default(),
        }
    }
}

impl EngineConfig {
    /// Environment variable naming a YAML config file.
    pub const ENV_VAR: &'static str = "VIEWGRAPH_CONFIG";

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse engine config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading engine configuration from {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Load from the file named by `VIEWGRAPH_CONFIG`, or fall back to defaults.
    pub fn from_env() -> Result<Self> {
        match std::env::var(Self::ENV_VAR) {
            Ok(path) if !path.is_empty() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.retain_snapshots == Some(0) {
            bail!("retain_snapshots must be at least 1 (use null to keep every snapshot)");
        }
        if self.dispatch.compact_len == 0 {
            bail!("dispatch.compact_len must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.retain_snapshots, Some(32));
        assert_eq!(config.dispatch.compact_len, 3);
        assert_eq!(config.dispatch.ellipsis, "...");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = EngineConfig::from_yaml_str("dispatch:\n  ellipsis: \"…\"\n").unwrap();
        assert_eq!(config.retain_snapshots, Some(32));
        assert_eq!(config.dispatch.compact_len, 3);
        assert_eq!(config.dispatch.ellipsis, "…");
    }

    #[test]
    fn test_null_retention_is_unbounded() {
        let config = EngineConfig::from_yaml_str("retain_snapshots: null\n").unwrap();
        assert_eq!(config.retain_snapshots, None);
    }

    #[test]
    fn test_zero_retention_rejected() {
        assert!(EngineConfig::from_yaml_str("retain_snapshots: 0\n").is_err());
        assert!(EngineConfig::from_yaml_str("dispatch:\n  compact_len: 0\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "retain_snapshots: 4").unwrap();
        writeln!(file, "dispatch:").unwrap();
        writeln!(file, "  compact_len: 5").unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.retain_snapshots, Some(4));
        assert_eq!(config.dispatch.compact_len, 5);
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load("/definitely/not/here.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
