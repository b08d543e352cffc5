//! CLI configuration

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use illium_zk::DEFAULT_SETUP_ROUNDS;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "ILLIUM_CONFIG";

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Where the public parameter set is cached; no caching when unset
    pub params_cache: Option<PathBuf>,

    /// Step bound for `eval` and `prove` when `--max-steps` is not given
    pub default_max_steps: usize,

    /// Rounds of the parameter setup chain
    pub setup_rounds: u32,

    /// Log filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            params_cache: Self::default_params_cache(),
            default_max_steps: 1_000_000,
            setup_rounds: DEFAULT_SETUP_ROUNDS,
            log_filter: "illium=info".to_string(),
        }
    }
}

impl CliConfig {
    fn default_params_cache() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("illium").join("params.bin"))
    }

    /// `$ILLIUM_CONFIG`, else `<config dir>/illium/cli.json`
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("illium")
                    .join("cli.json")
            })
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load `path`, writing the defaults there first if it does not exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let config = Self::default();
        config.save(path)?;
        info!("Created default config at {:?}", path);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cli.json");

        let created = CliConfig::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created, CliConfig::default());
        assert_eq!(CliConfig::load(&path).unwrap(), created);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.json");
        std::fs::write(&path, r#"{ "default_max_steps": 42, "params_cache": null }"#).unwrap();

        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.default_max_steps, 42);
        assert_eq!(config.params_cache, None);
        assert_eq!(config.log_filter, "illium=info");
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(CliConfig::load(&path).is_err());
    }
}
