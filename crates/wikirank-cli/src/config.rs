//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use wikirank_core::config::DEFAULT_NA_VALUES;
use wikirank_core::{ColumnMapping, EtlParams};

/// File configuration for wikirank
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub columns: ColumnMapping,
    pub output: OutputConfig,
    pub etl: EtlParams,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    #[serde(deserialize_with = "deserialize_env_path")]
    pub path: PathBuf,
    /// Strings read as missing; replaces the default list when set
    pub na_values: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("wikirank.csv"),
            na_values: DEFAULT_NA_VALUES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub parquet: bool,
    pub compression_level: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            parquet: false,
            compression_level: 3,
        }
    }
}

/// Deserialize a path that may be an environment variable reference like ${VAR}
fn deserialize_env_path<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    expand_env_var(&raw)
        .map(PathBuf::from)
        .ok_or_else(|| {
            serde::de::Error::custom(format!("environment variable in {raw} is not set"))
        })
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./wikirank.toml (current directory)
    /// 2. ~/.config/wikirank/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("wikirank.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "wikirank") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Runtime config for the core pipeline, before CLI overrides
    pub fn to_run_config(&self) -> wikirank_core::Config {
        wikirank_core::Config {
            input: self.input.path.clone(),
            output_dir: self.output.dir.clone(),
            columns: self.columns.clone(),
            na_values: self.input.na_values.clone(),
            params: self.etl.clone(),
            parquet: self.output.parquet,
            zstd_level: self.output.compression_level,
        }
    }
}
