//! Configuration management for ecs-tunnel.
//!
//! Loads optional defaults from `~/.ecs-tunnel/config.toml`. Only AWS
//! connection defaults live here; everything else is resolved per run. CLI
//! flags always win over file values.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Main configuration structure for ecs-tunnel.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// AWS-specific configuration options
    #[serde(default)]
    pub aws: AwsConfig,
}

/// AWS SDK configuration options.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AwsConfig {
    /// Default AWS region (e.g., "us-east-1")
    /// If not specified, will use AWS SDK's default resolution (env vars, profile, etc.)
    pub region: Option<String>,

    /// AWS profile name to use from ~/.aws/credentials
    /// If not specified, will use the default profile
    pub profile: Option<String>,
}

impl Config {
    /// Returns the path to the configuration file (~/.ecs-tunnel/config.toml)
    pub fn config_file_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(home_dir.join(".ecs-tunnel").join("config.toml"))
    }

    /// Loads configuration from the config file.
    ///
    /// A missing file is not an error; defaults apply. A present but
    /// unparseable file is reported with context.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {config_path:?}"))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {config_path:?}"))?;

        Ok(config)
    }
}
