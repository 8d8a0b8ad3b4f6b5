// ABOUTME: Configuration management for the toolflow application
// ABOUTME: Handles loading and merging configuration from files and environment variables

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::engine::{EngineConfig, SchedulerConfig};
use crate::tools::ToolSettings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub tools: ToolSettings,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Seed values merged under every document's own variables.
    #[serde(default)]
    pub variables: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => Some(p),
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(ref path) if path.exists() => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                serde_yaml::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            _ => Config::default(),
        };

        config.merge_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let possible_paths = [
            PathBuf::from("toolflow.yaml"),
            PathBuf::from("toolflow.yml"),
            PathBuf::from(".toolflow.yaml"),
            PathBuf::from(".toolflow.yml"),
        ];

        // Check current directory
        if let Some(path) = possible_paths.into_iter().find(|path| path.exists()) {
            return Some(path);
        }

        // Check home directory
        dirs::home_dir()
            .map(|home_dir| home_dir.join(".toolflow").join("config.yaml"))
            .filter(|path| path.exists())
    }

    /// Merge environment variables into configuration
    fn merge_env(&mut self) -> Result<()> {
        // Logging configuration
        if let Ok(level) = std::env::var("TOOLFLOW_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("TOOLFLOW_LOG_FORMAT") {
            self.logging.format = format;
        }

        // Engine and scheduler
        if let Ok(max_retries) = std::env::var("TOOLFLOW_MAX_RETRIES") {
            self.scheduler.max_retries = max_retries
                .parse()
                .context("TOOLFLOW_MAX_RETRIES must be a non-negative integer")?;
        }
        if let Ok(strict) = std::env::var("TOOLFLOW_STRICT_CONDITIONS") {
            self.engine.strict_conditions = parse_flag(&strict)
                .context("TOOLFLOW_STRICT_CONDITIONS must be true or false")?;
        }
        if let Ok(max_parallel) = std::env::var("TOOLFLOW_MAX_PARALLEL") {
            self.engine.max_parallel_tasks = Some(
                max_parallel
                    .parse()
                    .context("TOOLFLOW_MAX_PARALLEL must be a positive integer")?,
            );
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        Ok(())
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow::anyhow!("invalid boolean '{}'", other)),
    }
}
