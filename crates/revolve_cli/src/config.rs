//! CLI configuration management
//!
//! Handles loading configuration from TOML files, environment variables, and CLI arguments.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Unknown log level
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Unknown output format
    #[error("Invalid output format: {0}. Must be one of: table, json")]
    InvalidFormat(String),

    /// Non-positive or unparsable number
    #[error("Invalid value for {name}: {value}. Must be a positive integer")]
    InvalidNumber {
        /// Setting name
        name: &'static str,
        /// Offending value
        value: String,
    },

    /// Config file could not be read or parsed
    #[error("Configuration file error: {0}")]
    FileError(String),
}

/// Log levels supported by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Every scheduler decision
    Trace,
    /// Phase boundaries
    Debug,
    /// Run summaries
    #[default]
    Info,
    /// Budget overruns
    Warn,
    /// Errors only
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(ConfigError::InvalidFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// CLI configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Log level
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    /// Output format
    #[serde(deserialize_with = "deserialize_format")]
    pub format: OutputFormat,
    /// Slot count used when a command is given none
    pub default_slots: Option<usize>,
    /// Checkpoint memory budget in MiB, used with a snapshot size
    pub memory_budget_mb: Option<usize>,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    LogLevel::from_str(&s).map_err(serde::de::Error::custom)
}

fn deserialize_format<'de, D>(deserializer: D) -> Result<OutputFormat, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    OutputFormat::from_str(&s).map_err(serde::de::Error::custom)
}

const ENV_LOG_LEVEL: &str = "REVOLVE_LOG_LEVEL";
const ENV_FORMAT: &str = "REVOLVE_FORMAT";
const ENV_SLOTS: &str = "REVOLVE_SLOTS";
const ENV_MEMORY_MB: &str = "REVOLVE_MEMORY_MB";

fn parse_positive(name: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            name,
            value: value.to_string(),
        }),
    }
}

impl CliConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: CliConfig = toml::from_str(content)
            .map_err(|e| ConfigError::FileError(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `REVOLVE_*` environment variables on top of this configuration
    pub fn merge_env(&mut self) -> Result<(), ConfigError> {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    fn merge_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = LogLevel::from_str(&level)?;
        }
        if let Some(format) = lookup(ENV_FORMAT) {
            self.format = OutputFormat::from_str(&format)?;
        }
        if let Some(slots) = lookup(ENV_SLOTS) {
            self.default_slots = Some(parse_positive("default_slots", &slots)?);
        }
        if let Some(mb) = lookup(ENV_MEMORY_MB) {
            self.memory_budget_mb = Some(parse_positive("memory_budget_mb", &mb)?);
        }
        Ok(())
    }

    /// Merge with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli: &CliArgs) -> Result<(), ConfigError> {
        if let Some(level) = &cli.log_level {
            self.log_level = LogLevel::from_str(level)?;
        }
        if cli.verbose && self.log_level == LogLevel::Info {
            self.log_level = LogLevel::Debug;
        }
        if let Some(format) = &cli.format {
            self.format = OutputFormat::from_str(format)?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_slots == Some(0) {
            return Err(ConfigError::InvalidNumber {
                name: "default_slots",
                value: "0".to_string(),
            });
        }
        if self.memory_budget_mb == Some(0) {
            return Err(ConfigError::InvalidNumber {
                name: "memory_budget_mb",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Global CLI arguments relevant to configuration
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Config file path
    pub config_file: Option<PathBuf>,
    /// Log level override
    pub log_level: Option<String>,
    /// Output format override
    pub format: Option<String>,
    /// Verbose flag; raises the default level to debug
    pub verbose: bool,
}

/// Build configuration from all sources
///
/// Priority (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables
/// 3. Config file
/// 4. Default values
pub fn build_config(cli: &CliArgs) -> Result<CliConfig, ConfigError> {
    let mut config = match &cli.config_file {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::default(),
    };

    config.merge_env()?;
    config.merge_with_cli(cli)?;
    config.validate()?;

    Ok(config)
}
