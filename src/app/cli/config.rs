//! TOML configuration file parsing and layering
//!
//! Settings are resolved in three layers: built-in defaults, then the
//! configuration file (explicit `--config-file`, else the default path when it
//! exists), then command line flags.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::core::logging::{LogFormat, LogSettings};
use crate::core::validation::parse_byte_size;
use crate::scanner::config::ScanConfig;

use super::args::{Args, OutputFormat};

const CONFIG_DIR: &str = "Distscan";
const CONFIG_FILE: &str = "distscan.toml";
const RULES_DIR: &str = "rules";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("The specified configuration file does not exist: {path}")]
    Missing { path: String },

    #[error("Error reading configuration file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Error parsing configuration file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid value for '{key}': {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl crate::core::error_handling::ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        !matches!(self, ConfigError::Read { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ConfigError::Missing { path } => Some(path),
            ConfigError::Parse { message, .. } | ConfigError::Invalid { message, .. } => {
                Some(message)
            }
            ConfigError::Read { .. } => None,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Fully resolved runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub scan: ScanConfig,
    pub rules: Option<PathBuf>,
    pub rules_version: Option<String>,
    pub log: LogSettings,
    /// `None` means decide from the terminal
    pub color: Option<bool>,
    pub format: OutputFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            rules: None,
            rules_version: None,
            log: LogSettings::default(),
            color: None,
            format: OutputFormat::Text,
        }
    }
}

/// `<config_dir>/Distscan/distscan.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// `<config_dir>/Distscan/rules`, used when no rule location is configured
pub fn default_rules_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR).join(RULES_DIR))
}

/// Read the configuration file. An explicit path must exist; the default
/// path is optional.
pub fn read_config_file(explicit: Option<&Path>) -> ConfigResult<Option<toml::Table>> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::Missing {
                    path: path.display().to_string(),
                });
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(None),
        },
    };

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let table = toml::from_str::<toml::Table>(&contents).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    log::debug!("Loaded configuration from {}", path.display());
    Ok(Some(table))
}

fn positive_integer(config: &toml::Table, key: &str) -> ConfigResult<Option<u64>> {
    match config.get(key) {
        None => Ok(None),
        Some(value) => match value.as_integer() {
            Some(n) if n > 0 => Ok(Some(n as u64)),
            Some(_) => Err(ConfigError::invalid(key, "must be greater than 0")),
            None => Err(ConfigError::invalid(key, "expected an integer")),
        },
    }
}

fn string_value<'a>(config: &'a toml::Table, key: &str) -> ConfigResult<Option<&'a str>> {
    match config.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(key, "expected a string")),
    }
}

fn log_file_value(value: &str) -> Option<PathBuf> {
    // Magic values "none" and "-" disable file logging
    if value.eq_ignore_ascii_case("none") || value == "-" {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

impl Settings {
    /// Apply TOML configuration values
    pub fn apply_toml_values(&mut self, config: &toml::Table) -> ConfigResult<()> {
        if let Some(value) = config.get("max-artifact-bytes") {
            self.scan.max_artifact_bytes = match value {
                toml::Value::Integer(n) if *n > 0 => *n as u64,
                toml::Value::Integer(_) => {
                    return Err(ConfigError::invalid("max-artifact-bytes", "must be greater than 0"))
                }
                toml::Value::String(s) => {
                    parse_byte_size(s).map_err(|e| ConfigError::invalid("max-artifact-bytes", e))?
                }
                _ => {
                    return Err(ConfigError::invalid(
                        "max-artifact-bytes",
                        "expected an integer or a size such as \"256MiB\"",
                    ))
                }
            };
        }
        if let Some(seconds) = positive_integer(config, "http-timeout")? {
            self.scan.http_timeout = Duration::from_secs(seconds);
        }
        if let Some(seconds) = positive_integer(config, "scan-deadline")? {
            self.scan.scan_deadline = Some(Duration::from_secs(seconds));
        }
        if let Some(count) = positive_integer(config, "max-concurrent-distributions")? {
            self.scan.max_concurrent_distributions = count as usize;
        }
        if let Some(agent) = string_value(config, "user-agent")? {
            self.scan.user_agent = agent.to_string();
        }
        if let Some(rules) = string_value(config, "rules")? {
            self.rules = Some(PathBuf::from(rules));
        }
        if let Some(version) = string_value(config, "rules-version")? {
            self.rules_version = Some(version.to_string());
        }
        if let Some(level) = string_value(config, "log-level")? {
            self.log.level = level.to_string();
        }
        if let Some(format) = string_value(config, "log-format")? {
            self.log.format = LogFormat::from_str(format)
                .map_err(|_| ConfigError::invalid("log-format", "expected text, ext or json"))?;
        }
        if let Some(file) = string_value(config, "log-file")? {
            self.log.file = log_file_value(file);
        }
        if let Some(value) = config.get("color") {
            let color = value
                .as_bool()
                .ok_or_else(|| ConfigError::invalid("color", "expected true or false"))?;
            self.color = Some(color);
        }
        Ok(())
    }

    /// Apply command line values over whatever is set
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(bytes) = args.max_artifact_bytes {
            self.scan.max_artifact_bytes = bytes;
        }
        if let Some(seconds) = args.http_timeout {
            self.scan.http_timeout = Duration::from_secs(seconds as u64);
        }
        if let Some(seconds) = args.scan_deadline {
            self.scan.scan_deadline = Some(Duration::from_secs(seconds as u64));
        }
        if let Some(count) = args.max_concurrent_distributions {
            self.scan.max_concurrent_distributions = count;
        }
        if let Some(agent) = &args.user_agent {
            self.scan.user_agent = agent.clone();
        }
        if let Some(rules) = &args.rules {
            self.rules = Some(rules.clone());
        }
        if let Some(version) = &args.rules_version {
            self.rules_version = Some(version.clone());
        }
        if let Some(level) = &args.log_level {
            self.log.level = level.clone();
        }
        if let Some(format) = args.log_format.as_deref().and_then(|f| LogFormat::from_str(f).ok()) {
            self.log.format = format;
        }
        if let Some(file) = &args.log_file {
            self.log.file = log_file_value(&file.to_string_lossy());
        }
        if args.color.is_some() {
            self.color = args.color;
        }
        if let Some(format) = args.format {
            self.format = format;
        }
    }

    /// Defaults, then the configuration file, then `args`
    pub fn load(args: &Args) -> ConfigResult<Self> {
        let mut settings = Settings::default();
        if let Some(table) = read_config_file(args.config_file.as_deref())? {
            settings.apply_toml_values(&table)?;
        }
        settings.apply_args(args);
        Ok(settings)
    }
}
