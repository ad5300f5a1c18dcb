//! Command line arguments
//!
//! Every global option can also come from the configuration file; values given
//! here win over the file.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::core::validation::{parse_byte_size, validate_positive_int, validate_source_url};

/// Report rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "distscan")]
#[command(about = "Scan Python package distributions for malicious code")]
#[command(version)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Rule directory or .zip bundle
    #[arg(short = 'r', long = "rules", value_name = "DIR|ZIP", global = true)]
    pub rules: Option<PathBuf>,

    /// Version label reported for the rules (default: content digest)
    #[arg(long = "rules-version", value_name = "VERSION", global = true)]
    pub rules_version: Option<String>,

    /// Largest download or decompressed size accepted per distribution
    #[arg(short = 'm', long = "max-artifact-bytes", value_name = "SIZE", value_parser = parse_byte_size, global = true)]
    pub max_artifact_bytes: Option<u64>,

    /// HTTP timeout in seconds
    #[arg(long = "http-timeout", value_name = "SECONDS", value_parser = validate_positive_int, global = true)]
    pub http_timeout: Option<usize>,

    /// Overall time limit for one scan in seconds
    #[arg(long = "scan-deadline", value_name = "SECONDS", value_parser = validate_positive_int, global = true)]
    pub scan_deadline: Option<usize>,

    /// Distributions of a release scanned at the same time
    #[arg(short = 'j', long = "max-concurrent-distributions", value_name = "COUNT", value_parser = validate_positive_int, global = true)]
    pub max_concurrent_distributions: Option<usize>,

    /// User-Agent header for downloads
    #[arg(long = "user-agent", value_name = "AGENT", global = true)]
    pub user_agent: Option<String>,

    /// Output format
    #[arg(long = "format", value_enum, value_name = "FORMAT", global = true)]
    pub format: Option<OutputFormat>,

    /// Color output: --color forces it on, --color=false turns it off
    #[arg(short = 'g', long = "color", value_name = "BOOL", num_args = 0..=1, default_missing_value = "true", global = true)]
    pub color: Option<bool>,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"], global = true)]
    pub log_level: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"], global = true)]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Scan every distribution of a release described by a JSON file
    Scan {
        /// Release metadata: name, version, canonical_link, distributions
        #[arg(value_name = "RELEASE.json")]
        release: PathBuf,
    },

    /// Scan a single distribution
    ScanArtifact {
        /// Download URL or local path
        #[arg(value_name = "URL|PATH", value_parser = parse_source)]
        source: String,

        /// Package type: sdist, bdist_wheel or bdist_egg
        #[arg(short = 't', long = "type", value_name = "PACKAGE_TYPE")]
        package_type: String,

        /// Distribution filename (default: last component of the source)
        #[arg(long = "filename", value_name = "NAME")]
        filename: Option<String>,

        /// Inspector link prefix for the report
        #[arg(long = "inspector-link", value_name = "URL")]
        inspector_link: Option<String>,
    },

    /// Compile the configured rules and list them
    Rules,

    /// Show scanner and rules metadata
    Info,
}

fn parse_source(value: &str) -> Result<String, String> {
    validate_source_url(value)?;
    Ok(value.to_string())
}
