//! Configuration files layered under command line flags

use distscan::app::cli::args::Args;
use distscan::app::cli::config::{ConfigError, Settings};
use distscan::app::startup::{EXIT_ERROR, EXIT_FLAGGED};
use clap::Parser;
use serial_test::serial;
use tempfile::TempDir;

use super::run_with_config;
use crate::common::fixtures::*;

#[test]
fn test_config_file_supplies_rules() {
    let dir = TempDir::new().unwrap();
    let rules = write_rules(dir.path());
    let config = dir.path().join("distscan.toml");
    std::fs::write(
        &config,
        format!(
            "rules = \"{}\"\nrules-version = \"pinned\"\nmax-artifact-bytes = \"1MiB\"\n",
            rules.display()
        ),
    )
    .unwrap();

    let args = Args::try_parse_from([
        "distscan",
        "-c",
        config.to_str().unwrap(),
        "--rules-version",
        "override",
        "rules",
    ])
    .unwrap();
    let settings = Settings::load(&args).unwrap();

    assert_eq!(settings.rules.as_deref(), Some(rules.as_path()));
    assert_eq!(settings.rules_version.as_deref(), Some("override"));
    assert_eq!(settings.scan.max_artifact_bytes, 1024 * 1024);
}

#[test]
fn test_invalid_config_value_reported() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("distscan.toml");
    std::fs::write(&config, "max-concurrent-distributions = 0\n").unwrap();

    let args = Args::try_parse_from(["distscan", "-c", config.to_str().unwrap(), "info"]).unwrap();
    match Settings::load(&args) {
        Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "max-concurrent-distributions"),
        other => panic!("expected invalid value error, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_size_limit_from_config_applies() {
    let dir = TempDir::new().unwrap();
    let rules_arg = write_rules(dir.path()).display().to_string();
    let config = dir.path().join("distscan.toml");
    std::fs::write(&config, "log-level = \"off\"\nmax-artifact-bytes = 64\n").unwrap();

    let artifact = dir.path().join("demo-1.0-py3-none-any.whl");
    std::fs::write(&artifact, wheel(&[("demo/run.py", MALICIOUS_SETUP)])).unwrap();
    let artifact_arg = artifact.display().to_string();

    assert_eq!(
        run_with_config(
            &config,
            &["-r", &rules_arg, "scan-artifact", &artifact_arg, "-t", "bdist_wheel"]
        ),
        EXIT_ERROR
    );
    // The flag lifts the file's limit
    assert_eq!(
        run_with_config(
            &config,
            &["-r", &rules_arg, "-m", "1MiB", "scan-artifact", &artifact_arg, "-t", "bdist_wheel"]
        ),
        EXIT_FLAGGED
    );
}

#[test]
#[serial]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");
    assert_eq!(run_with_config(&missing, &["info"]), EXIT_ERROR);
}
