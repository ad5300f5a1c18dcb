//! CLI Integration Test Modules

pub mod exit_codes;
pub mod toml_config;

use std::path::{Path, PathBuf};

/// Empty configuration file so the user's own settings never leak in
pub fn empty_config(dir: &Path) -> PathBuf {
    let path = dir.join("distscan.toml");
    std::fs::write(&path, "log-level = \"off\"\n").unwrap();
    path
}

/// `distscan -c <config> <args...>`
pub fn run_with_config(config: &Path, args: &[&str]) -> i32 {
    let mut argv = vec![
        "distscan".to_string(),
        "-c".to_string(),
        config.display().to_string(),
    ];
    argv.extend(args.iter().map(|a| a.to_string()));
    distscan::app::startup::run(argv)
}
