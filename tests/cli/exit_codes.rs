//! Exit codes of each command

use distscan::app::startup::{run, EXIT_ERROR, EXIT_FLAGGED, EXIT_OK};
use serial_test::serial;
use tempfile::TempDir;

use super::{empty_config, run_with_config};
use crate::common::fixtures::*;

#[test]
#[serial]
fn test_help_and_version_succeed() {
    assert_eq!(run(["distscan", "--help"]), EXIT_OK);
    assert_eq!(run(["distscan", "--version"]), EXIT_OK);
}

#[test]
#[serial]
fn test_usage_errors_fail() {
    assert_eq!(run(["distscan", "frobnicate"]), EXIT_ERROR);
    assert_eq!(run(["distscan", "scan"]), EXIT_ERROR);
    assert_eq!(run(["distscan", "-j", "0", "info"]), EXIT_ERROR);
}

#[test]
#[serial]
fn test_scan_artifact_flagged_and_clean() {
    let dir = TempDir::new().unwrap();
    let config = empty_config(dir.path());
    let rules = write_rules(dir.path());

    let bad = dir.path().join("bad-1.0-py3-none-any.whl");
    std::fs::write(&bad, wheel(&[("bad/run.py", MALICIOUS_SETUP)])).unwrap();
    let good = dir.path().join("good-1.0-py3-none-any.whl");
    std::fs::write(&good, wheel(&[("good/__init__.py", CLEAN_MODULE)])).unwrap();

    let rules_arg = rules.display().to_string();
    let bad_arg = bad.display().to_string();
    let good_arg = good.display().to_string();

    assert_eq!(
        run_with_config(
            &config,
            &["-r", &rules_arg, "scan-artifact", &bad_arg, "-t", "bdist_wheel"]
        ),
        EXIT_FLAGGED
    );
    assert_eq!(
        run_with_config(
            &config,
            &["-r", &rules_arg, "--format", "json", "scan-artifact", &good_arg, "-t", "bdist_wheel"]
        ),
        EXIT_OK
    );
}

#[test]
#[serial]
fn test_scan_release_file() {
    let dir = TempDir::new().unwrap();
    let config = empty_config(dir.path());
    let rules = write_rules(dir.path());

    let sdist_path = dir.path().join("demo-1.0.tar.gz");
    std::fs::write(&sdist_path, sdist("demo-1.0", &[("setup.py", MALICIOUS_SETUP)])).unwrap();
    let release_json = serde_json::to_string(&release(vec![descriptor(
        &format!("file://{}", sdist_path.display()),
        "sdist",
        "demo-1.0.tar.gz",
    )]))
    .unwrap();
    let release_path = dir.path().join("release.json");
    std::fs::write(&release_path, release_json).unwrap();

    let rules_arg = rules.display().to_string();
    let release_arg = release_path.display().to_string();
    assert_eq!(
        run_with_config(&config, &["-r", &rules_arg, "scan", &release_arg]),
        EXIT_FLAGGED
    );
}

#[test]
#[serial]
fn test_scan_failures_exit_with_error() {
    let dir = TempDir::new().unwrap();
    let config = empty_config(dir.path());
    let rules_arg = write_rules(dir.path()).display().to_string();

    let missing_release = dir.path().join("absent.json").display().to_string();
    assert_eq!(
        run_with_config(&config, &["-r", &rules_arg, "scan", &missing_release]),
        EXIT_ERROR
    );

    let missing_artifact = dir.path().join("absent.whl").display().to_string();
    assert_eq!(
        run_with_config(
            &config,
            &["-r", &rules_arg, "--format", "json", "scan-artifact", &missing_artifact, "-t", "bdist_wheel"]
        ),
        EXIT_ERROR
    );

    let exe = dir.path().join("demo.exe");
    std::fs::write(&exe, b"MZ").unwrap();
    let exe_arg = exe.display().to_string();
    assert_eq!(
        run_with_config(
            &config,
            &["-r", &rules_arg, "scan-artifact", &exe_arg, "-t", "bdist_wininst"]
        ),
        EXIT_ERROR
    );
}

#[test]
#[serial]
fn test_rules_and_info() {
    let dir = TempDir::new().unwrap();
    let config = empty_config(dir.path());
    let rules_arg = write_rules(dir.path()).display().to_string();

    assert_eq!(run_with_config(&config, &["-r", &rules_arg, "rules"]), EXIT_OK);
    assert_eq!(
        run_with_config(&config, &["-r", &rules_arg, "--format", "json", "info"]),
        EXIT_OK
    );

    std::fs::write(dir.path().join("rules").join("broken.toml"), "[[rule]]\nweight = 2\n").unwrap();
    assert_eq!(run_with_config(&config, &["-r", &rules_arg, "rules"]), EXIT_ERROR);
}
