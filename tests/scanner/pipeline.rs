//! Release scans over in-memory artifacts

use std::sync::Arc;

use distscan::rules::RuleLocation;
use distscan::scanner::api::*;
use tempfile::TempDir;

use crate::common::fixtures::*;

const SDIST_URL: &str = "https://files.example.org/demo-1.0.tar.gz";
const WHEEL_URL: &str = "https://files.example.org/demo-1.0-py3-none-any.whl";

fn service(source: MemoryArtifactSource, rules_dir: &TempDir) -> ScanService {
    let config = ScanConfig::default();
    let analyzer = PackageAnalyzer::new(Arc::new(source), &config);
    let location = RuleLocation::from_path(write_rules(rules_dir.path()));
    ScanService::with_rule_location(analyzer, location, Some("it-rules".to_string())).unwrap()
}

#[tokio::test]
async fn test_flagged_sdist_and_clean_wheel() {
    let mut source = MemoryArtifactSource::new();
    source.insert(
        SDIST_URL,
        sdist(
            "demo-1.0",
            &[("setup.py", MALICIOUS_SETUP), ("demo/__init__.py", CLEAN_MODULE)],
        ),
    );
    source.insert(WHEEL_URL, wheel(&[("demo/__init__.py", CLEAN_MODULE)]));

    let dir = TempDir::new().unwrap();
    let service = service(source, &dir);
    let report = service
        .scan(&release(vec![
            descriptor(WHEEL_URL, "bdist_wheel", "demo-1.0-py3-none-any.whl"),
            descriptor(SDIST_URL, "sdist", "demo-1.0.tar.gz"),
        ]))
        .await
        .unwrap();

    assert_eq!(report.rules_version, "it-rules");
    assert_eq!(report.distributions.len(), 2);
    assert_eq!(report.distributions[0].filename, "demo-1.0-py3-none-any.whl");
    assert_eq!(report.distributions[0].score(), 0);
    assert_eq!(report.distributions[1].score(), 10);
    assert_eq!(report.distributions[1].files_scanned, 2);
    assert_eq!(report.distributions[1].sha256.len(), 64);

    let highest = report.highest_score_distribution.as_ref().unwrap();
    assert_eq!(highest.distribution, "demo-1.0.tar.gz");
    assert_eq!(highest.score, 10);
    assert_eq!(highest.matches, vec!["obfuscation", "process_spawn"]);
    assert_eq!(highest.most_malicious_file, "demo-1.0/setup.py");
    assert_eq!(
        highest.inspector_link,
        "https://inspector.example.org/project/demo/1.0/demo-1.0.tar.gz/demo-1.0/setup.py"
    );
    assert!(report.is_flagged());
    assert_eq!(report.combined_score(), 10);
}

#[tokio::test]
async fn test_clean_release_has_no_highest() {
    let mut source = MemoryArtifactSource::new();
    source.insert(WHEEL_URL, wheel(&[("demo/__init__.py", CLEAN_MODULE)]));

    let dir = TempDir::new().unwrap();
    let report = service(source, &dir)
        .scan(&release(vec![descriptor(
            WHEEL_URL,
            "bdist_wheel",
            "demo-1.0-py3-none-any.whl",
        )]))
        .await
        .unwrap();

    assert!(report.highest_score_distribution.is_none());
    assert!(!report.is_flagged());
}

#[tokio::test]
async fn test_filetype_filter_limits_weight() {
    // process_spawn only applies to *.py, so a shell script scores 3
    let mut source = MemoryArtifactSource::new();
    source.insert(WHEEL_URL, wheel(&[("demo/install.sh", MALICIOUS_SETUP)]));

    let dir = TempDir::new().unwrap();
    let result = service(source, &dir)
        .scan_artifact(&descriptor(WHEEL_URL, "bdist_wheel", "demo-1.0-py3-none-any.whl"))
        .await
        .unwrap();

    assert_eq!(result.score(), 3);
    assert_eq!(
        result.analysis.malicious_files[0].rules.keys().collect::<Vec<_>>(),
        vec!["obfuscation"]
    );
}

#[tokio::test]
async fn test_empty_release_rejected() {
    let dir = TempDir::new().unwrap();
    let err = service(MemoryArtifactSource::new(), &dir)
        .scan(&release(Vec::new()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ScanErrorKind::EmptyDistributionSet);
}

#[tokio::test]
async fn test_unsupported_format_fails_release() {
    let mut source = MemoryArtifactSource::new();
    source.insert(WHEEL_URL, wheel(&[("demo/__init__.py", CLEAN_MODULE)]));

    let dir = TempDir::new().unwrap();
    let err = service(source, &dir)
        .scan(&release(vec![
            descriptor(WHEEL_URL, "bdist_wheel", "demo-1.0-py3-none-any.whl"),
            descriptor("https://files.example.org/demo.exe", "bdist_wininst", "demo.exe"),
        ]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ScanErrorKind::UnsupportedFormat);
}

#[tokio::test]
async fn test_oversized_artifact_rejected() {
    let mut source = MemoryArtifactSource::new();
    source.insert(WHEEL_URL, vec![0u8; 8192]);

    let config = ScanConfig {
        max_artifact_bytes: 4096,
        ..ScanConfig::default()
    };
    let analyzer = PackageAnalyzer::new(Arc::new(source), &config);
    let service = ScanService::new(analyzer, distscan::rules::RuleSet::empty());

    let err = service
        .scan_artifact(&descriptor(WHEEL_URL, "bdist_wheel", "demo-1.0-py3-none-any.whl"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ScanErrorKind::ResourceLimitExceeded);
}

#[tokio::test]
async fn test_missing_artifact_is_upstream_error() {
    let dir = TempDir::new().unwrap();
    let err = service(MemoryArtifactSource::new(), &dir)
        .scan_artifact(&descriptor(SDIST_URL, "sdist", "demo-1.0.tar.gz"))
        .await
        .unwrap_err();
    match err {
        ScanError::Upstream { status, .. } => assert_eq!(status, Some(404)),
        other => panic!("expected upstream error, got {:?}", other),
    }
}
