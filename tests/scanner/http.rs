//! Downloads over HTTP against a local mock server

use distscan::rules::RuleLocation;
use distscan::scanner::api::*;
use httpmock::prelude::*;
use tempfile::TempDir;

use crate::common::fixtures::*;

fn http_service(rules_dir: &TempDir) -> ScanService {
    let analyzer = PackageAnalyzer::from_config(&ScanConfig::default()).unwrap();
    let location = RuleLocation::from_path(write_rules(rules_dir.path()));
    ScanService::with_rule_location(analyzer, location, None).unwrap()
}

#[tokio::test]
async fn test_release_scan_over_http() {
    let server = MockServer::start_async().await;
    let sdist_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/packages/demo-1.0.tar.gz");
            then.status(200)
                .body(sdist("demo-1.0", &[("setup.py", MALICIOUS_SETUP)]));
        })
        .await;
    let wheel_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/packages/demo-1.0-py3-none-any.whl");
            then.status(200)
                .body(wheel(&[("demo/__init__.py", CLEAN_MODULE)]));
        })
        .await;

    let dir = TempDir::new().unwrap();
    let report = http_service(&dir)
        .scan(&release(vec![
            descriptor(
                &server.url("/packages/demo-1.0.tar.gz"),
                "sdist",
                "demo-1.0.tar.gz",
            ),
            descriptor(
                &server.url("/packages/demo-1.0-py3-none-any.whl"),
                "bdist_wheel",
                "demo-1.0-py3-none-any.whl",
            ),
        ]))
        .await
        .unwrap();

    sdist_mock.assert_async().await;
    wheel_mock.assert_async().await;
    assert!(report.rules_version.starts_with("sha256:"));
    assert_eq!(report.distributions[0].score(), 10);
    assert_eq!(report.distributions[1].score(), 0);
    assert_eq!(
        report.highest_score_distribution.unwrap().distribution,
        "demo-1.0.tar.gz"
    );
}

#[tokio::test]
async fn test_http_error_status_is_upstream() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/packages/gone.whl");
            then.status(410);
        })
        .await;

    let dir = TempDir::new().unwrap();
    let err = http_service(&dir)
        .scan_artifact(&descriptor(
            &server.url("/packages/gone.whl"),
            "bdist_wheel",
            "gone.whl",
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ScanErrorKind::Upstream);
    match err {
        ScanError::Upstream { status, .. } => assert_eq!(status, Some(410)),
        other => panic!("expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_local_file_source() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("demo-1.0-py3-none-any.whl");
    std::fs::write(&path, wheel(&[("demo/run.py", MALICIOUS_SETUP)])).unwrap();

    let result = http_service(&dir)
        .scan_artifact(&descriptor(
            &format!("file://{}", path.display()),
            "bdist_wheel",
            "demo-1.0-py3-none-any.whl",
        ))
        .await
        .unwrap();
    assert_eq!(result.score(), 10);
}
