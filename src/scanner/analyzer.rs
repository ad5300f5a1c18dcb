//! Package analysis
//!
//! Drives fetch, extraction and matching for each distribution of a release
//! and assembles the package report. Any failure aborts the whole release:
//! archive kinds are resolved before the first download so an unsupported
//! distribution costs no traffic, and the first fetch or extraction error
//! drops every in-flight distribution.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use sha2::{Digest, Sha256};

use crate::rules::RuleSet;
use crate::scanner::archive::{self, ArchiveKind};
use crate::scanner::config::ScanConfig;
use crate::scanner::content;
use crate::scanner::error::{ScanError, ScanResult};
use crate::scanner::fetch::{
    ArtifactSource, DistributionFetcher, HttpArtifactSource, RoutedArtifactSource,
};
use crate::scanner::guard::ScanGuard;
use crate::scanner::types::{
    DistributionDescriptor, DistributionScanResult, PackageRelease, PackageScanReport,
};

#[derive(Debug, Clone)]
pub struct PackageAnalyzer {
    fetcher: DistributionFetcher,
    concurrency: usize,
}

impl PackageAnalyzer {
    pub fn new(source: Arc<dyn ArtifactSource>, config: &ScanConfig) -> Self {
        Self {
            fetcher: DistributionFetcher::new(source, config.max_artifact_bytes),
            concurrency: config.max_concurrent_distributions.max(1),
        }
    }

    /// Analyzer reading `http(s)://` URLs from the network and anything else from disk
    pub fn from_config(config: &ScanConfig) -> ScanResult<Self> {
        let http = HttpArtifactSource::new(config.http_timeout, &config.user_agent)?;
        Ok(Self::new(Arc::new(RoutedArtifactSource::new(http)), config))
    }

    pub fn max_artifact_bytes(&self) -> u64 {
        self.fetcher.max_bytes()
    }

    /// Scan a single distribution
    pub async fn scan_distribution(
        &self,
        descriptor: &DistributionDescriptor,
        rules: Arc<RuleSet>,
        guard: &ScanGuard,
    ) -> ScanResult<DistributionScanResult> {
        let kind = ArchiveKind::resolve(descriptor)?;
        self.scan_resolved(descriptor, kind, rules, guard).await
    }

    /// Scan every distribution of `release` with one rule set snapshot
    pub async fn scan_release(
        &self,
        release: &PackageRelease,
        rules: Arc<RuleSet>,
        guard: &ScanGuard,
    ) -> ScanResult<PackageScanReport> {
        if release.distributions.is_empty() {
            return Err(ScanError::NoDistributions {
                package: release.name.clone(),
                version: release.version.clone(),
            });
        }

        let plan = release
            .distributions
            .iter()
            .map(|descriptor| ArchiveKind::resolve(descriptor).map(|kind| (descriptor, kind)))
            .collect::<ScanResult<Vec<_>>>()?;

        log::info!(
            "Scanning {} {} ({} distributions, rules {})",
            release.name,
            release.version,
            plan.len(),
            rules.version()
        );

        // Dropped on return, stopping extractions of distributions still in flight
        let (scope, _cancel_on_exit) = guard.scoped();
        let distributions: Vec<DistributionScanResult> = stream::iter(plan)
            .map(|(descriptor, kind)| self.scan_resolved(descriptor, kind, Arc::clone(&rules), &scope))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let report = PackageScanReport::build(release, rules.version(), distributions);
        log::info!(
            "Scanned {} {}: highest score {}",
            report.name,
            report.version,
            report
                .highest_score_distribution
                .as_ref()
                .map_or(0, |h| h.score)
        );
        Ok(report)
    }

    async fn scan_resolved(
        &self,
        descriptor: &DistributionDescriptor,
        kind: ArchiveKind,
        rules: Arc<RuleSet>,
        guard: &ScanGuard,
    ) -> ScanResult<DistributionScanResult> {
        let bytes = self.fetcher.fetch(&descriptor.url, guard).await?;
        let sha256 = format!("{:x}", Sha256::digest(&bytes));

        let filename = descriptor.filename.clone();
        let limit = self.fetcher.max_bytes();
        let worker_guard = guard.clone();
        let (files_scanned, analysis) = tokio::task::spawn_blocking(move || {
            let files = archive::extract(kind, &bytes, &filename, limit, &worker_guard)?;
            Ok::<_, ScanError>((files.len(), content::scan_files(&rules, &files)))
        })
        .await??;

        log::info!(
            "Scanned {}: {} files, {} flagged, score {}",
            descriptor.filename,
            files_scanned,
            analysis.malicious_files.len(),
            analysis.score
        );

        Ok(DistributionScanResult {
            filename: descriptor.filename.clone(),
            inspector_link: descriptor.inspector_link.clone(),
            sha256,
            files_scanned,
            analysis,
        })
    }
}
