//! Scan service facade
//!
//! Owns the rule store and the analyzer. Each request takes one rule set
//! snapshot and keeps it for its whole duration, so a concurrent reload never
//! mixes rule versions inside one report.

use std::sync::Arc;
use std::time::Duration;

use crate::core::shutdown::CancellationFlag;
use crate::core::version::{crate_version, git_hash};
use crate::rules::{load_rule_set, RuleError, RuleLocation, RuleResult, RuleSet, RuleStore};
use crate::scanner::analyzer::PackageAnalyzer;
use crate::scanner::error::ScanResult;
use crate::scanner::guard::ScanGuard;
use crate::scanner::types::{
    DistributionDescriptor, DistributionScanResult, PackageRelease, PackageScanReport,
    ServiceMetadata,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct RuleOrigin {
    location: RuleLocation,
    version: Option<String>,
}

#[derive(Debug)]
pub struct ScanService {
    analyzer: PackageAnalyzer,
    store: RuleStore,
    origin: Option<RuleOrigin>,
    cancellation: CancellationFlag,
    deadline: Option<Duration>,
}

impl ScanService {
    pub fn new(analyzer: PackageAnalyzer, rules: RuleSet) -> Self {
        Self {
            analyzer,
            store: RuleStore::new(rules),
            origin: None,
            cancellation: CancellationFlag::new(),
            deadline: None,
        }
    }

    /// Load rules from `location` and remember it for later reloads
    pub fn with_rule_location(
        analyzer: PackageAnalyzer,
        location: RuleLocation,
        version: Option<String>,
    ) -> RuleResult<Self> {
        let rules = load_rule_set(&location, version.as_deref(), analyzer.max_artifact_bytes())?;
        let mut service = Self::new(analyzer, rules);
        service.origin = Some(RuleOrigin { location, version });
        Ok(service)
    }

    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    fn guard(&self) -> ScanGuard {
        ScanGuard::new(self.cancellation.clone(), self.deadline)
    }

    pub fn rules(&self) -> Arc<RuleSet> {
        self.store.current()
    }

    pub fn metadata(&self) -> ServiceMetadata {
        ServiceMetadata {
            version: crate_version().to_string(),
            server_commit: git_hash().to_string(),
            rules_commit: self.store.version(),
        }
    }

    /// Scan every distribution of a release
    pub async fn scan(&self, release: &PackageRelease) -> ScanResult<PackageScanReport> {
        let rules = self.store.current();
        self.analyzer.scan_release(release, rules, &self.guard()).await
    }

    /// Scan one distribution on its own
    pub async fn scan_artifact(
        &self,
        descriptor: &DistributionDescriptor,
    ) -> ScanResult<DistributionScanResult> {
        let rules = self.store.current();
        self.analyzer
            .scan_distribution(descriptor, rules, &self.guard())
            .await
    }

    /// Re-read the configured rule location and swap in the result.
    /// On any error the installed rules stay as they were.
    pub fn reload_rules(&self) -> RuleResult<Arc<RuleSet>> {
        let origin = self.origin.as_ref().ok_or_else(|| RuleError::Io {
            path: "-".to_string(),
            message: "no rule location configured".to_string(),
        })?;

        let next = load_rule_set(
            &origin.location,
            origin.version.as_deref(),
            self.analyzer.max_artifact_bytes(),
        )
        .map_err(|e| {
            log::warn!("Rule reload from {} failed: {}", origin.location, e);
            e
        })?;
        self.store.replace(next);
        Ok(self.store.current())
    }
}
