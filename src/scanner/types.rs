//! Scanner Types
//!
//! Inputs handed over by the package metadata resolver and the report
//! structures produced by a scan. All scores are sums of rule weights.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Packaging type as published by the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum PackageType {
    #[strum(serialize = "sdist")]
    #[serde(rename = "sdist")]
    Sdist,
    #[strum(serialize = "bdist_wheel")]
    #[serde(rename = "bdist_wheel")]
    BdistWheel,
    #[strum(serialize = "bdist_egg")]
    #[serde(rename = "bdist_egg")]
    BdistEgg,
}

/// One downloadable artifact of a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionDescriptor {
    pub url: String,
    /// Raw packaging type; parsed into [`PackageType`] when the scan starts
    pub package_type: String,
    pub filename: String,
    /// Prefix of the web inspector view for this artifact
    pub inspector_link: String,
}

/// Release metadata as returned by the package metadata resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRelease {
    pub name: String,
    pub version: String,
    pub canonical_link: String,
    #[serde(default)]
    pub distributions: Vec<DistributionDescriptor>,
}

/// A file with at least one retained rule match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaliciousFile {
    /// Archive-relative path
    pub path: String,
    /// Rule namespace -> weight
    pub rules: BTreeMap<String, u32>,
}

impl MaliciousFile {
    pub fn score(&self) -> u64 {
        self.rules.values().map(|w| u64::from(*w)).sum()
    }
}

/// Merge rule maps keeping the highest weight seen for each namespace.
/// The result does not depend on iteration order.
pub fn merge_max_wins<'a, I>(maps: I) -> BTreeMap<String, u32>
where
    I: IntoIterator<Item = &'a BTreeMap<String, u32>>,
{
    let mut merged: BTreeMap<String, u32> = BTreeMap::new();
    for map in maps {
        for (namespace, weight) in map {
            merged
                .entry(namespace.clone())
                .and_modify(|current| *current = (*current).max(*weight))
                .or_insert(*weight);
        }
    }
    merged
}

fn total(rules: &BTreeMap<String, u32>) -> u64 {
    rules.values().map(|w| u64::from(*w)).sum()
}

/// Outcome of scanning one archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageAnalysisResult {
    /// Files in archive enumeration order
    pub malicious_files: Vec<MaliciousFile>,
    /// Max-wins merge of every file's rules
    pub matched_rules: BTreeMap<String, u32>,
    pub score: u64,
}

impl PackageAnalysisResult {
    pub fn new(malicious_files: Vec<MaliciousFile>) -> Self {
        let matched_rules = merge_max_wins(malicious_files.iter().map(|f| &f.rules));
        let score = total(&matched_rules);
        Self {
            malicious_files,
            matched_rules,
            score,
        }
    }

    /// Highest scoring file; the earliest one wins a tie
    pub fn most_malicious_file(&self) -> Option<&MaliciousFile> {
        let mut best: Option<&MaliciousFile> = None;
        for file in &self.malicious_files {
            if best.map_or(true, |b| file.score() > b.score()) {
                best = Some(file);
            }
        }
        best
    }
}

impl Default for PackageAnalysisResult {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Result for one distribution of a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionScanResult {
    pub filename: String,
    pub inspector_link: String,
    /// Hex SHA-256 of the fetched artifact
    pub sha256: String,
    /// Regular files extracted from the archive
    pub files_scanned: usize,
    pub analysis: PackageAnalysisResult,
}

impl DistributionScanResult {
    pub fn score(&self) -> u64 {
        self.analysis.score
    }
}

/// Summary of the distribution that scored highest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighestScoreDistribution {
    pub distribution: String,
    pub score: u64,
    /// Matched rule namespaces, sorted
    pub matches: Vec<String>,
    pub most_malicious_file: String,
    /// Inspector link pointing at the most malicious file
    pub inspector_link: String,
}

/// Full report for one package release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageScanReport {
    pub name: String,
    pub version: String,
    pub canonical_link: String,
    pub rules_version: String,
    pub scanned_at: DateTime<Utc>,
    /// In the order the release listed them
    pub distributions: Vec<DistributionScanResult>,
    /// Absent when no distribution scored above zero
    pub highest_score_distribution: Option<HighestScoreDistribution>,
}

impl PackageScanReport {
    pub fn build(
        release: &PackageRelease,
        rules_version: &str,
        distributions: Vec<DistributionScanResult>,
    ) -> Self {
        let highest_score_distribution = select_highest(&distributions);
        Self {
            name: release.name.clone(),
            version: release.version.clone(),
            canonical_link: release.canonical_link.clone(),
            rules_version: rules_version.to_string(),
            scanned_at: Utc::now(),
            distributions,
            highest_score_distribution,
        }
    }

    /// Max-wins merge over every distribution of the release
    pub fn combined_rules(&self) -> BTreeMap<String, u32> {
        merge_max_wins(self.distributions.iter().map(|d| &d.analysis.matched_rules))
    }

    pub fn combined_score(&self) -> u64 {
        total(&self.combined_rules())
    }

    pub fn is_flagged(&self) -> bool {
        self.highest_score_distribution.is_some()
    }
}

/// First distribution with the maximum score, if that score is positive
fn select_highest(distributions: &[DistributionScanResult]) -> Option<HighestScoreDistribution> {
    let mut best: Option<&DistributionScanResult> = None;
    for distribution in distributions {
        if best.map_or(true, |b| distribution.score() > b.score()) {
            best = Some(distribution);
        }
    }

    let best = best.filter(|d| d.score() > 0)?;
    let file = best.analysis.most_malicious_file()?;
    Some(HighestScoreDistribution {
        distribution: best.filename.clone(),
        score: best.score(),
        matches: best.analysis.matched_rules.keys().cloned().collect(),
        most_malicious_file: file.path.clone(),
        inspector_link: format!(
            "{}/{}",
            best.inspector_link.trim_end_matches('/'),
            file.path
        ),
    })
}

/// Identity of the running scanner and its rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    pub version: String,
    pub server_commit: String,
    pub rules_commit: String,
}
