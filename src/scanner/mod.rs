//! Scanner Component
//!
//! The package scanning pipeline. For every distribution of a release:
//!
//! - **DistributionFetcher**: downloads the artifact under a hard byte limit
//! - **ArchiveReader**: extracts regular files (tar, tar.gz or zip) under the same limit
//! - **ContentScanner**: matches file contents against the current rule set
//! - **PackageAnalyzer**: merges per-file matches into scores and picks the
//!   highest scoring distribution for the report
//!
//! [`ScanService`](service::ScanService) ties the pipeline to the rule store.

pub mod analyzer;
pub mod api;
pub mod archive;
pub mod budget;
pub mod config;
pub mod content;
pub mod error;
pub mod fetch;
pub mod guard;
pub mod service;
pub mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use error::{ScanError, ScanErrorKind, ScanResult};
