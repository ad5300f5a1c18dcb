//! Scanner API
//!
//! Public surface of the scanner for the CLI and for library users.

// Pipeline
pub use crate::scanner::analyzer::PackageAnalyzer;
pub use crate::scanner::archive::{extract, ArchiveKind, ExtractedFile, TarCompression};
pub use crate::scanner::content::scan_files;
pub use crate::scanner::fetch::{
    ArtifactSource, DistributionFetcher, FileArtifactSource, HttpArtifactSource,
    MemoryArtifactSource, RoutedArtifactSource,
};
pub use crate::scanner::service::ScanService;

// Configuration and request scope
pub use crate::scanner::config::ScanConfig;
pub use crate::scanner::guard::{ScanGuard, ScopeCancel};

// Error handling
pub use crate::scanner::error::{LimitStage, ScanError, ScanErrorKind, ScanResult};

// Report types
pub use crate::scanner::types::{
    DistributionDescriptor, DistributionScanResult, HighestScoreDistribution, MaliciousFile,
    PackageAnalysisResult, PackageRelease, PackageScanReport, PackageType, ServiceMetadata,
};
