//! Scanner Error Types

use strum_macros::Display;

/// Pipeline stage that tripped a byte limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LimitStage {
    Fetch,
    Extraction,
}

/// Classification of a scan failure, independent of its details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ScanErrorKind {
    ResourceLimitExceeded,
    Upstream,
    UnsupportedFormat,
    EmptyDistributionSet,
    MalformedArchive,
    Cancelled,
    Internal,
}

/// Scanner error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScanError {
    /// Artifact or its decompressed content is larger than the byte limit
    #[error("Artifact too large: {artifact} exceeded the {limit} byte limit during {stage}")]
    ArtifactTooLarge {
        artifact: String,
        stage: LimitStage,
        limit: u64,
    },

    /// Remote source failed or answered with a non-success status
    #[error("Upstream responded with '{message}'")]
    Upstream {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// Package type or filename has no archive reader
    #[error("Unsupported distribution '{filename}' (package type '{package_type}')")]
    UnsupportedFormat {
        filename: String,
        package_type: String,
    },

    /// The release lists no distributions at all
    #[error("No distributions available for {package} {version}")]
    NoDistributions { package: String, version: String },

    /// Archive structure could not be read
    #[error("Malformed archive '{artifact}': {message}")]
    MalformedArchive { artifact: String, message: String },

    #[error("Scan of '{artifact}' was cancelled")]
    Cancelled { artifact: String },

    #[error("Scan deadline exceeded while processing '{artifact}'")]
    DeadlineExceeded { artifact: String },

    /// Local IO or task failure
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ScanError {
    pub fn kind(&self) -> ScanErrorKind {
        match self {
            ScanError::ArtifactTooLarge { .. } => ScanErrorKind::ResourceLimitExceeded,
            ScanError::Upstream { .. } => ScanErrorKind::Upstream,
            ScanError::UnsupportedFormat { .. } => ScanErrorKind::UnsupportedFormat,
            ScanError::NoDistributions { .. } => ScanErrorKind::EmptyDistributionSet,
            ScanError::MalformedArchive { .. } => ScanErrorKind::MalformedArchive,
            ScanError::Cancelled { .. } | ScanError::DeadlineExceeded { .. } => {
                ScanErrorKind::Cancelled
            }
            ScanError::Internal { .. } => ScanErrorKind::Internal,
        }
    }

    pub fn is_too_large(&self) -> bool {
        self.kind() == ScanErrorKind::ResourceLimitExceeded
    }

    pub(crate) fn too_large(artifact: &str, stage: LimitStage, limit: u64) -> Self {
        ScanError::ArtifactTooLarge {
            artifact: artifact.to_string(),
            stage,
            limit,
        }
    }

    pub(crate) fn malformed(artifact: &str, cause: impl std::fmt::Display) -> Self {
        ScanError::MalformedArchive {
            artifact: artifact.to_string(),
            message: cause.to_string(),
        }
    }
}

impl crate::core::error_handling::ContextualError for ScanError {
    fn is_user_actionable(&self) -> bool {
        !matches!(self, ScanError::Internal { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ScanError::Upstream { message, .. } | ScanError::MalformedArchive { message, .. } => {
                Some(message)
            }
            ScanError::ArtifactTooLarge { artifact, .. }
            | ScanError::Cancelled { artifact }
            | ScanError::DeadlineExceeded { artifact } => Some(artifact),
            ScanError::UnsupportedFormat { filename, .. } => Some(filename),
            ScanError::NoDistributions { package, .. } => Some(package),
            ScanError::Internal { .. } => None,
        }
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        ScanError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for ScanError {
    fn from(err: tokio::task::JoinError) -> Self {
        ScanError::Internal {
            message: format!("scan worker failed: {}", err),
        }
    }
}

pub type ScanResult<T> = Result<T, ScanError>;
