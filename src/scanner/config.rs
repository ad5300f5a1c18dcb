//! Scanner tuning knobs

use std::time::Duration;

use crate::core::version::crate_version;
use crate::scanner::fetch::DEFAULT_MAX_ARTIFACT_BYTES;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Ceiling for both the download and the decompressed archive content
    pub max_artifact_bytes: u64,
    pub http_timeout: Duration,
    /// Wall clock limit for one scan request
    pub scan_deadline: Option<Duration>,
    /// Distributions of one release processed at the same time
    pub max_concurrent_distributions: usize,
    pub user_agent: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_artifact_bytes: DEFAULT_MAX_ARTIFACT_BYTES,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            scan_deadline: None,
            max_concurrent_distributions: 1,
            user_agent: default_user_agent(),
        }
    }
}

pub fn default_user_agent() -> String {
    format!("distscan/{}", crate_version())
}
