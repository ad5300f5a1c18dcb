//! Distribution fetching
//!
//! Artifacts are pulled from an [`ArtifactSource`] as a stream of chunks and
//! buffered under a hard byte limit. Neither the declared length nor the
//! stream itself is trusted: the limit is charged chunk by chunk and the fetch
//! aborts before storing the chunk that would cross it. There are no retries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::io::AsyncReadExt;

use crate::scanner::budget::ByteBudget;
use crate::scanner::error::{LimitStage, ScanError, ScanResult};
use crate::scanner::guard::ScanGuard;

/// Size of reads from local files and in-memory artifacts
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Default ceiling for both download and decompressed size
pub const DEFAULT_MAX_ARTIFACT_BYTES: u64 = 256 * 1024 * 1024;

/// Largest up-front allocation made on the strength of a declared length
const INITIAL_BUFFER_CAP: u64 = 1024 * 1024;

pub type ChunkStream = BoxStream<'static, ScanResult<Vec<u8>>>;

/// An opened artifact: an untrusted size hint plus its byte chunks
pub struct ArtifactStream {
    pub declared_len: Option<u64>,
    pub chunks: ChunkStream,
}

impl std::fmt::Debug for ArtifactStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStream")
            .field("declared_len", &self.declared_len)
            .finish_non_exhaustive()
    }
}

/// Where artifact bytes come from
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Start reading `url`. One attempt only.
    async fn open(&self, url: &str) -> ScanResult<ArtifactStream>;
}

/// HTTP(S) downloads via reqwest
#[derive(Debug, Clone)]
pub struct HttpArtifactSource {
    client: reqwest::Client,
}

impl HttpArtifactSource {
    pub fn new(timeout: Duration, user_agent: &str) -> ScanResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ScanError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

fn upstream_error(url: &str, err: &reqwest::Error) -> ScanError {
    ScanError::Upstream {
        url: url.to_string(),
        status: err.status().map(|s| s.as_u16()),
        message: err.to_string(),
    }
}

#[async_trait]
impl ArtifactSource for HttpArtifactSource {
    async fn open(&self, url: &str) -> ScanResult<ArtifactStream> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| upstream_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Upstream {
                url: url.to_string(),
                status: Some(status.as_u16()),
                message: status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string(),
            });
        }

        let declared_len = response.content_length();
        let url = url.to_string();
        let chunks = stream::try_unfold(response, move |mut response| {
            let url = url.clone();
            async move {
                match response.chunk().await {
                    Ok(Some(chunk)) => Ok(Some((chunk.to_vec(), response))),
                    Ok(None) => Ok(None),
                    Err(e) => Err(upstream_error(&url, &e)),
                }
            }
        })
        .boxed();

        Ok(ArtifactStream {
            declared_len,
            chunks,
        })
    }
}

/// Local files, addressed as `file://` URLs or plain paths
#[derive(Debug, Clone, Copy, Default)]
pub struct FileArtifactSource;

#[async_trait]
impl ArtifactSource for FileArtifactSource {
    async fn open(&self, url: &str) -> ScanResult<ArtifactStream> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        let unreadable = |e: std::io::Error| ScanError::Upstream {
            url: url.to_string(),
            status: None,
            message: e.to_string(),
        };

        let file = tokio::fs::File::open(path).await.map_err(unreadable)?;
        let metadata = file.metadata().await.map_err(unreadable)?;
        if !metadata.is_file() {
            return Err(ScanError::Upstream {
                url: url.to_string(),
                status: None,
                message: "not a regular file".to_string(),
            });
        }

        let chunks = stream::try_unfold(file, |mut file| async move {
            let mut buf = vec![0u8; READ_CHUNK_SIZE];
            let read = file.read(&mut buf).await.map_err(ScanError::from)?;
            if read == 0 {
                return Ok(None);
            }
            buf.truncate(read);
            Ok::<_, ScanError>(Some((buf, file)))
        })
        .boxed();

        Ok(ArtifactStream {
            declared_len: Some(metadata.len()),
            chunks,
        })
    }
}

/// Artifacts already held in memory, keyed by URL
#[derive(Debug, Clone)]
pub struct MemoryArtifactSource {
    artifacts: HashMap<String, MemoryArtifact>,
    chunk_size: usize,
}

#[derive(Debug, Clone)]
struct MemoryArtifact {
    bytes: Arc<Vec<u8>>,
    declared_len: Option<u64>,
}

impl MemoryArtifactSource {
    pub fn new() -> Self {
        Self {
            artifacts: HashMap::new(),
            chunk_size: READ_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Serve `bytes` at `url`, declaring their true length
    pub fn insert(&mut self, url: impl Into<String>, bytes: Vec<u8>) {
        let declared_len = Some(bytes.len() as u64);
        self.insert_with_declared_len(url, bytes, declared_len);
    }

    /// Serve `bytes` at `url` with an arbitrary (possibly false) declared length
    pub fn insert_with_declared_len(
        &mut self,
        url: impl Into<String>,
        bytes: Vec<u8>,
        declared_len: Option<u64>,
    ) {
        self.artifacts.insert(
            url.into(),
            MemoryArtifact {
                bytes: Arc::new(bytes),
                declared_len,
            },
        );
    }
}

impl Default for MemoryArtifactSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactSource for MemoryArtifactSource {
    async fn open(&self, url: &str) -> ScanResult<ArtifactStream> {
        let artifact = self
            .artifacts
            .get(url)
            .ok_or_else(|| ScanError::Upstream {
                url: url.to_string(),
                status: Some(404),
                message: "Not Found".to_string(),
            })?;

        let chunks: Vec<ScanResult<Vec<u8>>> = artifact
            .bytes
            .chunks(self.chunk_size)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect();

        Ok(ArtifactStream {
            declared_len: artifact.declared_len,
            chunks: stream::iter(chunks).boxed(),
        })
    }
}

/// Dispatches `http(s)://` URLs to the network and everything else to disk
#[derive(Debug, Clone)]
pub struct RoutedArtifactSource {
    http: HttpArtifactSource,
    file: FileArtifactSource,
}

impl RoutedArtifactSource {
    pub fn new(http: HttpArtifactSource) -> Self {
        Self {
            http,
            file: FileArtifactSource,
        }
    }
}

#[async_trait]
impl ArtifactSource for RoutedArtifactSource {
    async fn open(&self, url: &str) -> ScanResult<ArtifactStream> {
        if url.starts_with("http://") || url.starts_with("https://") {
            self.http.open(url).await
        } else {
            self.file.open(url).await
        }
    }
}

/// Last path segment of a URL, used to label errors and logs
pub fn artifact_label(url: &str) -> &str {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(url)
}

/// Downloads whole artifacts under a byte limit
#[derive(Clone)]
pub struct DistributionFetcher {
    source: Arc<dyn ArtifactSource>,
    max_bytes: u64,
}

impl DistributionFetcher {
    pub fn new(source: Arc<dyn ArtifactSource>, max_bytes: u64) -> Self {
        Self { source, max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Buffer the artifact at `url`, failing with `ArtifactTooLarge` as soon
    /// as the limit would be crossed
    pub async fn fetch(&self, url: &str, guard: &ScanGuard) -> ScanResult<Vec<u8>> {
        let artifact = artifact_label(url);
        let ArtifactStream {
            declared_len,
            mut chunks,
        } = guard.bounded(artifact, self.source.open(url)).await??;

        let mut budget = ByteBudget::new(self.max_bytes);
        if let Some(declared) = declared_len {
            if !budget.admits(declared) {
                log::warn!(
                    "Rejecting {}: declared length {} exceeds limit {}",
                    artifact,
                    declared,
                    self.max_bytes
                );
                return Err(ScanError::too_large(artifact, LimitStage::Fetch, self.max_bytes));
            }
        }

        let capacity = declared_len
            .unwrap_or(0)
            .min(self.max_bytes)
            .min(INITIAL_BUFFER_CAP);
        let mut buffer = Vec::with_capacity(capacity as usize);

        while let Some(chunk) = guard.bounded(artifact, chunks.next()).await? {
            let chunk = chunk?;
            if let Err(exceeded) = budget.charge(chunk.len()) {
                log::warn!(
                    "Aborting download of {}: {} bytes would exceed limit {}",
                    artifact,
                    exceeded.attempted,
                    exceeded.limit
                );
                return Err(ScanError::too_large(artifact, LimitStage::Fetch, exceeded.limit));
            }
            buffer.extend_from_slice(&chunk);
        }

        log::debug!("Fetched {} ({} bytes)", artifact, buffer.len());
        Ok(buffer)
    }
}

impl std::fmt::Debug for DistributionFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributionFetcher")
            .field("max_bytes", &self.max_bytes)
            .finish_non_exhaustive()
    }
}
