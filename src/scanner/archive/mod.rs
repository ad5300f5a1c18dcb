//! Archive Readers
//!
//! Distributions are unpacked entirely in memory. The reader is chosen from
//! packaging metadata, never by sniffing content. Only regular files are
//! returned; every byte they decompress to is charged against one budget
//! shared by the whole archive, so the first entry that would cross the limit
//! aborts extraction and the partial result is dropped.

mod tar_reader;
mod zip_reader;

use std::fmt;
use std::io::{ErrorKind, Read};
use std::str::FromStr;

use crate::scanner::budget::ByteBudget;
use crate::scanner::error::{LimitStage, ScanError, ScanResult};
use crate::scanner::fetch::READ_CHUNK_SIZE;
use crate::scanner::guard::ScanGuard;
use crate::scanner::types::{DistributionDescriptor, PackageType};

pub use self::tar_reader::TarReader;
pub use self::zip_reader::ZipReader;

/// Largest buffer reserved up front from an entry's declared size
const ENTRY_PREALLOC_CAP: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarCompression {
    Plain,
    Gzip,
}

/// Closed set of supported container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Tar { compression: TarCompression },
    Zip,
}

impl ArchiveKind {
    /// Reader for a distribution of `package_type` named `filename`, if any
    pub fn for_distribution(package_type: PackageType, filename: &str) -> Option<Self> {
        match package_type {
            PackageType::Sdist => {
                let name = filename.to_ascii_lowercase();
                if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
                    Some(ArchiveKind::Tar {
                        compression: TarCompression::Gzip,
                    })
                } else if name.ends_with(".tar") {
                    Some(ArchiveKind::Tar {
                        compression: TarCompression::Plain,
                    })
                } else if name.ends_with(".zip") {
                    Some(ArchiveKind::Zip)
                } else {
                    None
                }
            }
            PackageType::BdistWheel | PackageType::BdistEgg => Some(ArchiveKind::Zip),
        }
    }

    /// Resolve a descriptor's raw package type and filename
    pub fn resolve(descriptor: &DistributionDescriptor) -> ScanResult<Self> {
        PackageType::from_str(&descriptor.package_type)
            .ok()
            .and_then(|package_type| Self::for_distribution(package_type, &descriptor.filename))
            .ok_or_else(|| ScanError::UnsupportedFormat {
                filename: descriptor.filename.clone(),
                package_type: descriptor.package_type.clone(),
            })
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveKind::Tar {
                compression: TarCompression::Gzip,
            } => write!(f, "tar.gz"),
            ArchiveKind::Tar {
                compression: TarCompression::Plain,
            } => write!(f, "tar"),
            ArchiveKind::Zip => write!(f, "zip"),
        }
    }
}

/// A regular file pulled out of an archive, decoded lossily as UTF-8
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    pub path: String,
    pub text: String,
}

/// What each archive format has to provide
pub trait ArchiveReader {
    /// Walk the archive in order and hand every regular file to `sink`
    fn read_entries(&self, bytes: &[u8], sink: &mut EntrySink<'_>) -> ScanResult<()>;
}

/// Collects entry contents under the archive-wide byte budget
pub struct EntrySink<'a> {
    artifact: &'a str,
    guard: &'a ScanGuard,
    budget: ByteBudget,
    files: Vec<ExtractedFile>,
}

impl<'a> EntrySink<'a> {
    pub fn new(artifact: &'a str, limit: u64, guard: &'a ScanGuard) -> Self {
        Self {
            artifact,
            guard,
            budget: ByteBudget::new(limit),
            files: Vec::new(),
        }
    }

    pub fn artifact(&self) -> &str {
        self.artifact
    }

    pub fn limit(&self) -> u64 {
        self.budget.limit()
    }

    fn too_large(&self) -> ScanError {
        ScanError::too_large(self.artifact, LimitStage::Extraction, self.budget.limit())
    }

    /// Reject an entry up front when its declared size cannot fit
    pub fn admit(&self, declared: u64) -> ScanResult<()> {
        if self.budget.admits(declared) {
            Ok(())
        } else {
            Err(self.too_large())
        }
    }

    /// Read one entry chunk by chunk, charging each chunk before keeping it
    pub fn read_entry<R: Read>(
        &mut self,
        path: String,
        declared: u64,
        reader: &mut R,
    ) -> ScanResult<()> {
        let reserve = declared
            .min(self.budget.remaining())
            .min(ENTRY_PREALLOC_CAP);
        let mut content = Vec::with_capacity(reserve as usize);
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];

        loop {
            self.guard.check(self.artifact)?;
            let read = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(read) => read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ScanError::malformed(self.artifact, e)),
            };
            if self.budget.charge(read).is_err() {
                log::warn!(
                    "Extraction of {} stopped at {}: decompressed size exceeds {} bytes",
                    self.artifact,
                    path,
                    self.budget.limit()
                );
                return Err(self.too_large());
            }
            content.extend_from_slice(&chunk[..read]);
        }

        self.files.push(ExtractedFile {
            path,
            text: String::from_utf8_lossy(&content).into_owned(),
        });
        Ok(())
    }

    pub fn consumed(&self) -> u64 {
        self.budget.consumed()
    }

    pub fn into_files(self) -> Vec<ExtractedFile> {
        self.files
    }
}

/// Unpack every regular file of `bytes` as `kind`
pub fn extract(
    kind: ArchiveKind,
    bytes: &[u8],
    artifact: &str,
    limit: u64,
    guard: &ScanGuard,
) -> ScanResult<Vec<ExtractedFile>> {
    let mut sink = EntrySink::new(artifact, limit, guard);
    match kind {
        ArchiveKind::Tar { compression } => TarReader::new(compression).read_entries(bytes, &mut sink)?,
        ArchiveKind::Zip => ZipReader.read_entries(bytes, &mut sink)?,
    }

    log::debug!(
        "Extracted {} ({}): {} bytes decompressed",
        artifact,
        kind,
        sink.consumed()
    );
    Ok(sink.into_files())
}
