use std::io::Cursor;

use zip::ZipArchive;

use super::{ArchiveReader, EntrySink};
use crate::scanner::error::{ScanError, ScanResult};

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Wheels, eggs and zip sdists
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipReader;

impl ArchiveReader for ZipReader {
    fn read_entries(&self, bytes: &[u8], sink: &mut EntrySink<'_>) -> ScanResult<()> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ScanError::malformed(sink.artifact(), e))?;

        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| ScanError::malformed(sink.artifact(), e))?;

            let is_symlink = entry
                .unix_mode()
                .map_or(false, |mode| mode & S_IFMT == S_IFLNK);
            if entry.is_dir() || is_symlink {
                continue;
            }

            let path = entry.name().to_string();
            let declared = entry.size();
            sink.admit(declared)?;
            sink.read_entry(path, declared, &mut entry)?;
        }
        Ok(())
    }
}
