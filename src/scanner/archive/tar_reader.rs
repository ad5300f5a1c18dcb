use std::cell::Cell;
use std::io::{self, Cursor, Read};
use std::rc::Rc;

use flate2::read::MultiGzDecoder;

use super::{ArchiveReader, EntrySink, TarCompression};
use crate::scanner::error::{LimitStage, ScanError, ScanResult};

/// Tar and tar.gz sdists
#[derive(Debug, Clone, Copy)]
pub struct TarReader {
    compression: TarCompression,
}

impl TarReader {
    pub fn new(compression: TarCompression) -> Self {
        Self { compression }
    }
}

/// Counts bytes coming out of the decoder and fails past `cap`.
/// Covers headers and the data of skipped entries too.
struct MeteredReader<R> {
    inner: R,
    read: Rc<Cell<u64>>,
    cap: u64,
}

impl<R: Read> Read for MeteredReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        let total = self.read.get().saturating_add(read as u64);
        self.read.set(total);
        if total > self.cap {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "decompressed tar stream exceeds cap",
            ));
        }
        Ok(read)
    }
}

impl ArchiveReader for TarReader {
    fn read_entries(&self, bytes: &[u8], sink: &mut EntrySink<'_>) -> ScanResult<()> {
        let decoded: Box<dyn Read + '_> = match self.compression {
            TarCompression::Gzip => Box::new(MultiGzDecoder::new(Cursor::new(bytes))),
            TarCompression::Plain => Box::new(Cursor::new(bytes)),
        };
        let read = Rc::new(Cell::new(0u64));
        let limit = sink.limit();
        let cap = limit.saturating_mul(2);
        let metered = MeteredReader {
            inner: decoded,
            read: Rc::clone(&read),
            cap,
        };

        let artifact = sink.artifact().to_string();
        let result = walk(tar::Archive::new(metered), sink);

        // Any failure after the meter tripped is the cap, not corruption
        result.map_err(|err| {
            if read.get() > cap && !err.is_too_large() {
                log::warn!("Tar stream of {} exceeded {} decoded bytes", artifact, cap);
                ScanError::too_large(&artifact, LimitStage::Extraction, limit)
            } else {
                err
            }
        })
    }
}

fn walk<R: Read>(mut archive: tar::Archive<R>, sink: &mut EntrySink<'_>) -> ScanResult<()> {
    let entries = archive
        .entries()
        .map_err(|e| ScanError::malformed(sink.artifact(), e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| ScanError::malformed(sink.artifact(), e))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let declared = entry.size();
        sink.admit(declared)?;
        sink.read_entry(path, declared, &mut entry)?;
    }
    Ok(())
}
