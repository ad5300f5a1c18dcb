//! Test Helper Functions
//!
//! In-memory archive builders and artifact sources shared by scanner tests.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use zip::write::SimpleFileOptions;

use crate::rules::RuleSet;
use crate::scanner::error::ScanResult;
use crate::scanner::fetch::{ArtifactSource, ArtifactStream};
use crate::scanner::types::DistributionDescriptor;

/// Builds a tar archive entry by entry
pub struct TarFixture {
    builder: tar::Builder<Vec<u8>>,
}

impl TarFixture {
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    fn append(mut self, kind: tar::EntryType, path: &str, data: &[u8], link: Option<&str>) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(kind);
        header.set_size(data.len() as u64);
        header.set_mode(if kind.is_dir() { 0o755 } else { 0o644 });
        if let Some(target) = link {
            header.set_link_name(target).unwrap();
        }
        self.builder.append_data(&mut header, path, data).unwrap();
        self
    }

    pub fn file(self, path: &str, data: &[u8]) -> Self {
        self.append(tar::EntryType::Regular, path, data, None)
    }

    pub fn dir(self, path: &str) -> Self {
        self.append(tar::EntryType::Directory, path, &[], None)
    }

    pub fn symlink(self, path: &str, target: &str) -> Self {
        self.append(tar::EntryType::Symlink, path, &[], Some(target))
    }

    pub fn finish(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// Builds a zip archive entry by entry
pub struct ZipFixture {
    writer: zip::ZipWriter<Cursor<Vec<u8>>>,
}

impl ZipFixture {
    pub fn new() -> Self {
        Self {
            writer: zip::ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    pub fn file(mut self, path: &str, data: &[u8]) -> Self {
        self.writer
            .start_file(path, SimpleFileOptions::default())
            .unwrap();
        self.writer.write_all(data).unwrap();
        self
    }

    pub fn dir(mut self, path: &str) -> Self {
        self.writer
            .add_directory(path, SimpleFileOptions::default())
            .unwrap();
        self
    }

    pub fn symlink(mut self, path: &str, target: &str) -> Self {
        self.writer
            .add_symlink(path, target, SimpleFileOptions::default())
            .unwrap();
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.writer.finish().unwrap().into_inner()
    }
}

/// `.tar.gz` sdist with the given files under `<name>/`
pub fn sdist(name: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let mut fixture = TarFixture::new().dir(&format!("{}/", name));
    for (path, text) in files {
        fixture = fixture.file(&format!("{}/{}", name, path), text.as_bytes());
    }
    gzip(&fixture.finish())
}

/// Wheel with the given files
pub fn wheel(files: &[(&str, &str)]) -> Vec<u8> {
    let mut fixture = ZipFixture::new();
    for (path, text) in files {
        fixture = fixture.file(path, text.as_bytes());
    }
    fixture.finish()
}

pub fn descriptor(url: &str, package_type: &str, filename: &str) -> DistributionDescriptor {
    DistributionDescriptor {
        url: url.to_string(),
        package_type: package_type.to_string(),
        filename: filename.to_string(),
        inspector_link: format!("https://inspector.example.org/project/demo/1.0/{}/", filename),
    }
}

/// Two namespaces: `obfuscation` (3) for any file and `process_spawn` (7) for `*.py`
pub fn sample_rules() -> RuleSet {
    RuleSet::compile(
        vec![
            (
                "obfuscation",
                r#"
                [[rule]]
                name = "b64_exec"
                weight = 3
                regex = ['base64\.b64decode\(']
                "#,
            ),
            (
                "process_spawn",
                r#"
                [[rule]]
                name = "os_system"
                weight = 7
                filetypes = ["*.py"]
                strings = ["os.system("]
                "#,
            ),
        ],
        "test-rules",
    )
    .unwrap()
}

pub const MALICIOUS_SETUP: &str = "import os, base64\nos.system(base64.b64decode('Y3VybA=='))\n";

/// Wraps another source, counting opens and delaying selected URLs
pub struct InstrumentedSource {
    inner: Arc<dyn ArtifactSource>,
    delays: HashMap<String, Duration>,
    opens: AtomicUsize,
}

impl InstrumentedSource {
    pub fn new(inner: Arc<dyn ArtifactSource>) -> Self {
        Self {
            inner,
            delays: HashMap::new(),
            opens: AtomicUsize::new(0),
        }
    }

    pub fn delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactSource for InstrumentedSource {
    async fn open(&self, url: &str) -> ScanResult<ArtifactStream> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        self.inner.open(url).await
    }
}

/// A source whose stream never ends, with an optional lying size
pub struct EndlessSource {
    pub declared_len: Option<u64>,
}

#[async_trait]
impl ArtifactSource for EndlessSource {
    async fn open(&self, _url: &str) -> ScanResult<ArtifactStream> {
        use futures::stream::{self, StreamExt};
        Ok(ArtifactStream {
            declared_len: self.declared_len,
            chunks: stream::repeat_with(|| Ok(vec![0u8; 4096])).boxed(),
        })
    }
}

/// A source that never produces a chunk
pub struct StalledSource;

#[async_trait]
impl ArtifactSource for StalledSource {
    async fn open(&self, _url: &str) -> ScanResult<ArtifactStream> {
        use futures::stream::{self, StreamExt};
        Ok(ArtifactStream {
            declared_len: None,
            chunks: stream::pending().boxed(),
        })
    }
}
