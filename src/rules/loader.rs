//! Rule loading from disk
//!
//! Rules live either in a directory tree of `*.toml` files or in a zip bundle
//! of the same. The namespace of each source is its file stem.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::rules::compiler::RuleSet;
use crate::rules::error::{RuleError, RuleResult};
use crate::scanner::archive::{self, ArchiveKind};
use crate::scanner::budget::ByteBudget;
use crate::scanner::guard::ScanGuard;

const RULE_EXTENSION: &str = "toml";

/// Where rule sources are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleLocation {
    Directory(PathBuf),
    Bundle(PathBuf),
}

impl RuleLocation {
    /// A path ending in `.zip` is a bundle, anything else a directory
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_zip = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("zip"));
        if is_zip {
            RuleLocation::Bundle(path)
        } else {
            RuleLocation::Directory(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            RuleLocation::Directory(path) | RuleLocation::Bundle(path) => path,
        }
    }
}

impl fmt::Display for RuleLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleLocation::Directory(path) => write!(f, "directory {}", path.display()),
            RuleLocation::Bundle(path) => write!(f, "bundle {}", path.display()),
        }
    }
}

fn io_error(path: &Path, err: impl fmt::Display) -> RuleError {
    RuleError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

/// Read every rule source at `location` as `namespace -> text`
pub fn load_rule_sources(
    location: &RuleLocation,
    max_bytes: u64,
) -> RuleResult<BTreeMap<String, String>> {
    match location {
        RuleLocation::Directory(root) => {
            let mut files = Vec::new();
            collect_rule_files(root, &mut files)?;
            files.sort();

            let mut budget = ByteBudget::new(max_bytes);
            let mut sources = BTreeMap::new();
            for file in files {
                let bytes = read_bounded(&file, budget.remaining()).map_err(|e| match e {
                    BoundedRead::Io(e) => io_error(&file, e),
                    BoundedRead::Exceeded => {
                        io_error(root, format!("rule sources exceed {} bytes", max_bytes))
                    }
                })?;
                budget.charge(bytes.len()).map_err(|e| {
                    io_error(root, format!("rule sources exceed {} bytes", e.limit))
                })?;
                let text = String::from_utf8(bytes).map_err(|e| io_error(&file, e))?;
                let namespace = namespace_of(&file.to_string_lossy());
                insert_source(&mut sources, namespace, text, &file.display().to_string())?;
            }
            Ok(sources)
        }
        RuleLocation::Bundle(path) => {
            let bytes = read_bounded(path, max_bytes).map_err(|e| match e {
                BoundedRead::Io(e) => io_error(path, e),
                BoundedRead::Exceeded => {
                    io_error(path, format!("bundle exceeds {} bytes", max_bytes))
                }
            })?;
            let label = path.display().to_string();
            let files = archive::extract(
                ArchiveKind::Zip,
                &bytes,
                &label,
                max_bytes,
                &ScanGuard::unbounded(),
            )
            .map_err(|e| RuleError::Bundle {
                path: label.clone(),
                message: e.to_string(),
            })?;

            let mut sources = BTreeMap::new();
            for file in files {
                if !has_rule_extension(&file.path) {
                    continue;
                }
                let namespace = namespace_of(&file.path);
                let origin = format!("{}:{}", label, file.path);
                insert_source(&mut sources, namespace, file.text, &origin)?;
            }
            Ok(sources)
        }
    }
}

enum BoundedRead {
    Io(std::io::Error),
    Exceeded,
}

/// Read `path` while it stays within `max_bytes`; one byte more is an error
fn read_bounded(path: &Path, max_bytes: u64) -> Result<Vec<u8>, BoundedRead> {
    let file = fs::File::open(path).map_err(BoundedRead::Io)?;
    let mut bytes = Vec::new();
    file.take(max_bytes.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(BoundedRead::Io)?;
    if bytes.len() as u64 > max_bytes {
        return Err(BoundedRead::Exceeded);
    }
    Ok(bytes)
}

fn insert_source(
    sources: &mut BTreeMap<String, String>,
    namespace: String,
    text: String,
    origin: &str,
) -> RuleResult<()> {
    if sources.contains_key(&namespace) {
        return Err(RuleError::duplicate(&namespace, origin));
    }
    sources.insert(namespace, text);
    Ok(())
}

fn has_rule_extension(path: &str) -> bool {
    Path::new(path)
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case(RULE_EXTENSION))
}

/// File stem of the last path component, `/` or `\` separated
fn namespace_of(path: &str) -> String {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

/// Recursive walk; hidden entries and symlinks are ignored
fn collect_rule_files(dir: &Path, files: &mut Vec<PathBuf>) -> RuleResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| io_error(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_error(dir, e))?;
        let path = entry.path();
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        let file_type = entry.file_type().map_err(|e| io_error(&path, e))?;
        if file_type.is_dir() {
            collect_rule_files(&path, files)?;
        } else if file_type.is_file() && has_rule_extension(&path.to_string_lossy()) {
            files.push(path);
        } else {
            log::debug!("Skipping {}", path.display());
        }
    }
    Ok(())
}

/// `sha256:` plus the first 12 hex digits of a digest over all sources
pub fn rules_digest(sources: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for (namespace, text) in sources {
        hasher.update(namespace.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        hasher.update([0u8]);
    }
    let digest = format!("{:x}", hasher.finalize());
    format!("sha256:{}", &digest[..12])
}

/// Load and compile the rules at `location`.
///
/// The version is `version_override` when given, else the content digest.
pub fn load_rule_set(
    location: &RuleLocation,
    version_override: Option<&str>,
    max_bytes: u64,
) -> RuleResult<RuleSet> {
    let sources = load_rule_sources(location, max_bytes)?;
    let version = match version_override {
        Some(version) => version.to_string(),
        None => rules_digest(&sources),
    };
    log::info!(
        "Loaded {} rule sources from {} (version {})",
        sources.len(),
        location,
        version
    );
    RuleSet::compile(sources, version)
}
