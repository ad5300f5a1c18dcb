//! Distribution and rule fixtures

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use distscan::scanner::api::{DistributionDescriptor, PackageRelease};
use flate2::write::GzEncoder;
use flate2::Compression;
use zip::write::SimpleFileOptions;

pub const MALICIOUS_SETUP: &str =
    "import os, base64\nos.system(base64.b64decode('Y3VybA=='))\n";

pub const CLEAN_MODULE: &str = "def greet(name):\n    return f'hello {name}'\n";

/// Weighted rules: `obfuscation` 3 on any file, `process_spawn` 7 on `*.py`
pub const OBFUSCATION_RULES: &str = r#"
[[rule]]
name = "b64_decode"
weight = 3
regex = ['base64\.b64decode\(']
"#;

pub const PROCESS_SPAWN_RULES: &str = r#"
[[rule]]
name = "os_system"
weight = 7
filetypes = ["*.py"]
strings = ["os.system("]
"#;

/// `<name>.tar.gz` with every file placed under `<name>/`
pub fn sdist(name: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, text) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(text.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        builder
            .append_data(&mut header, format!("{}/{}", name, path), text.as_bytes())
            .unwrap();
    }
    let tar = builder.into_inner().unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar).unwrap();
    encoder.finish().unwrap()
}

pub fn wheel(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (path, text) in files {
        writer
            .start_file(*path, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(text.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Rules directory with the two sample namespaces
pub fn write_rules(dir: &Path) -> PathBuf {
    let rules = dir.join("rules");
    std::fs::create_dir_all(&rules).unwrap();
    std::fs::write(rules.join("obfuscation.toml"), OBFUSCATION_RULES).unwrap();
    std::fs::write(rules.join("process_spawn.toml"), PROCESS_SPAWN_RULES).unwrap();
    rules
}

pub fn descriptor(url: &str, package_type: &str, filename: &str) -> DistributionDescriptor {
    DistributionDescriptor {
        url: url.to_string(),
        package_type: package_type.to_string(),
        filename: filename.to_string(),
        inspector_link: format!("https://inspector.example.org/project/demo/1.0/{}/", filename),
    }
}

pub fn release(distributions: Vec<DistributionDescriptor>) -> PackageRelease {
    PackageRelease {
        name: "demo".to_string(),
        version: "1.0".to_string(),
        canonical_link: "https://pypi.example.org/project/demo/1.0/".to_string(),
        distributions,
    }
}
