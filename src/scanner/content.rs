//! Content scanning
//!
//! Runs the rule set over every extracted file and keeps the files that have
//! at least one applicable match.

use std::collections::BTreeMap;

use crate::rules::RuleSet;
use crate::scanner::archive::ExtractedFile;
use crate::scanner::types::{MaliciousFile, PackageAnalysisResult};

/// Match every file against `rules`. Output keeps archive order.
pub fn scan_files(rules: &RuleSet, files: &[ExtractedFile]) -> PackageAnalysisResult {
    let malicious_files = files
        .iter()
        .filter_map(|file| scan_file(rules, file))
        .collect();
    PackageAnalysisResult::new(malicious_files)
}

/// Matches for one file, keyed by namespace. `None` when nothing applies.
pub fn scan_file(rules: &RuleSet, file: &ExtractedFile) -> Option<MaliciousFile> {
    let mut matched: BTreeMap<String, u32> = BTreeMap::new();
    for rule_match in rules.matches(&file.text) {
        if !rule_match.applies_to(&file.path) {
            log::trace!(
                "{}: {} filtered out by file type",
                file.path,
                rule_match.namespace
            );
            continue;
        }
        // Several rules in one namespace: the last one reported wins
        matched.insert(rule_match.namespace, rule_match.weight);
    }

    if matched.is_empty() {
        return None;
    }
    log::debug!("{} matched {:?}", file.path, matched.keys());
    Some(MaliciousFile {
        path: file.path.clone(),
        rules: matched,
    })
}
