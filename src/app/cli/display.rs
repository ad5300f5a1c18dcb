//! CLI display utilities for formatting output

use prettytable::{format, Cell, Row, Table};
use serde::Serialize;

use crate::core::styles::StyleRole;
use crate::rules::RuleSummary;
use crate::scanner::types::{DistributionScanResult, PackageScanReport, ServiceMetadata};

/// Pretty JSON for any report type
pub fn render_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

fn score_text(score: u64, color: bool) -> String {
    if score > 0 {
        StyleRole::Flagged.paint(&score.to_string(), color)
    } else {
        StyleRole::Clean.paint("0", color)
    }
}

fn push_distribution(out: &mut Vec<String>, dist: &DistributionScanResult, color: bool) {
    out.push(format!(
        "  {} {} ({} files, score {})",
        StyleRole::Key.paint("*", color),
        dist.filename,
        dist.files_scanned,
        score_text(dist.score(), color)
    ));
    out.push(format!(
        "    {}",
        StyleRole::Dim.paint(&format!("sha256 {}", dist.sha256), color)
    ));
    for file in &dist.analysis.malicious_files {
        let rules: Vec<String> = file
            .rules
            .iter()
            .map(|(namespace, weight)| format!("{}={}", namespace, weight))
            .collect();
        out.push(format!(
            "    {} [{}] {}",
            file.path,
            score_text(file.score(), color),
            rules.join(", ")
        ));
    }
}

/// Human readable package report
pub fn render_report_text(report: &PackageScanReport, color: bool) -> String {
    let mut out = vec![
        format!(
            "{} {} {}",
            StyleRole::Header.paint("Package", color),
            report.name,
            report.version
        ),
        format!("  {}", report.canonical_link),
        format!(
            "  rules {}  scanned {}",
            report.rules_version,
            report.scanned_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        String::new(),
        StyleRole::Header.paint("Distributions", color),
    ];
    for dist in &report.distributions {
        push_distribution(&mut out, dist, color);
    }
    out.push(String::new());

    match &report.highest_score_distribution {
        Some(highest) => {
            out.push(format!(
                "{} {} scored {} ({})",
                StyleRole::Flagged.paint("Flagged:", color),
                highest.distribution,
                highest.score,
                highest.matches.join(", ")
            ));
            out.push(format!("  most malicious file: {}", highest.most_malicious_file));
            out.push(format!("  inspect: {}", highest.inspector_link));
        }
        None => out.push(StyleRole::Clean.paint("No rule matched", color)),
    }
    out.join("\n")
}

/// Human readable single distribution result
pub fn render_distribution_text(dist: &DistributionScanResult, color: bool) -> String {
    let mut out = vec![StyleRole::Header.paint("Distribution", color)];
    push_distribution(&mut out, dist, color);
    out.join("\n")
}

pub fn render_metadata_text(metadata: &ServiceMetadata, color: bool) -> String {
    [
        ("version", &metadata.version),
        ("server commit", &metadata.server_commit),
        ("rules commit", &metadata.rules_commit),
    ]
    .iter()
    .map(|(key, value)| format!("{:<14} {}", StyleRole::Key.paint(key, color), value))
    .collect::<Vec<_>>()
    .join("\n")
}

fn header_cell(text: &str, color: bool) -> Cell {
    let cell = Cell::new(text);
    match StyleRole::Header.to_prettytable_spec() {
        Some(spec) if color => cell.style_spec(&format!("b{}", spec)),
        _ => cell.style_spec("b"),
    }
}

/// Table of compiled rules, one row per rule
pub fn rules_table(rules: &[RuleSummary], color: bool) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(Row::new(
        ["Namespace", "Rule", "Weight", "File types", "Condition", "Patterns"]
            .iter()
            .map(|title| header_cell(title, color))
            .collect(),
    ));

    for rule in rules {
        let filetypes = rule
            .filetypes
            .as_ref()
            .map(|f| f.join(" "))
            .unwrap_or_else(|| "*".to_string());
        table.add_row(Row::new(vec![
            Cell::new(&rule.namespace),
            Cell::new(&rule.rule),
            Cell::new(&rule.weight.to_string()).style_spec("r"),
            Cell::new(&filetypes),
            Cell::new(&format!("{:?}", rule.condition).to_lowercase()),
            Cell::new(&rule.patterns.to_string()).style_spec("r"),
        ]));
    }
    table
}
