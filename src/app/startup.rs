//! Application startup and command dispatch

use std::ffi::OsString;
use std::io::IsTerminal;

use clap::{CommandFactory, FromArgMatches};

use super::cli::args::{Args, Command, OutputFormat};
use super::cli::config::{default_rules_path, Settings};
use super::cli::display;
use crate::core::error_handling::{log_error_with_context, ContextualError};
use crate::core::logging::init_logging;
use crate::core::shutdown::{install_signal_handlers, CancellationFlag};
use crate::core::styles::palette_to_clap;
use crate::core::version::{build_time, crate_version, git_hash};
use crate::rules::{load_rule_set, RuleLocation, RuleResult, RuleSet};
use crate::scanner::api::{
    DistributionDescriptor, PackageAnalyzer, PackageRelease, ScanError, ScanService,
};
use crate::scanner::fetch::artifact_label;

/// Success, nothing matched
pub const EXIT_OK: i32 = 0;
/// Any failure
pub const EXIT_ERROR: i32 = 1;
/// Scan completed and scored above zero
pub const EXIT_FLAGGED: i32 = 2;

/// Initialize application startup
pub fn startup() {
    let code = run(std::env::args_os());
    std::process::exit(code);
}

/// Parse `argv`, set up logging and the runtime, run the command and return
/// the process exit code
pub fn run<I, T>(argv: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let tty = std::io::stdout().is_terminal();
    let matches = match Args::command()
        .styles(palette_to_clap(tty))
        .try_get_matches_from(argv)
    {
        Ok(matches) => matches,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { EXIT_ERROR } else { EXIT_OK };
        }
    };
    let args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return EXIT_ERROR;
        }
    };

    let mut settings = match Settings::load(&args) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_ERROR;
        }
    };
    let use_color = settings.color.unwrap_or(tty);
    settings.log.color = use_color && std::io::stderr().is_terminal();

    if let Err(e) = init_logging(&settings.log) {
        eprintln!("Error: failed to initialize logging: {}", e);
        return EXIT_ERROR;
    }
    log::debug!(
        "distscan {} ({}, built {})",
        crate_version(),
        git_hash(),
        build_time()
    );
    log::debug!("Settings: {:?}", settings);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("FATAL: could not start async runtime: {}", e);
            return EXIT_ERROR;
        }
    };

    runtime.block_on(dispatch(args.command, settings, use_color))
}

async fn dispatch(command: Command, settings: Settings, color: bool) -> i32 {
    let cancellation = CancellationFlag::new();
    install_signal_handlers(cancellation.clone());

    match command {
        Command::Scan { release } => {
            let release = match read_release(&release).await {
                Ok(release) => release,
                Err(message) => {
                    log::error!("FATAL: {}", message);
                    return EXIT_ERROR;
                }
            };
            let Some(service) = build_service(&settings, cancellation) else {
                return EXIT_ERROR;
            };
            match service.scan(&release).await {
                Ok(report) => {
                    let output = match settings.format {
                        OutputFormat::Json => display::render_json(&report),
                        OutputFormat::Text => Ok(display::render_report_text(&report, color)),
                    };
                    let flagged = report.is_flagged();
                    emit(output, flagged)
                }
                Err(e) => scan_failed(&e, settings.format),
            }
        }
        Command::ScanArtifact {
            source,
            package_type,
            filename,
            inspector_link,
        } => {
            let descriptor = DistributionDescriptor {
                filename: filename.unwrap_or_else(|| artifact_label(&source).to_string()),
                url: source,
                package_type,
                inspector_link: inspector_link.unwrap_or_default(),
            };
            let Some(service) = build_service(&settings, cancellation) else {
                return EXIT_ERROR;
            };
            match service.scan_artifact(&descriptor).await {
                Ok(result) => {
                    let output = match settings.format {
                        OutputFormat::Json => display::render_json(&result),
                        OutputFormat::Text => Ok(display::render_distribution_text(&result, color)),
                    };
                    emit(output, result.score() > 0)
                }
                Err(e) => scan_failed(&e, settings.format),
            }
        }
        Command::Rules => match load_rules(&settings) {
            Ok(rules) => match settings.format {
                OutputFormat::Json => emit(display::render_json(&rules.summaries()), false),
                OutputFormat::Text => {
                    display::rules_table(&rules.summaries(), color).printstd();
                    println!("{} rules, version {}", rules.len(), rules.version());
                    EXIT_OK
                }
            },
            Err(e) => {
                log_error_with_context(&e, "Failed to load rules");
                EXIT_ERROR
            }
        },
        Command::Info => {
            let Some(service) = build_service(&settings, cancellation) else {
                return EXIT_ERROR;
            };
            let metadata = service.metadata();
            match settings.format {
                OutputFormat::Json => emit(display::render_json(&metadata), false),
                OutputFormat::Text => emit(Ok(display::render_metadata_text(&metadata, color)), false),
            }
        }
    }
}

async fn read_release(path: &std::path::Path) -> Result<PackageRelease, String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid release file {}: {}", path.display(), e))
}

/// Configured rule location, else the default rules directory if present
fn rule_location(settings: &Settings) -> Option<RuleLocation> {
    settings
        .rules
        .clone()
        .or_else(|| default_rules_path().filter(|p| p.is_dir()))
        .map(RuleLocation::from_path)
}

fn load_rules(settings: &Settings) -> RuleResult<RuleSet> {
    match rule_location(settings) {
        Some(location) => load_rule_set(
            &location,
            settings.rules_version.as_deref(),
            settings.scan.max_artifact_bytes,
        ),
        None => {
            log::warn!("No rules configured; every scan will score 0");
            Ok(RuleSet::empty())
        }
    }
}

fn build_service(settings: &Settings, cancellation: CancellationFlag) -> Option<ScanService> {
    let analyzer = match PackageAnalyzer::from_config(&settings.scan) {
        Ok(analyzer) => analyzer,
        Err(e) => {
            log_error_with_context(&e, "Failed to set up downloads");
            return None;
        }
    };

    let service = match rule_location(settings) {
        Some(location) => {
            ScanService::with_rule_location(analyzer, location, settings.rules_version.clone())
        }
        None => {
            log::warn!("No rules configured; every scan will score 0");
            Ok(ScanService::new(analyzer, RuleSet::empty()))
        }
    };

    match service {
        Ok(service) => Some(
            service
                .with_cancellation(cancellation)
                .with_deadline(settings.scan.scan_deadline),
        ),
        Err(e) => {
            log_error_with_context(&e, "Failed to load rules");
            None
        }
    }
}

fn emit(output: Result<String, serde_json::Error>, flagged: bool) -> i32 {
    match output {
        Ok(text) => {
            println!("{}", text);
            if flagged {
                EXIT_FLAGGED
            } else {
                EXIT_OK
            }
        }
        Err(e) => {
            log::error!("FATAL: could not render output: {}", e);
            EXIT_ERROR
        }
    }
}

#[derive(serde::Serialize)]
struct ErrorReport {
    error: String,
    message: String,
    user_actionable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
}

fn scan_failed(error: &ScanError, format: OutputFormat) -> i32 {
    log_error_with_context(error, &format!("Scan failed ({})", error.kind()));
    if format == OutputFormat::Json {
        let status = match error {
            ScanError::Upstream { status, .. } => *status,
            _ => None,
        };
        let report = ErrorReport {
            error: error.kind().to_string(),
            message: error.to_string(),
            user_actionable: error.is_user_actionable(),
            status,
        };
        if let Ok(json) = display::render_json(&report) {
            println!("{}", json);
        }
    }
    EXIT_ERROR
}
