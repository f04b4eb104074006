//! taxon-audit: command-line integrity auditor for taxonomy snapshots.
//!
//! Reads a snapshot (and optionally a target structure) as JSON, runs the
//! analysis, and writes the `SystemReport` as JSON to stdout or a file.
//! Logs go to stderr so stdout stays machine-readable.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taxon_analysis::{AnalysisMode, Analyzer, CancellationToken};
use taxon_core::schema::{report_schema, snapshot_schema};
use taxon_core::{AnalysisConfig, Severity, SystemReport, TaxonomySnapshot};

const EXIT_OK: u8 = 0;

/// Exit code when `--fail-on` finds a qualifying issue.
const EXIT_ISSUES_FOUND: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "taxon-audit")]
#[command(author, version, about = "Integrity audit and migration mapping for taxonomy snapshots")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Audit a snapshot for structural issues
    Scan {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Audit a snapshot and suggest category-to-division mappings
    Migrate {
        #[command(flatten)]
        run: RunArgs,

        /// Target taxonomy snapshot (JSON)
        #[arg(short, long)]
        target: Option<PathBuf>,
    },

    /// Print the JSON Schema of the report or the snapshot
    Schema {
        /// Which document to describe
        #[arg(value_enum, default_value = "report")]
        kind: SchemaKind,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Taxonomy snapshot (JSON)
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Analysis config (TOML); environment variables are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file for the report (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,

    /// Abort the run after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Exit with status 2 when an issue of this severity or worse is found
    #[arg(long)]
    fail_on: Option<Severity>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SchemaKind {
    Report,
    Snapshot,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(success = false, error = %format!("{:#}", e), "Run failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Configure logging from the environment.
///
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_ANSI    - "true"/"false" override ANSI colors
///   RUST_LOG    - standard env filter (default: "warn,taxon_analysis=info,taxon_audit=info")
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn,taxon_analysis=info,taxon_audit=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if log_format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
        if let Some(ansi) = log_ansi {
            layer = layer.with_ansi(ansi);
        }
        registry.with(layer).init();
    }
}

fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Commands::Scan { run } => cmd_analyze(&run, None, AnalysisMode::Audit),
        Commands::Migrate { run, target } => {
            cmd_analyze(&run, target.as_deref(), AnalysisMode::Migration)
        }
        Commands::Schema { kind, output } => {
            cmd_schema(kind, output.as_deref())?;
            Ok(EXIT_OK)
        }
    }
}

fn cmd_analyze(args: &RunArgs, target: Option<&Path>, mode: AnalysisMode) -> Result<u8> {
    let config = AnalysisConfig::load(args.config.as_deref()).context("Invalid configuration")?;
    let snapshot = read_snapshot(&args.snapshot)?;
    let target = target.map(read_snapshot).transpose()?;

    let cancel = match args.timeout_secs {
        Some(secs) => CancellationToken::with_timeout(Duration::from_secs(secs)),
        None => CancellationToken::new(),
    };
    debug!(mode = %mode, snapshot = %args.snapshot.display(), "Starting analysis");

    let report = Analyzer::new(config)
        .with_cancellation(cancel)
        .analyze(&snapshot, target.as_ref(), mode)
        .context("Analysis failed")?;

    let json = render(&report, args.pretty)?;
    write_output(args.output.as_deref(), &json)?;
    info!(
        mode = %mode,
        issue_count = report.issues.len(),
        mapping_count = report.mappings.len(),
        "Report written"
    );

    Ok(exit_code(&report, args.fail_on))
}

fn cmd_schema(kind: SchemaKind, output: Option<&Path>) -> Result<()> {
    let schema = match kind {
        SchemaKind::Report => report_schema(),
        SchemaKind::Snapshot => snapshot_schema(),
    };
    let json = serde_json::to_string_pretty(&schema)?;
    write_output(output, &json)
}

fn read_snapshot(path: &Path) -> Result<TaxonomySnapshot> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    TaxonomySnapshot::from_json(&content)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))
}

fn render(report: &SystemReport, pretty: bool) -> Result<String> {
    let json = if pretty {
        report.to_json_pretty()?
    } else {
        serde_json::to_string(report)?
    };
    Ok(json)
}

fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => fs::write(path, format!("{}\n", content))
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

/// Severity gate for CI use: issues at `threshold` or above fail the run.
fn exit_code(report: &SystemReport, threshold: Option<Severity>) -> u8 {
    match threshold {
        Some(threshold) if report.issues.iter().any(|i| i.severity <= threshold) => {
            EXIT_ISSUES_FOUND
        }
        _ => EXIT_OK,
    }
}
