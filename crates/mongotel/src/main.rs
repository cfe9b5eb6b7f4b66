//! mongotel - MongoDB metric synthesis.
//!
//! Reads one diagnostic document (Extended JSON, e.g. a `serverStatus`
//! dump), flattens it into metrics and prints them in Prometheus text
//! exposition or as JSON. With `--compatible-mode` the legacy metric
//! families are derived as well.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use mongotel_core::exposition;
use mongotel_core::source::{DocumentSource, FileSource, ReaderSource};
use mongotel_core::{FlattenOptions, LabelSet, Pipeline, RuleTable, Scrape, TopologyLabels};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Prometheus text exposition.
    Text,
    /// JSON array of metrics.
    Json,
}

/// MongoDB metric synthesis.
#[derive(Parser)]
#[command(name = "mongotel", about = "Turns MongoDB diagnostic documents into metrics", version)]
struct Args {
    /// Extended JSON document to read; `-` reads standard input.
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Metric name prefix.
    #[arg(long, default_value = "mongodb")]
    prefix: String,

    /// Also emit legacy metric families.
    #[arg(long, env = "MONGOTEL_COMPATIBLE_MODE")]
    compatible_mode: bool,

    /// Cluster role label (cl_role).
    #[arg(long)]
    cluster_role: Option<String>,

    /// Cluster id label (cl_id).
    #[arg(long)]
    cluster_id: Option<String>,

    /// Replica set name label (rs_nm).
    #[arg(long)]
    replset_name: Option<String>,

    /// Replica set member state label (rs_state).
    #[arg(long)]
    replset_state: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn topology(&self) -> TopologyLabels {
        TopologyLabels {
            cluster_role: self.cluster_role.clone(),
            cluster_id: self.cluster_id.clone(),
            replset_name: self.replset_name.clone(),
            replset_state: self.replset_state.clone(),
        }
    }

    fn source(&self) -> Box<dyn DocumentSource> {
        if self.input == "-" {
            Box::new(ReaderSource::new("stdin", std::io::stdin().lock()))
        } else {
            Box::new(FileSource::new(&self.input))
        }
    }
}

/// Logs go to stderr; stdout carries only the metrics.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["mongotel", "mongotel_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn render(scrape: &Scrape, format: Format) -> Result<String, serde_json::Error> {
    match format {
        Format::Text => Ok(exposition::render(&scrape.metrics)),
        Format::Json => {
            let mut json = serde_json::to_string_pretty(&scrape.metrics)?;
            json.push('\n');
            Ok(json)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    debug!("mongotel {} starting", env!("CARGO_PKG_VERSION"));

    let options = FlattenOptions::mongodb();
    let labels = LabelSet::from(&args.topology());

    let table = if args.compatible_mode {
        match RuleTable::legacy() {
            Ok(table) => Some(table),
            Err(e) => {
                error!("Invalid compatibility rules: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        None
    };

    let mut pipeline = Pipeline::new(&options, &args.prefix, &labels);
    if let Some(table) = &table {
        info!("Compatibility mode: {} rules", table.len());
        pipeline = pipeline.with_compatibility(table);
    }

    let mut source = args.source();
    let doc = match source.fetch() {
        Ok(doc) => doc,
        Err(e) => {
            error!("Failed to read document: {}", e);
            return ExitCode::FAILURE;
        }
    };
    debug!("Read {} top-level fields from {}", doc.len(), source.describe());

    let scrape = pipeline.run(&doc);
    for invalid in &scrape.invalid {
        warn!("Skipping {}", invalid);
    }
    info!(
        "Synthesized {} metrics ({} invalid)",
        scrape.metrics.len(),
        scrape.invalid.len()
    );

    let output = match render(&scrape, args.format) {
        Ok(output) => output,
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = stdout.write_all(output.as_bytes()).and_then(|_| stdout.flush()) {
        error!("Failed to write output: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
