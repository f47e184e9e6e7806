//! procstatreport - Renders a procstat log as an HTML chart report.
//!
//! Usage:
//!   procstatreport procstat.log report.html
//!
//! Writes `report.html` plus one CSV series file per chart under
//! `report_files/`.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;

use clap::Parser;
use tracing::{Level, debug, error};
use tracing_subscriber::EnvFilter;

use procstat_core::config::DEFAULT_CHART_SCRIPT;
use procstat_core::select::{DEFAULT_CPU_CUTOFF_DIVISOR, DEFAULT_FAULT_CUTOFF_DIVISOR};
use procstat_core::{ReportConfig, generate_report};

/// Renders a procstat log as an HTML chart report.
#[derive(Parser)]
#[command(name = "procstatreport", about = "Procstat log report generator", version)]
struct Args {
    /// procstat log to read.
    #[arg(value_name = "LOG")]
    log: PathBuf,

    /// HTML document to write. Series files go to `<stem>_files/`.
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// URL of dygraph-combined.js as referenced from the document.
    #[arg(long, env = "PROCSTAT_CHART_SCRIPT", default_value = DEFAULT_CHART_SCRIPT)]
    chart_script: String,

    /// A process gets a chart when its CPU jiffies exceed total/N (0 disables the cutoff).
    #[arg(
        long,
        default_value_t = DEFAULT_CPU_CUTOFF_DIVISOR,
        value_parser = clap::value_parser!(i64).range(0..)
    )]
    cpu_cutoff_divisor: i64,

    /// A charted process gets a faults chart when its faults exceed total/N.
    #[arg(
        long,
        default_value_t = DEFAULT_FAULT_CUTOFF_DIVISOR,
        value_parser = clap::value_parser!(i64).range(0..)
    )]
    fault_cutoff_divisor: i64,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
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
    for target in ["procstatreport", "procstat_core"] {
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

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let mut config = ReportConfig::from_env();
    config.chart_script = args.chart_script;
    config.selection.cpu_cutoff_divisor = args.cpu_cutoff_divisor;
    config.selection.fault_cutoff_divisor = args.fault_cutoff_divisor;
    debug!("Config: {:?}", config);

    if let Err(e) = generate_report(&args.log, &args.output, &config) {
        error!("report failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
