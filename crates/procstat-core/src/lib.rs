//! procstat-core - Turns a procstat log into a chart report.
//!
//! Pipeline, one stage per module:
//! - `decoder`: log lines to operations
//! - `replay`: operations to a history of snapshots
//! - `parser`: decoding of the `/proc` values stored in snapshots
//! - `metrics`: per-interval counter deltas
//! - `select`: which process and partition charts are worth showing
//! - `report`: series files and the HTML document
//!
//! Nothing is written until the whole log has been replayed, so a malformed
//! line leaves no partial output behind.

pub mod config;
pub mod decoder;
pub mod error;
pub mod metrics;
pub mod parser;
pub mod replay;
pub mod report;
pub mod select;

use std::path::Path;

use tracing::info;

pub use config::ReportConfig;
pub use error::ReportError;
pub use report::ReportSummary;

/// Reads the log at `log_path` and writes the report to `document`.
pub fn generate_report(
    log_path: &Path,
    document: &Path,
    config: &ReportConfig,
) -> Result<ReportSummary, ReportError> {
    let history = replay::replay_file(log_path)?;
    info!(
        "loaded {} snapshots from {}",
        history.len(),
        log_path.display()
    );

    let metrics = metrics::extract(&history);
    let selection = select::select(&metrics, &config.selection);
    info!(
        "selected {} processes (cutoff {} jiffies), {} partitions",
        selection.processes.len(),
        selection.cpu_cutoff,
        selection.partitions.len()
    );

    let sections = report::assemble(&history, &metrics, &selection);
    report::write_report(
        &sections,
        &log_path.display().to_string(),
        document,
        config,
    )
}
