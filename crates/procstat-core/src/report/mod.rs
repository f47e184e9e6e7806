//! Report assembly: chart sections, series files and the HTML document.
//!
//! [`assemble`] decides what each chart shows. [`write_report`] is the only
//! place that touches the filesystem.

pub mod html;
pub mod series;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::metrics::Metrics;
use crate::parser::YaffsCounter;
use crate::replay::History;
use crate::select::Selection;

use series::Column;

/// Suffix of the directory holding the series files, after the document stem.
pub const FILES_DIR_SUFFIX: &str = "_files";

/// Fixed upper bound of fraction charts, in percent.
const PERCENT_RANGE: [i64; 2] = [0, 110];

/// Rendering options handed to the charting library as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub colors: Vec<&'static str>,
    /// Visible time window in epoch milliseconds, shared by every chart.
    pub date_window: [f64; 2],
    pub fill_graph: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fractions: Option<bool>,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_range: Option<[i64; 2]>,
}

impl ChartOptions {
    fn new(colors: &[&'static str], date_window: [f64; 2], height: u32) -> Self {
        Self {
            colors: colors.to_vec(),
            date_window,
            fill_graph: true,
            fractions: None,
            height,
            value_range: None,
        }
    }

    fn percent(mut self) -> Self {
        self.fractions = Some(true);
        self.value_range = Some(PERCENT_RANGE);
        self
    }

    fn value_range(mut self, range: [i64; 2]) -> Self {
        self.value_range = Some(range);
        self
    }
}

/// One chart: its series file contents, label and options.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// DOM id, also the series file stem.
    pub id: String,
    pub label_html: String,
    pub columns: Vec<Column>,
    pub options: ChartOptions,
}

impl Chart {
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Chart(Chart),
    Spacer,
}

/// What was written, for the caller's log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub charts: usize,
    pub document: PathBuf,
    pub files_dir: PathBuf,
}

/// Time window spanning the whole history, in epoch milliseconds.
pub fn date_window(history: &History) -> [f64; 2] {
    history
        .time_range()
        .map(|(first, last)| [first * 1000.0, last * 1000.0])
        .unwrap_or([0.0, 0.0])
}

/// Lays out every chart of the report in display order.
pub fn assemble(history: &History, metrics: &Metrics, selection: &Selection<'_>) -> Vec<Section> {
    let window = date_window(history);
    let faults_range = [0, metrics.max_faults() * 11 / 10];
    let mut sections = Vec::new();

    sections.push(Section::Chart(Chart {
        id: "total_cpu".to_string(),
        label_html: html::total_cpu_label(metrics.cpu.total_sys(), metrics.cpu.total_user()),
        columns: vec![
            Column::from_series("sys", &metrics.cpu.sys()),
            Column::from_series("sys+user", &metrics.cpu.sys_user()),
        ],
        options: ChartOptions::new(&["blue", "green"], window, 100).percent(),
    }));

    sections.push(Section::Chart(Chart {
        id: "context_switches".to_string(),
        label_html: html::context_label(metrics.context_switches.total()),
        columns: vec![Column::from_series("switches", &metrics.context_switches)],
        options: ChartOptions::new(&["blue"], window, 50),
    }));

    sections.push(Section::Chart(Chart {
        id: "total_faults".to_string(),
        label_html: html::faults_label(metrics.total_faults.total()),
        columns: vec![Column::from_series("major", &metrics.total_faults)],
        options: ChartOptions::new(&["gray"], window, 50).value_range(faults_range),
    }));

    sections.push(Section::Spacer);

    for partition in &selection.partitions {
        let record = partition.record;
        sections.push(Section::Chart(Chart {
            id: format!("yaffs{}", partition.index),
            label_html: html::yaffs_label(&record.name, record.totals()),
            columns: YaffsCounter::ALL
                .iter()
                .map(|&c| Column::from_series(c.name(), record.series(c)))
                .collect(),
            options: ChartOptions::new(&["maroon", "gray", "teal"], window, 75),
        }));
    }

    for process in &selection.processes {
        let record = process.record;
        let name = if record.name.is_empty() {
            "(unknown)"
        } else {
            record.name.as_str()
        };

        sections.push(Section::Spacer);
        sections.push(Section::Chart(Chart {
            id: format!("proc{}", record.pid),
            label_html: html::process_cpu_label(
                name,
                record.pid,
                record.sys_total(),
                record.user_total(),
            ),
            columns: vec![
                Column::from_series("sys", &record.sys),
                Column::from_series("sys+user", &record.sys_user),
            ],
            options: ChartOptions::new(&["blue", "green"], window, 75).percent(),
        }));

        if process.show_faults {
            sections.push(Section::Chart(Chart {
                id: format!("proc{}_faults", record.pid),
                label_html: html::faults_label(record.faults_total()),
                columns: vec![Column::from_series("major", &record.faults)],
                options: ChartOptions::new(&["gray"], window, 50).value_range(faults_range),
            }));
        }
    }

    sections
}

/// Directory for the series files of `document`: its path without
/// extension plus [`FILES_DIR_SUFFIX`].
pub fn files_dir_for(document: &Path) -> PathBuf {
    let mut dir: OsString = document.with_extension("").into_os_string();
    dir.push(FILES_DIR_SUFFIX);
    PathBuf::from(dir)
}

/// Writes every series file, then the document referencing them.
pub fn write_report(
    sections: &[Section],
    log_name: &str,
    document: &Path,
    config: &ReportConfig,
) -> Result<ReportSummary, ReportError> {
    let files_dir = files_dir_for(document);
    let files_url = files_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    std::fs::create_dir_all(&files_dir).map_err(|e| ReportError::io(&files_dir, e))?;

    let date = chrono::Local::now().format("%a %b %e %H:%M:%S %Y").to_string();
    let mut out = vec![html::page_begin(
        log_name,
        &config.user,
        &date,
        &config.chart_script,
    )];

    let mut charts = 0;
    for section in sections {
        let chart = match section {
            Section::Spacer => {
                out.push(html::SPACER.to_string());
                continue;
            }
            Section::Chart(chart) => chart,
        };

        let file_name = chart.file_name();
        series::write_table(&files_dir.join(&file_name), &chart.columns)?;

        let options = serde_json::to_string(&chart.options)
            .map_err(|e| ReportError::encode(&chart.id, e))?;
        out.push(html::chart(
            &chart.id,
            &chart.label_html,
            &format!("{}/{}", files_url, file_name),
            &options,
        ));
        charts += 1;
        debug!("wrote {} ({} columns)", file_name, chart.columns.len());
    }

    out.push(html::PAGE_END.to_string());
    std::fs::write(document, out.join("\n")).map_err(|e| ReportError::io(document, e))?;

    info!(
        "wrote {} charts to {} ({})",
        charts,
        document.display(),
        files_dir.display()
    );

    Ok(ReportSummary {
        charts,
        document: document.to_path_buf(),
        files_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::extract;
    use crate::metrics::tests::history_of;
    use crate::parser::CPU_KEY;
    use crate::select::{SelectionConfig, select};

    fn chart_ids(sections: &[Section]) -> Vec<&str> {
        sections
            .iter()
            .map(|s| match s {
                Section::Chart(c) => c.id.as_str(),
                Section::Spacer => "-",
            })
            .collect()
    }

    #[test]
    fn test_files_dir_for() {
        assert_eq!(
            files_dir_for(Path::new("/tmp/out/report.html")),
            PathBuf::from("/tmp/out/report_files")
        );
        assert_eq!(files_dir_for(Path::new("report")), PathBuf::from("report_files"));
    }

    #[test]
    fn test_options_json() {
        let options = ChartOptions::new(&["blue", "green"], [500.0, 2500.0], 100).percent();
        let json = serde_json::to_string(&options).unwrap();
        assert_eq!(
            json,
            r#"{"colors":["blue","green"],"dateWindow":[500.0,2500.0],"fillGraph":true,"fractions":true,"height":100,"valueRange":[0,110]}"#
        );

        let plain = ChartOptions::new(&["blue"], [0.0, 0.0], 50);
        let json = serde_json::to_string(&plain).unwrap();
        assert!(!json.contains("fractions"));
        assert!(!json.contains("valueRange"));
    }

    #[test]
    fn test_assemble_layout() {
        let busy0 = "5 (busy) R 1 1 1 0 -1 0 0 0 0 0 0 0";
        let busy1 = "5 (busy) R 1 1 1 0 -1 0 0 0 40 0 60 30";
        let idle0 = "6 (idle) S 1 1 1 0 -1 0 0 0 0 0 0 0";
        let history = history_of(&[
            (
                0.0,
                0.0,
                &[
                    (CPU_KEY, "0 0 0 0 0 0 0 0 0 0"),
                    ("/proc/5/stat", busy0),
                    ("/proc/6/stat", idle0),
                    ("/proc/yaffs:cache:nPageReads", "0"),
                    ("/proc/yaffs:data:nPageReads", "0"),
                ],
            ),
            (
                1.0,
                1.0,
                &[
                    (CPU_KEY, "60 0 30 10 0 0 0 0 0 0"),
                    ("/proc/5/stat", busy1),
                    ("/proc/yaffs:data:nPageReads", "12"),
                ],
            ),
        ]);
        let metrics = extract(&history);
        let selection = select(&metrics, &SelectionConfig::default());
        let sections = assemble(&history, &metrics, &selection);

        assert_eq!(
            chart_ids(&sections),
            vec![
                "total_cpu",
                "context_switches",
                "total_faults",
                "-",
                "yaffs1",
                "-",
                "proc5",
                "proc5_faults",
            ]
        );

        let Section::Chart(faults) = &sections[2] else {
            panic!("expected faults chart");
        };
        assert_eq!(faults.options.value_range, Some([0, 44]));
        assert_eq!(faults.options.date_window, [0.0, 1000.0]);
    }
}
